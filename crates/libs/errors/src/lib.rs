use std::{error::Error, fmt::Debug};

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error)]
pub enum CustomError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Authentication Error: {0}")]
    AuthenticationError(#[from] AuthError),

    #[error("Authorization Error: {0}")]
    AuthorizationError(String),

    #[error("Database Error: {0}")]
    DatabaseError(#[from] DbError),

    #[error("Unexpected Error")]
    UnexpectedError(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Query Error: {0}")]
    QueryBuilderError(String),

    #[error("Other Database Error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication Error: {0}")]
    OtherAuthenticationError(String),
}

// Lets `?` bubble raw diesel errors out of transaction closures.
impl From<diesel::result::Error> for CustomError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => CustomError::NotFound("Record not found".to_string()),
            other => CustomError::DatabaseError(DbError::Other(other.to_string())),
        }
    }
}

impl ResponseError for CustomError {
    fn error_response(&self) -> HttpResponse {
        match self {
            CustomError::NotFound(_) => {
                HttpResponse::NotFound().json(json!({"status": "fail", "message": self.to_string()}))
            }
            CustomError::ValidationError(_) => {
                HttpResponse::BadRequest().json(json!({"status": "fail", "message": self.to_string()}))
            }
            CustomError::AuthenticationError(_) => {
                HttpResponse::Unauthorized().json(json!({"status": "fail", "message": self.to_string()}))
            }
            CustomError::AuthorizationError(_) => {
                HttpResponse::Forbidden().json(json!({"status": "fail", "message": self.to_string()}))
            }
            // Internal detail stays in the logs, not the response body.
            CustomError::DatabaseError(_) | CustomError::UnexpectedError(_) => {
                HttpResponse::InternalServerError()
                    .json(json!({"status": "error", "message": "Internal server error"}))
            }
        }
    }
}

impl Debug for CustomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain(self, f)
    }
}

fn error_chain(
    source: &impl Error,
    f: &mut std::fmt::Formatter
) -> std::fmt::Result {
    writeln!(f, "{}", source)?;

    match source.source() {
        Some(next) => {
            write!(f, "Caused by: \n\t{:?}", next)?;
        },
        None => {}
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn client_errors_keep_their_status_codes() {
        let cases = [
            (
                CustomError::NotFound("Game not found".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                CustomError::ValidationError("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CustomError::AuthenticationError(AuthError::OtherAuthenticationError(
                    "no token".to_string(),
                )),
                StatusCode::UNAUTHORIZED,
            ),
            (
                CustomError::AuthorizationError("not yours".to_string()),
                StatusCode::FORBIDDEN,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.error_response().status(), status);
        }
    }

    #[test]
    fn database_errors_render_as_generic_500s() {
        let err = CustomError::DatabaseError(DbError::Other("broken pipe".to_string()));
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn a_missing_row_maps_to_not_found() {
        let err = CustomError::from(diesel::result::Error::NotFound);
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);
    }
}
