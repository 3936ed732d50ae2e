use std::ops::Deref;
use diesel::result::Error as DieselError;
use errors::CustomError;
use thiserror::Error;

#[derive(Error, Debug)]
#[error(transparent)]
pub struct DbError(#[from] pub DieselError);

impl Deref for DbError {
    type Target = DieselError;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DbError> for CustomError {
    fn from(value: DbError) -> Self {
        diesel_db_response_error(&value)
    }
}

fn diesel_db_response_error(err: &DieselError) -> CustomError {
    match err {
        DieselError::NotFound => CustomError::NotFound("Record not found".to_string()),
        DieselError::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, info) => {
            match info.constraint_name() {
                Some("games_name_key") => CustomError::ValidationError(
                    "A game with this name already exists".to_string(),
                ),
                _ => CustomError::DatabaseError(errors::DbError::Other(format!(
                    "Unique constraint violation: {:?}",
                    err
                ))),
            }
        }
        other => CustomError::DatabaseError(errors::DbError::QueryBuilderError(other.to_string())),
    }
}
