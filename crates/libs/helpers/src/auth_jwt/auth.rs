use chrono::{Duration, Utc};
use errors::{AuthError, CustomError};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iss: String,
    pub iat: usize,
    pub nbf: usize,
    pub role: Role,
}

impl Claims {
    /// The authenticated caller's id, as stored in the `sub` claim.
    pub fn user_id(&self) -> Result<Uuid, CustomError> {
        Uuid::parse_str(&self.sub).map_err(|_| {
            CustomError::AuthenticationError(AuthError::OtherAuthenticationError(
                "Malformed subject claim".to_string(),
            ))
        })
    }
}

/******************************************/
// Creating JWT token
/******************************************/
pub fn create_jwt(user_id: &str, role: Role, secret: &str) -> Result<String, String> {
    let expiration_time = (Utc::now() + Duration::hours(1)).timestamp() as usize;
    let issued_at = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration_time,
        iss: "auth".to_string(),
        iat: issued_at,
        nbf: issued_at,
        role,
    };

    let encoding_key = EncodingKey::from_secret(secret.as_ref());
    encode(&Header::default(), &claims, &encoding_key).map_err(|err| err.to_string())
}

/******************************************/
// Verifying JWT token
/******************************************/
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    let decoding_key = DecodingKey::from_secret(secret.as_ref());
    let validation = Validation::default();
    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|err| err.to_string())?;

    if token_data.claims.iss != "auth" {
        return Err("Invalid issuer".to_string());
    }
    let now = Utc::now().timestamp() as usize;
    if token_data.claims.iat > now {
        return Err("Token issued in the future".to_string());
    }
    if token_data.claims.nbf > now {
        return Err("Token not valid yet".to_string());
    }
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::{create_jwt, verify_jwt, Role};
    use claims::{assert_err, assert_ok};
    use uuid::Uuid;

    const SECRET: &str = "test-secret";

    #[test]
    fn a_freshly_issued_token_verifies() {
        let user = Uuid::new_v4().to_string();
        let token = create_jwt(&user, Role::User, SECRET).unwrap();
        let claims = assert_ok!(verify_jwt(&token, SECRET));
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn the_role_claim_survives_the_round_trip() {
        let token = create_jwt("admin-1", Role::Admin, SECRET).unwrap();
        let claims = assert_ok!(verify_jwt(&token, SECRET));
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn a_token_signed_with_another_secret_is_rejected() {
        let token = create_jwt("user-1", Role::User, "other-secret").unwrap();
        assert_err!(verify_jwt(&token, SECRET));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_err!(verify_jwt("not.a.token", SECRET));
    }

    #[test]
    fn a_malformed_subject_claim_does_not_parse_to_a_user_id() {
        let token = create_jwt("not-a-uuid", Role::User, SECRET).unwrap();
        let claims = verify_jwt(&token, SECRET).unwrap();
        assert_err!(claims.user_id());
    }
}
