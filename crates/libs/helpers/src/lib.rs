pub mod auth_jwt;
pub mod validations;
