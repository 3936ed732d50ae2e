pub mod admin;
pub mod comments;
pub mod favorites;
pub mod games;
pub mod health_check;
pub mod stats;
