pub mod comments;
pub mod games;
