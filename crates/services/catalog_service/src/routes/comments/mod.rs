pub mod comments;
pub mod model;
