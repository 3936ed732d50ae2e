pub mod games;
pub mod model;
pub mod query;
