pub mod aggregate;
pub mod db_error;
pub mod routes;
pub mod schema;
pub mod startup;
