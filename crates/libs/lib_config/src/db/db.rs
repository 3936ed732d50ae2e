use diesel_async::pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager};
use diesel_async::AsyncPgConnection;

pub type PgPool = Pool<AsyncPgConnection>;

/******************************************/
// Establishing Db Connection
/******************************************/
pub async fn establish_connection(database_url: &str) -> PgPool {
    let manager =
        AsyncDieselConnectionManager::<diesel_async::AsyncPgConnection>::new(database_url);

    // Build the pool
    let pool = Pool::builder(manager)
        .max_size(16)
        .build()
        .expect("Failed to create pool");

    pool
}
