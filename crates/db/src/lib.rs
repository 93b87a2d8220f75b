//! Postgres persistence for roster imports.
//!
//! Repositories are zero-sized structs taking `&PgPool`; [`PgWorkQueue`] and
//! [`PgRosterStore`] adapt them to the ports defined in `roster-core`.

pub mod models;
pub mod queue;
pub mod repositories;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use queue::PgWorkQueue;
pub use store::PgRosterStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
