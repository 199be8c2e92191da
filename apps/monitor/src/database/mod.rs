/// Durable storage on LibSQL (SQLite)
///
/// `LibsqlStore` implements the target, result and alert repositories over a
/// pooled connection, so the engine can swap it in for the in-memory store.
pub mod migrations;
pub mod pool;
pub mod repository;

pub use pool::{LibsqlManager, LibsqlPool};
pub use repository::LibsqlStore;

use crate::error::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
