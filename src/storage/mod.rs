//! # Storage and Persistence
//!
//! Database connectivity and the persistence contracts the auth core
//! consumes: a token store and a user directory. Both are traits so tests
//! and embedders can substitute implementations; the shipped ones run on
//! SQLite through sqlx.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use migrations::run_migrations;
pub use pool::{create_pool, DbPool};
pub use repositories::{
    SqlxTokenRepository, SqlxUserRepository, TokenRepository, UserRepository,
};

use crate::errors::{Error, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::Database {
            source: e,
            context: "Database connectivity check failed".to_string(),
        })?;

    Ok(())
}
