//! # Database Migration Management
//!
//! Schema evolution via SQL statements embedded in the binary. Migrations
//! run in order inside a transaction per version and are tracked in a
//! `schema_migrations` table so re-running is a no-op.

use crate::errors::{Error, Result};
use crate::storage::DbPool;
use sqlx::Row;
use tracing::info;

struct Migration {
    version: i64,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create users table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                is_email_verified BOOLEAN NOT NULL DEFAULT FALSE,
                is_suspended BOOLEAN NOT NULL DEFAULT FALSE,
                last_login_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "create auth_tokens table",
        sql: r#"
            CREATE TABLE IF NOT EXISTS auth_tokens (
                id TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                token_type TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                blacklisted BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_auth_tokens_token ON auth_tokens(token);
            CREATE INDEX IF NOT EXISTS idx_auth_tokens_user_type
                ON auth_tokens(user_id, token_type);
        "#,
    },
];

/// Run all pending migrations against the pool.
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            installed_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|err| Error::Database {
        source: err,
        context: "Failed to create schema_migrations table".to_string(),
    })?;

    let applied: i64 =
        sqlx::query("SELECT COALESCE(MAX(version), 0) AS version FROM schema_migrations")
            .fetch_one(pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to read applied migration version".to_string(),
            })?
            .get("version");

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        let mut tx = pool.begin().await.map_err(|err| Error::Database {
            source: err,
            context: format!("Failed to begin transaction for migration {}", migration.version),
        })?;

        // SQLite executes one statement per call; split on the trailing semicolons.
        for statement in migration.sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|err| Error::Database {
                source: err,
                context: format!("Migration {} failed: {}", migration.version, migration.description),
            })?;
        }

        sqlx::query(
            "INSERT INTO schema_migrations (version, description, installed_at) VALUES ($1, $2, $3)",
        )
        .bind(migration.version)
        .bind(migration.description)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: format!("Failed to record migration {}", migration.version),
        })?;

        tx.commit().await.map_err(|err| Error::Database {
            source: err,
            context: format!("Failed to commit migration {}", migration.version),
        })?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied database migration"
        );
    }

    Ok(())
}
