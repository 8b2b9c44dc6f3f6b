//! Token record repository.
//!
//! Pure persistence contract over stateful token records; no business logic.
//! The `token` column carries a unique index, so a colliding insert surfaces
//! as a database error instead of silently overwriting (a collision is an
//! entropy bug, not a handled case).

use crate::auth::models::{NewTokenRecord, TokenQuery, TokenRecord, TokenType};
use crate::domain::{TokenId, UserId};
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::str::FromStr;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct TokenRow {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub blacklisted: bool,
    pub created_at: DateTime<Utc>,
}

const TOKEN_COLUMNS: &str =
    "id, token, user_id, token_type, expires_at, blacklisted, created_at";

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a new token record.
    async fn save(&self, record: NewTokenRecord) -> Result<TokenRecord>;

    /// Find at most one record matching the criteria.
    async fn find_one(&self, query: &TokenQuery) -> Result<Option<TokenRecord>>;

    /// Delete all records matching the criteria, returning the count.
    async fn delete_matching(&self, query: &TokenQuery) -> Result<u64>;

    /// Atomically find and delete one matching record.
    ///
    /// When several requests present the same single-use token concurrently,
    /// exactly one receives the record; the rest get `None`.
    async fn consume_one(&self, query: &TokenQuery) -> Result<Option<TokenRecord>>;

    /// Remove records whose expiry lies before `now`. Intended for an
    /// external sweeper; the auth flows never call this.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[derive(Debug, Clone)]
pub struct SqlxTokenRepository {
    pool: DbPool,
}

impl SqlxTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn to_model(&self, row: TokenRow) -> Result<TokenRecord> {
        let token_type = TokenType::from_str(&row.token_type).map_err(|_| {
            Error::validation(format!(
                "Unknown token type '{}' for token record {}",
                row.token_type, row.id
            ))
        })?;

        Ok(TokenRecord {
            id: TokenId::from_string(row.id),
            token: row.token,
            user_id: UserId::from_string(row.user_id),
            token_type,
            expires_at: row.expires_at,
            blacklisted: row.blacklisted,
            created_at: row.created_at,
        })
    }

    async fn get(&self, id: &TokenId) -> Result<Option<TokenRecord>> {
        let row: Option<TokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM auth_tokens WHERE id = $1",
            TOKEN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to fetch token record".to_string(),
        })?;

        row.map(|r| self.to_model(r)).transpose()
    }
}

/// Append `AND column = value` clauses for every set criterion.
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &TokenQuery) {
    if let Some(token) = &query.token {
        builder.push(" AND token = ").push_bind(token.clone());
    }
    if let Some(token_type) = query.token_type {
        builder.push(" AND token_type = ").push_bind(token_type.as_str());
    }
    if let Some(user_id) = &query.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.clone());
    }
    if let Some(blacklisted) = query.blacklisted {
        builder.push(" AND blacklisted = ").push_bind(blacklisted);
    }
}

#[async_trait]
impl TokenRepository for SqlxTokenRepository {
    #[instrument(
        skip(self, record),
        fields(user_id = %record.user_id, token_type = %record.token_type),
        name = "db_save_token"
    )]
    async fn save(&self, record: NewTokenRecord) -> Result<TokenRecord> {
        sqlx::query(
            "INSERT INTO auth_tokens (id, token, user_id, token_type, expires_at, blacklisted, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&record.id)
        .bind(&record.token)
        .bind(&record.user_id)
        .bind(record.token_type.as_str())
        .bind(record.expires_at)
        .bind(record.blacklisted)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to insert token record".to_string(),
        })?;

        self.get(&record.id)
            .await?
            .ok_or_else(|| Error::internal("Token record not found after creation"))
    }

    #[instrument(skip(self, query), name = "db_find_token")]
    async fn find_one(&self, query: &TokenQuery) -> Result<Option<TokenRecord>> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {} FROM auth_tokens WHERE 1=1",
            TOKEN_COLUMNS
        ));
        push_filters(&mut builder, query);
        builder.push(" LIMIT 1");

        let row: Option<TokenRow> = builder
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to query token records".to_string(),
            })?;

        row.map(|r| self.to_model(r)).transpose()
    }

    #[instrument(skip(self, query), name = "db_delete_tokens")]
    async fn delete_matching(&self, query: &TokenQuery) -> Result<u64> {
        let mut builder = QueryBuilder::new("DELETE FROM auth_tokens WHERE 1=1");
        push_filters(&mut builder, query);

        let result = builder.build().execute(&self.pool).await.map_err(|err| Error::Database {
            source: err,
            context: "Failed to delete token records".to_string(),
        })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, query), name = "db_consume_token")]
    async fn consume_one(&self, query: &TokenQuery) -> Result<Option<TokenRecord>> {
        // Single statement so two concurrent consumers of the same token
        // cannot both observe the record before either deletes it.
        let mut builder =
            QueryBuilder::new("DELETE FROM auth_tokens WHERE id = (SELECT id FROM auth_tokens WHERE 1=1");
        push_filters(&mut builder, query);
        builder.push(" LIMIT 1) RETURNING ");
        builder.push(TOKEN_COLUMNS);

        let row: Option<TokenRow> = builder
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to consume token record".to_string(),
            })?;

        row.map(|r| self.to_model(r)).transpose()
    }

    #[instrument(skip(self), name = "db_purge_expired_tokens")]
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to purge expired token records".to_string(),
            })?;

        Ok(result.rows_affected())
    }
}
