//! User directory repository.
//!
//! The auth core consumes this as its user directory: lookup by id/email,
//! password-hash retrieval for verification, and field updates. User
//! mutation happens exclusively here.

use crate::auth::user::{NewUser, Role, UpdateUser, User};
use crate::domain::UserId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_email_verified: bool,
    pub is_suspended: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, is_email_verified, \
     is_suspended, last_login_at, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Get a user by ID
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Get a user by email
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get a user with their password hash for authentication
    async fn get_user_with_password(&self, email: &str) -> Result<Option<(User, String)>>;

    /// Get only the password hash for an already-resolved user
    async fn get_password_hash(&self, id: &UserId) -> Result<Option<String>>;

    /// Update a user's details
    async fn update_user(&self, id: &UserId, update: UpdateUser) -> Result<User>;

    /// Update a user's password hash
    async fn update_password(&self, id: &UserId, password_hash: String) -> Result<()>;

    /// Set the email-verified flag
    async fn set_email_verified(&self, id: &UserId, verified: bool) -> Result<()>;

    /// Record a successful login
    async fn touch_last_login(&self, id: &UserId, when: DateTime<Utc>) -> Result<()>;

    /// Whether any user owns this email
    async fn is_email_taken(&self, email: &str) -> Result<bool>;

    /// Whether any user owns this username
    async fn is_username_taken(&self, username: &str) -> Result<bool>;

    /// Delete a user (cascades to their token records)
    async fn delete_user(&self, id: &UserId) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_user(&self, row: UserRow) -> Result<User> {
        let role = Role::from_str(&row.role)
            .map_err(|_| Error::validation(format!("Unknown role '{}'", row.role)))?;

        Ok(User {
            id: UserId::from_string(row.id),
            username: row.username,
            email: row.email,
            role,
            is_email_verified: row.is_email_verified,
            is_suspended: row.is_suspended,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn fetch_row_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        sqlx::query_as(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to fetch user by email".to_string(),
            })
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    #[instrument(
        skip(self, user),
        fields(user_email = %user.email, user_id = %user.id),
        name = "db_create_user"
    )]
    async fn create_user(&self, user: NewUser) -> Result<User> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, is_email_verified, is_suspended, last_login_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, FALSE, FALSE, NULL, $6, $7)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to create user".to_string(),
        })?;

        self.get_user(&user.id)
            .await?
            .ok_or_else(|| Error::internal("User not found after creation"))
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_get_user")]
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| Error::Database {
                    source: err,
                    context: "Failed to fetch user".to_string(),
                })?;

        row.map(|r| self.row_to_user(r)).transpose()
    }

    #[instrument(skip(self, email), name = "db_get_user_by_email")]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = self.fetch_row_by_email(email).await?;
        row.map(|r| self.row_to_user(r)).transpose()
    }

    #[instrument(skip(self, email), name = "db_get_user_with_password")]
    async fn get_user_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        let row = self.fetch_row_by_email(email).await?;
        match row {
            Some(row) => {
                let hash = row.password_hash.clone();
                Ok(Some((self.row_to_user(row)?, hash)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_get_password_hash")]
    async fn get_password_hash(&self, id: &UserId) -> Result<Option<String>> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| Error::Database {
                    source: err,
                    context: "Failed to fetch password hash".to_string(),
                })?;
        Ok(hash)
    }

    #[instrument(skip(self, update), fields(user_id = %id), name = "db_update_user")]
    async fn update_user(&self, id: &UserId, update: UpdateUser) -> Result<User> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| Error::not_found("user", id.as_str()))?;

        let username = update.username.unwrap_or(existing.username);
        let email = update.email.unwrap_or(existing.email);
        let role = update.role.unwrap_or(existing.role);
        let is_suspended = update.is_suspended.unwrap_or(existing.is_suspended);

        sqlx::query(
            "UPDATE users SET username = $1, email = $2, role = $3, is_suspended = $4, updated_at = $5 WHERE id = $6",
        )
        .bind(&username)
        .bind(&email)
        .bind(role.as_str())
        .bind(is_suspended)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| Error::Database {
            source: err,
            context: "Failed to update user".to_string(),
        })?;

        self.get_user(id)
            .await?
            .ok_or_else(|| Error::internal("User not found after update"))
    }

    #[instrument(skip(self, password_hash), fields(user_id = %id), name = "db_update_password")]
    async fn update_password(&self, id: &UserId, password_hash: String) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
                .bind(&password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|err| Error::Database {
                    source: err,
                    context: "Failed to update password".to_string(),
                })?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", id.as_str()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_set_email_verified")]
    async fn set_email_verified(&self, id: &UserId, verified: bool) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET is_email_verified = $1, updated_at = $2 WHERE id = $3")
                .bind(verified)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|err| Error::Database {
                    source: err,
                    context: "Failed to update email verification flag".to_string(),
                })?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", id.as_str()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_touch_last_login")]
    async fn touch_last_login(&self, id: &UserId, when: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = $1, updated_at = $2 WHERE id = $3")
            .bind(when)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to update last login timestamp".to_string(),
            })?;
        Ok(())
    }

    #[instrument(skip(self, email), name = "db_is_email_taken")]
    async fn is_email_taken(&self, email: &str) -> Result<bool> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to check email uniqueness".to_string(),
            })?;
        Ok(taken)
    }

    #[instrument(skip(self, username), name = "db_is_username_taken")]
    async fn is_username_taken(&self, username: &str) -> Result<bool> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await
                .map_err(|err| Error::Database {
                    source: err,
                    context: "Failed to check username uniqueness".to_string(),
                })?;
        Ok(taken)
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_delete_user")]
    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::Database {
                source: err,
                context: "Failed to delete user".to_string(),
            })?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", id.as_str()));
        }
        Ok(())
    }
}
