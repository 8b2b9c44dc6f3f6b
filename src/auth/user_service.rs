//! Account provisioning and maintenance.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

use crate::auth::hashing;
use crate::auth::user::{NewUser, Role, UpdateUser, User};
use crate::domain::UserId;
use crate::errors::{Error, Result};
use crate::storage::repositories::UserRepository;
use crate::storage::{DbPool, SqlxUserRepository};

/// Passwords must carry at least one letter and one digit.
fn validate_password_strength(password: &str) -> std::result::Result<(), ValidationError> {
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if has_letter && has_digit {
        Ok(())
    } else {
        Err(ValidationError::new("password_strength")
            .with_message("Password must contain at least one letter and one number".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8), custom(function = "validate_password_strength"))]
    pub password: String,
    pub role: Role,
}

/// Self-service signup; the role is always [`Role::User`].
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8), custom(function = "validate_password_strength"))]
    pub password: String,
}

/// Service for creating and maintaining user accounts.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(Arc::new(SqlxUserRepository::new(pool)))
    }

    /// Create an account with an explicit role.
    ///
    /// Username and email are normalized before the uniqueness checks so
    /// case variants of a taken identifier are rejected too.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        request.validate()?;

        let username = User::normalize_username(&request.username);
        let email = User::normalize_email(&request.email);

        if self.users.is_username_taken(&username).await? {
            return Err(Error::conflict("Username already taken", "user"));
        }
        if self.users.is_email_taken(&email).await? {
            return Err(Error::conflict("Email already taken", "user"));
        }

        let password_hash = hashing::hash_password(&request.password)?;
        let user = self
            .users
            .create_user(NewUser {
                id: UserId::new(),
                username,
                email,
                password_hash,
                role: request.role,
            })
            .await?;

        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Self-service registration; always provisions a regular user.
    pub async fn register_user(&self, request: RegisterUserRequest) -> Result<User> {
        self.create_user(CreateUserRequest {
            username: request.username,
            email: request.email,
            password: request.password,
            role: Role::User,
        })
        .await
    }

    pub async fn get_user(&self, id: &UserId) -> Result<User> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| Error::not_found("user", id.as_str()))
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users.get_user_by_email(&User::normalize_email(email)).await
    }

    /// Apply a partial update, re-running the uniqueness checks for any
    /// changed identifier.
    #[instrument(skip(self, update), fields(user_id = %id))]
    pub async fn update_user(&self, id: &UserId, mut update: UpdateUser) -> Result<User> {
        let current = self.get_user(id).await?;

        if let Some(username) = update.username.take() {
            let username = User::normalize_username(&username);
            if username != current.username && self.users.is_username_taken(&username).await? {
                return Err(Error::conflict("Username already taken", "user"));
            }
            update.username = Some(username);
        }
        if let Some(email) = update.email.take() {
            let email = User::normalize_email(&email);
            if email != current.email && self.users.is_email_taken(&email).await? {
                return Err(Error::conflict("Email already taken", "user"));
            }
            update.email = Some(email);
        }

        let user = self.users.update_user(id, update).await?;
        info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: &UserId) -> Result<()> {
        self.users.delete_user(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}
