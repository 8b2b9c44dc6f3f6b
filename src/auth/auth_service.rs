//! Account authentication flows: login, logout, refresh rotation, password
//! reset, password change, and email verification.
//!
//! The token-presenting flows (refresh, reset, verify) deliberately collapse
//! every failure into one generic error so a caller cannot distinguish
//! "expired" from "already used" from "forged". The real cause is logged at
//! warn level for operators.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::auth::hashing;
use crate::auth::models::{AuthTokenPair, TokenQuery, TokenType};
use crate::auth::token_service::TokenService;
use crate::auth::user::User;
use crate::config::AuthConfig;
use crate::domain::UserId;
use crate::errors::{AuthErrorType, Error, Result};
use crate::observability::metrics;
use crate::storage::repositories::{TokenRepository, UserRepository};
use crate::storage::{DbPool, SqlxTokenRepository, SqlxUserRepository};

/// Pre-computed dummy hash for timing-safe user enumeration prevention.
/// When a non-existent email is used, we still run Argon2 verification
/// against this hash so the response time matches real verification.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hashing::hash_password("dummy_startup_value")
        .unwrap_or_else(|_| "$argon2id$v=19$m=19456,t=2,p=1$dW5rbm93bg$dW5rbm93bg".to_string())
});

/// Service orchestrating account authentication flows.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
    token_service: TokenService,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
        token_service: TokenService,
    ) -> Self {
        Self { users, tokens, token_service }
    }

    pub fn with_sqlx(pool: DbPool, config: AuthConfig) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(SqlxUserRepository::new(pool.clone()));
        let tokens: Arc<dyn TokenRepository> = Arc::new(SqlxTokenRepository::new(pool.clone()));
        let token_service = TokenService::new(tokens.clone(), users.clone(), config);
        Self::new(users, tokens, token_service)
    }

    pub fn token_service(&self) -> &TokenService {
        &self.token_service
    }

    /// Authenticate with email and password, returning the account.
    ///
    /// Unknown-email and wrong-password failures are indistinguishable to
    /// the caller, in both the error message and (approximately) the
    /// response time. Suspended accounts are rejected even with correct
    /// credentials.
    ///
    /// Does not mint tokens; call
    /// [`TokenService::generate_auth_tokens`] with the returned user id to
    /// establish a session.
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = User::normalize_email(email);

        let (user, password_hash) = match self.users.get_user_with_password(&email).await? {
            Some(found) => found,
            None => {
                // Burn the same Argon2 work a real verification would
                if let Err(e) = hashing::verify_password(password, &DUMMY_HASH) {
                    warn!(error = %e, "dummy hash verification failed unexpectedly");
                }
                warn!(email = %email, "login attempt for non-existent user");
                metrics::record_authentication("invalid_credentials");
                return Err(Error::auth(
                    "Incorrect email or password",
                    AuthErrorType::InvalidCredentials,
                ));
            }
        };

        if !hashing::verify_password(password, &password_hash)? {
            warn!(user_id = %user.id, "login attempt with incorrect password");
            metrics::record_authentication("invalid_credentials");
            return Err(Error::auth(
                "Incorrect email or password",
                AuthErrorType::InvalidCredentials,
            ));
        }

        if user.is_suspended {
            warn!(user_id = %user.id, "login attempt for suspended account");
            metrics::record_authentication("account_suspended");
            return Err(Error::auth("Account suspended", AuthErrorType::AccountSuspended));
        }

        self.users.touch_last_login(&user.id, Utc::now()).await?;
        metrics::record_authentication("success");
        info!(user_id = %user.id, "user authenticated");
        Ok(user)
    }

    /// End the session identified by `refresh_token` by deleting its record.
    ///
    /// Intentionally does not check the token signature: logout is cleanup
    /// and must work even for a token that has expired since issuance. Only
    /// the exact stored string is matched, so a forged token deletes
    /// nothing and reports not-found.
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let query = TokenQuery::new()
            .token(refresh_token)
            .token_type(TokenType::Refresh)
            .blacklisted(false);

        let record = self
            .tokens
            .find_one(&query)
            .await?
            .ok_or_else(|| Error::not_found("refresh_token", "presented token"))?;

        self.tokens.delete_matching(&query).await?;
        info!(user_id = %record.user_id, "session terminated");
        Ok(())
    }

    /// Rotate a refresh token: consume the presented one, then issue a
    /// fresh access + refresh pair.
    ///
    /// The old token is consumed before the new pair is minted; a token
    /// that wins the consume but fails downstream is burned, never
    /// replayable. All failures collapse to a generic unauthorized error.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_auth(&self, refresh_token: &str) -> Result<(User, AuthTokenPair)> {
        match self.refresh_auth_inner(refresh_token).await {
            Ok(result) => Ok(result),
            Err(cause) => {
                warn!(error = %cause, "refresh authentication failed");
                metrics::record_flow_failure("refresh");
                Err(Error::auth("Please authenticate", AuthErrorType::Unauthorized))
            }
        }
    }

    async fn refresh_auth_inner(&self, refresh_token: &str) -> Result<(User, AuthTokenPair)> {
        let record = self.token_service.consume_token(refresh_token, TokenType::Refresh).await?;
        let user = self
            .users
            .get_user(&record.user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", record.user_id.as_str()))?;
        let pair = self.token_service.generate_auth_tokens(&user.id).await?;
        Ok((user, pair))
    }

    /// Complete a password reset: consume the reset token, store the new
    /// password hash, and sweep any other outstanding reset tokens for the
    /// account.
    ///
    /// Existing refresh tokens are NOT revoked; live sessions survive a
    /// reset. All failures collapse to a generic error.
    #[instrument(skip(self, reset_token, new_password))]
    pub async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<()> {
        match self.reset_password_inner(reset_token, new_password).await {
            Ok(()) => Ok(()),
            Err(cause) => {
                warn!(error = %cause, "password reset failed");
                metrics::record_flow_failure("reset_password");
                Err(Error::auth("Password reset failed", AuthErrorType::Unauthorized))
            }
        }
    }

    async fn reset_password_inner(&self, reset_token: &str, new_password: &str) -> Result<()> {
        let record =
            self.token_service.consume_token(reset_token, TokenType::ResetPassword).await?;
        let user = self
            .users
            .get_user(&record.user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", record.user_id.as_str()))?;

        let new_hash = hashing::hash_password(new_password)?;
        self.users.update_password(&user.id, new_hash).await?;

        // Any sibling reset tokens issued for this account are now dead
        self.tokens
            .delete_matching(
                &TokenQuery::new().user_id(user.id.clone()).token_type(TokenType::ResetPassword),
            )
            .await?;

        info!(user_id = %user.id, "password reset completed");
        Ok(())
    }

    /// Change a password for an authenticated user by proving the current
    /// one.
    ///
    /// Unlike the reset flow this reports precise errors: the caller has
    /// already authenticated, so there is nothing to hide. Live sessions
    /// are not revoked.
    #[instrument(skip(self, old_password, new_password), fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", user_id.as_str()))?;

        // Checked before the old-password comparison so the message never
        // leaks whether the old password was correct
        if old_password == new_password {
            return Err(Error::validation(
                "New password cannot be the same as the old password",
            ));
        }

        let current_hash =
            self.users.get_password_hash(&user.id).await?.ok_or_else(|| {
                Error::internal(format!("No password hash stored for user {}", user.id))
            })?;

        if !hashing::verify_password(old_password, &current_hash)? {
            warn!(user_id = %user.id, "password change attempt with incorrect password");
            return Err(Error::validation("Incorrect password"));
        }

        let new_hash = hashing::hash_password(new_password)?;
        self.users.update_password(&user.id, new_hash).await?;
        info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Complete email verification: consume the verification token, sweep
    /// sibling verification tokens, and mark the account verified.
    ///
    /// Idempotent for an already-verified account holding a fresh token.
    /// All failures collapse to a generic error.
    #[instrument(skip(self, verify_token))]
    pub async fn verify_email(&self, verify_token: &str) -> Result<User> {
        match self.verify_email_inner(verify_token).await {
            Ok(user) => Ok(user),
            Err(cause) => {
                warn!(error = %cause, "email verification failed");
                metrics::record_flow_failure("verify_email");
                Err(Error::auth("Email verification failed", AuthErrorType::Unauthorized))
            }
        }
    }

    async fn verify_email_inner(&self, verify_token: &str) -> Result<User> {
        let record =
            self.token_service.consume_token(verify_token, TokenType::VerifyEmail).await?;

        self.tokens
            .delete_matching(
                &TokenQuery::new()
                    .user_id(record.user_id.clone())
                    .token_type(TokenType::VerifyEmail),
            )
            .await?;
        self.users.set_email_verified(&record.user_id, true).await?;

        let user = self
            .users
            .get_user(&record.user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", record.user_id.as_str()))?;
        info!(user_id = %user.id, "email verified");
        Ok(user)
    }
}
