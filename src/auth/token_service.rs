//! Business logic for issuing and verifying lifecycle tokens.
//!
//! `TokenService` composes the stateless codec with the token store. The
//! core security invariant lives in [`TokenService::verify_token`] /
//! [`TokenService::consume_token`]: for stateful token types a credential
//! must carry a valid signature AND have a live persisted record, so a
//! structurally valid but already-consumed (or forged-but-unsaved) token is
//! rejected even though its signature verifies. Access tokens never touch
//! the store; they trade revocability for statelessness.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::auth::jwt::{Claims, TokenCodec};
use crate::auth::models::{
    AuthTokenPair, NewTokenRecord, TokenQuery, TokenRecord, TokenType, TokenWithExpiry,
};
use crate::config::AuthConfig;
use crate::domain::UserId;
use crate::errors::{AuthErrorType, Error, Result};
use crate::observability::metrics;
use crate::storage::repositories::{TokenRepository, UserRepository};
use crate::storage::{DbPool, SqlxTokenRepository, SqlxUserRepository};

#[derive(Clone)]
pub struct TokenService {
    tokens: Arc<dyn TokenRepository>,
    users: Arc<dyn UserRepository>,
    codec: TokenCodec,
    config: AuthConfig,
}

impl TokenService {
    pub fn new(
        tokens: Arc<dyn TokenRepository>,
        users: Arc<dyn UserRepository>,
        config: AuthConfig,
    ) -> Self {
        let codec = TokenCodec::new(config.jwt_secret.as_bytes());
        Self { tokens, users, codec, config }
    }

    pub fn with_sqlx(pool: DbPool, config: AuthConfig) -> Self {
        Self::new(
            Arc::new(SqlxTokenRepository::new(pool.clone())),
            Arc::new(SqlxUserRepository::new(pool)),
            config,
        )
    }

    /// The codec used for signing; exposed for embedders that verify access
    /// tokens in middleware.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Issue an access + refresh pair for a user.
    ///
    /// The access token is stateless; only the refresh token gets a
    /// persisted record. The two TTLs are independent configuration values.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn generate_auth_tokens(&self, user_id: &UserId) -> Result<AuthTokenPair> {
        let now = Utc::now();

        let access_expires = now + self.config.access_token_ttl();
        let access_token = self.codec.sign(user_id, access_expires, TokenType::Access)?;

        let refresh_expires = now + self.config.refresh_token_ttl();
        let refresh_token = self.codec.sign(user_id, refresh_expires, TokenType::Refresh)?;
        self.tokens
            .save(NewTokenRecord::new(
                refresh_token.clone(),
                user_id.clone(),
                TokenType::Refresh,
                refresh_expires,
            ))
            .await?;

        metrics::record_token_issued(TokenType::Access.as_str());
        metrics::record_token_issued(TokenType::Refresh.as_str());
        info!(user_id = %user_id, "issued access/refresh token pair");

        Ok(AuthTokenPair {
            access: TokenWithExpiry { token: access_token, expires_at: access_expires },
            refresh: TokenWithExpiry { token: refresh_token, expires_at: refresh_expires },
        })
    }

    /// Issue a single-use password-reset token for the owner of `email`.
    #[instrument(skip(self, email))]
    pub async fn generate_reset_password_token(&self, email: &str) -> Result<String> {
        let email = crate::auth::user::User::normalize_email(email);
        let user = self
            .users
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| Error::not_found("user", email.clone()))?;

        let expires = Utc::now() + self.config.reset_password_ttl();
        let token = self.codec.sign(&user.id, expires, TokenType::ResetPassword)?;
        self.tokens
            .save(NewTokenRecord::new(
                token.clone(),
                user.id.clone(),
                TokenType::ResetPassword,
                expires,
            ))
            .await?;

        metrics::record_token_issued(TokenType::ResetPassword.as_str());
        info!(user_id = %user.id, "issued password reset token");
        Ok(token)
    }

    /// Issue a single-use email-verification token.
    ///
    /// Issuance does not check the current verification state; re-issuing
    /// for an already-verified user is allowed and harmless.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn generate_verify_email_token(&self, user_id: &UserId) -> Result<String> {
        let expires = Utc::now() + self.config.verify_email_ttl();
        let token = self.codec.sign(user_id, expires, TokenType::VerifyEmail)?;
        self.tokens
            .save(NewTokenRecord::new(
                token.clone(),
                user_id.clone(),
                TokenType::VerifyEmail,
                expires,
            ))
            .await?;

        metrics::record_token_issued(TokenType::VerifyEmail.as_str());
        info!(user_id = %user_id, "issued email verification token");
        Ok(token)
    }

    /// Verify a stateless access token, returning its claims.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        let claims = self.codec.verify(token)?;
        if claims.token_type != TokenType::Access {
            return Err(Error::auth("Invalid token", AuthErrorType::MalformedToken));
        }
        Ok(claims)
    }

    /// Verify a stateful token without consuming it.
    ///
    /// Propagates `MalformedToken`/`ExpiredToken` from the codec; a token
    /// whose signature verifies but has no live record fails with
    /// `TokenNotFound`.
    #[instrument(skip(self, token), fields(expected = %expected))]
    pub async fn verify_token(&self, token: &str, expected: TokenType) -> Result<TokenRecord> {
        let query = self.stored_token_query(token, expected)?;
        self.tokens
            .find_one(&query)
            .await?
            .ok_or_else(|| Error::auth("Token not found", AuthErrorType::TokenNotFound))
    }

    /// Verify a stateful token and atomically delete its record.
    ///
    /// At most one of several concurrent presenters of the same single-use
    /// token wins; the rest fail with `TokenNotFound`.
    #[instrument(skip(self, token), fields(expected = %expected))]
    pub async fn consume_token(&self, token: &str, expected: TokenType) -> Result<TokenRecord> {
        let query = self.stored_token_query(token, expected)?;
        let record = self
            .tokens
            .consume_one(&query)
            .await?
            .ok_or_else(|| Error::auth("Token not found", AuthErrorType::TokenNotFound))?;

        metrics::record_token_consumed(expected.as_str());
        Ok(record)
    }

    /// Build the store lookup for a stateful token: signature/expiry check
    /// first, then filter on `{token, type, subject, blacklisted = false}`.
    fn stored_token_query(&self, token: &str, expected: TokenType) -> Result<TokenQuery> {
        if !expected.is_stateful() {
            return Err(Error::internal("Access tokens have no persisted record"));
        }

        let claims = self.codec.verify(token)?;
        Ok(TokenQuery::new()
            .token(token)
            .token_type(expected)
            .user_id(claims.subject())
            .blacklisted(false))
    }
}
