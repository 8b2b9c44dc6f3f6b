//! Data models for the gatekey token subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{TokenId, UserId};

/// The credential kinds the subsystem issues.
///
/// Access tokens are stateless (signature + expiry only); the other three
/// are stateful and always have a persisted [`TokenRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
    ResetPassword,
    VerifyEmail,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::ResetPassword => "reset_password",
            TokenType::VerifyEmail => "verify_email",
        }
    }

    /// Whether tokens of this type have a persisted record.
    pub fn is_stateful(&self) -> bool {
        !matches!(self, TokenType::Access)
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = TokenTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenType::Access),
            "refresh" => Ok(TokenType::Refresh),
            "reset_password" => Ok(TokenType::ResetPassword),
            "verify_email" => Ok(TokenType::VerifyEmail),
            other => Err(TokenTypeParseError(other.to_string())),
        }
    }
}

/// Error returned when token type parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid token type: {0}")]
pub struct TokenTypeParseError(pub String);

/// Stored representation of a stateful token.
///
/// `blacklisted` is a reserved soft-revocation flag: every verification
/// lookup filters on `blacklisted = false`, but current policy hard-deletes
/// on consumption and never sets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: TokenId,
    pub token: String,
    pub user_id: UserId,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
    pub blacklisted: bool,
    pub created_at: DateTime<Utc>,
}

/// New token database payload.
#[derive(Debug, Clone)]
pub struct NewTokenRecord {
    pub id: TokenId,
    pub token: String,
    pub user_id: UserId,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
    pub blacklisted: bool,
}

impl NewTokenRecord {
    pub fn new(
        token: String,
        user_id: UserId,
        token_type: TokenType,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TokenId::new(),
            token,
            user_id,
            token_type,
            expires_at,
            blacklisted: false,
        }
    }
}

/// Lookup criteria for token records. Unset fields are not filtered on.
#[derive(Debug, Clone, Default)]
pub struct TokenQuery {
    pub token: Option<String>,
    pub token_type: Option<TokenType>,
    pub user_id: Option<UserId>,
    pub blacklisted: Option<bool>,
}

impl TokenQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = Some(token_type);
        self
    }

    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn blacklisted(mut self, blacklisted: bool) -> Self {
        self.blacklisted = Some(blacklisted);
        self
    }
}

/// A signed token string together with its expiry instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenWithExpiry {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access + refresh pair returned after login, registration or rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenPair {
    pub access: TokenWithExpiry,
    pub refresh: TokenWithExpiry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_type_round_trip() {
        for (input, expected) in [
            ("access", TokenType::Access),
            ("refresh", TokenType::Refresh),
            ("reset_password", TokenType::ResetPassword),
            ("verify_email", TokenType::VerifyEmail),
        ] {
            let parsed = input.parse::<TokenType>().unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.to_string(), input);
        }

        let err = "bad".parse::<TokenType>().unwrap_err();
        assert_eq!(err.0, "bad");
    }

    #[test]
    fn only_access_is_stateless() {
        assert!(!TokenType::Access.is_stateful());
        assert!(TokenType::Refresh.is_stateful());
        assert!(TokenType::ResetPassword.is_stateful());
        assert!(TokenType::VerifyEmail.is_stateful());
    }

    #[test]
    fn query_builder_sets_fields() {
        let query = TokenQuery::new()
            .token("abc")
            .token_type(TokenType::Refresh)
            .blacklisted(false);

        assert_eq!(query.token.as_deref(), Some("abc"));
        assert_eq!(query.token_type, Some(TokenType::Refresh));
        assert_eq!(query.blacklisted, Some(false));
        assert!(query.user_id.is_none());
    }
}
