//! # Error Handling
//!
//! Error types for the gatekey authentication core, built on `thiserror`.
//!
//! Authentication failures carry an [`AuthErrorType`] so internal code can
//! distinguish causes (malformed signature vs. missing record vs. expiry)
//! while the flow-level services collapse them into a single generic failure
//! before anything crosses the crate boundary.

use std::fmt;

/// Custom result type for gatekey operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gatekey authentication core
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Authentication and authorization errors
    #[error("Authentication error: {message}")]
    Auth {
        message: String,
        error_type: AuthErrorType,
    },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Resource conflict errors (e.g., already exists)
    #[error("Resource conflict: {message}")]
    Conflict {
        message: String,
        resource_type: String,
    },

    /// Internal server errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Authentication error subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorType {
    /// Token structure or signature is invalid
    MalformedToken,
    /// Token is past its expiry instant
    ExpiredToken,
    /// Signature verified but no matching persisted record exists
    TokenNotFound,
    /// Unknown email or wrong password; callers cannot tell which
    InvalidCredentials,
    /// Account is suspended
    AccountSuspended,
    /// Generic collapsed failure for the refresh/reset/verify flows
    Unauthorized,
}

impl fmt::Display for AuthErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorType::MalformedToken => write!(f, "malformed_token"),
            AuthErrorType::ExpiredToken => write!(f, "expired_token"),
            AuthErrorType::TokenNotFound => write!(f, "token_not_found"),
            AuthErrorType::InvalidCredentials => write!(f, "invalid_credentials"),
            AuthErrorType::AccountSuspended => write!(f, "account_suspended"),
            AuthErrorType::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S, error_type: AuthErrorType) -> Self {
        Self::Auth { message: message.into(), error_type }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a conflict error
    pub fn conflict<M: Into<String>, R: Into<String>>(message: M, resource_type: R) -> Self {
        Self::Conflict { message: message.into(), resource_type: resource_type.into() }
    }

    /// Create an internal server error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Create an internal error with source
    pub fn internal_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(source) }
    }

    /// The auth subtype, if this is an authentication error
    pub fn auth_error_type(&self) -> Option<AuthErrorType> {
        match self {
            Error::Auth { error_type, .. } => Some(*error_type),
            _ => None,
        }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 500,
            Error::Database { .. } => 500,
            Error::Validation { .. } => 400,
            Error::Auth { .. } => 401,
            Error::NotFound { .. } => 404,
            Error::Conflict { .. } => 409,
            Error::Internal { .. } => 500,
        }
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Self::Database {
            source: error,
            context: "Database operation failed".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = Error::config("Test configuration error");
        assert!(matches!(error, Error::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: Test configuration error");
    }

    #[test]
    fn test_validation_error() {
        let error = Error::validation_field("Invalid email format", "email");
        assert!(matches!(error, Error::Validation { .. }));
        if let Error::Validation { field, .. } = error {
            assert_eq!(field, Some("email".to_string()));
        }
    }

    #[test]
    fn test_auth_error() {
        let error = Error::auth("Invalid token", AuthErrorType::MalformedToken);
        assert_eq!(error.auth_error_type(), Some(AuthErrorType::MalformedToken));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::validation("test").status_code(), 400);
        assert_eq!(Error::auth("test", AuthErrorType::Unauthorized).status_code(), 401);
        assert_eq!(Error::not_found("user", "test").status_code(), 404);
        assert_eq!(Error::conflict("test", "user").status_code(), 409);
        assert_eq!(Error::internal("test").status_code(), 500);
    }

    #[test]
    fn test_auth_error_type_display() {
        assert_eq!(AuthErrorType::MalformedToken.to_string(), "malformed_token");
        assert_eq!(AuthErrorType::ExpiredToken.to_string(), "expired_token");
        assert_eq!(AuthErrorType::TokenNotFound.to_string(), "token_not_found");
        assert_eq!(AuthErrorType::InvalidCredentials.to_string(), "invalid_credentials");
        assert_eq!(AuthErrorType::AccountSuspended.to_string(), "account_suspended");
        assert_eq!(AuthErrorType::Unauthorized.to_string(), "unauthorized");
    }
}
