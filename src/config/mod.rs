//! # Configuration Management
//!
//! Configuration for the gatekey authentication core. All signing and TTL
//! parameters are explicit values passed into the service constructors at
//! startup; nothing in the core reads ambient global state.

use crate::errors::{Error, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[validate(nested)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Custom validation logic that goes beyond what the validator crate can do
    fn validate_custom(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(Error::validation("Database URL must start with 'sqlite:'"));
        }

        // An HS256 secret shorter than the hash output weakens every token
        if self.auth.jwt_secret.len() < 32 {
            return Err(Error::validation(
                "JWT secret must be at least 32 characters long",
            ));
        }

        Ok(())
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            observability: ObservabilityConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub connect_timeout_seconds: u64,

    /// Idle connection timeout in seconds (None = never reap)
    pub idle_timeout_seconds: Option<u64>,

    /// Run migrations automatically when the pool is created
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://gatekey.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection acquire timeout as Duration
    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Option<std::time::Duration> {
        self.idle_timeout_seconds.map(std::time::Duration::from_secs)
    }

    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: std::env::var("GATEKEY_DATABASE_URL").unwrap_or(defaults.url),
            max_connections: env_parse("GATEKEY_DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: env_parse("GATEKEY_DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_seconds: env_parse(
                "GATEKEY_DATABASE_CONNECT_TIMEOUT_SECONDS",
                defaults.connect_timeout_seconds,
            )?,
            idle_timeout_seconds: defaults.idle_timeout_seconds,
            auto_migrate: env_parse("GATEKEY_DATABASE_AUTO_MIGRATE", defaults.auto_migrate)?,
        })
    }
}

/// Authentication configuration: shared signing secret and per-type TTLs.
///
/// Access and refresh TTLs are independent values; nothing relates them
/// beyond both being positive.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// Shared secret for token signing/verification
    pub jwt_secret: String,

    /// Access token lifetime in minutes (short-lived, stateless)
    #[validate(range(min = 1, message = "Access token TTL must be positive"))]
    pub access_token_ttl_minutes: i64,

    /// Refresh token lifetime in days (long-lived, persisted)
    #[validate(range(min = 1, message = "Refresh token TTL must be positive"))]
    pub refresh_token_ttl_days: i64,

    /// Password-reset token lifetime in minutes
    #[validate(range(min = 1, message = "Reset token TTL must be positive"))]
    pub reset_password_ttl_minutes: i64,

    /// Email-verification token lifetime in minutes
    #[validate(range(min = 1, message = "Verify token TTL must be positive"))]
    pub verify_email_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl_minutes: 30,
            refresh_token_ttl_days: 30,
            reset_password_ttl_minutes: 10,
            verify_email_ttl_minutes: 10,
        }
    }
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_ttl_minutes)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.refresh_token_ttl_days)
    }

    pub fn reset_password_ttl(&self) -> Duration {
        Duration::minutes(self.reset_password_ttl_minutes)
    }

    pub fn verify_email_ttl(&self) -> Duration {
        Duration::minutes(self.verify_email_ttl_minutes)
    }

    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let jwt_secret = std::env::var("GATEKEY_JWT_SECRET")
            .map_err(|_| Error::config("GATEKEY_JWT_SECRET must be set"))?;

        Ok(Self {
            jwt_secret,
            access_token_ttl_minutes: env_parse(
                "GATEKEY_ACCESS_TTL_MINUTES",
                defaults.access_token_ttl_minutes,
            )?,
            refresh_token_ttl_days: env_parse(
                "GATEKEY_REFRESH_TTL_DAYS",
                defaults.refresh_token_ttl_days,
            )?,
            reset_password_ttl_minutes: env_parse(
                "GATEKEY_RESET_PASSWORD_TTL_MINUTES",
                defaults.reset_password_ttl_minutes,
            )?,
            verify_email_ttl_minutes: env_parse(
                "GATEKEY_VERIFY_EMAIL_TTL_MINUTES",
                defaults.verify_email_ttl_minutes,
            )?,
        })
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level filter (tracing env-filter syntax)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    pub json_logs: bool,

    /// Service name attached to log output
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "gatekey".to_string(),
        }
    }
}

impl ObservabilityConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("GATEKEY_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logs: std::env::var("GATEKEY_JSON_LOGS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.json_logs),
            service_name: std::env::var("GATEKEY_SERVICE_NAME").unwrap_or(defaults.service_name),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                ..AuthConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_default_config_validates_with_secret() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = valid_config();
        config.auth.jwt_secret = "short".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_non_sqlite_url_rejected() {
        let mut config = valid_config();
        config.database.url = "postgresql://localhost/gatekey".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = valid_config();
        config.auth.access_token_ttl_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ttl_accessors() {
        let auth = AuthConfig::default();
        assert_eq!(auth.access_token_ttl(), Duration::minutes(30));
        assert_eq!(auth.refresh_token_ttl(), Duration::days(30));
        assert_eq!(auth.reset_password_ttl(), Duration::minutes(10));
        assert_eq!(auth.verify_email_ttl(), Duration::minutes(10));
    }
}
