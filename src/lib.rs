//! # Gatekey
//!
//! Gatekey is an embeddable authentication library: account provisioning,
//! Argon2 password handling, and a four-type JWT token lifecycle (access,
//! refresh, password reset, email verification) backed by SQLite via SQLx.
//!
//! Stateful tokens are double-checked: a presented credential must carry a
//! valid signature AND a live persisted record, so consumed or revoked
//! tokens fail even while cryptographically valid. Single-use tokens are
//! consumed atomically, which makes refresh rotation and reset/verify flows
//! safe under concurrent presentation.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use gatekey::{AppConfig, AuthService, TokenService, UserService};
//! use gatekey::storage::{create_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> gatekey::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let pool = create_pool(&config.database).await?;
//!     run_migrations(&pool).await?;
//!
//!     let users = UserService::with_sqlx(pool.clone());
//!     let auth = AuthService::with_sqlx(pool, config.auth.clone());
//!
//!     let user = auth.login("alice@example.com", "hunter42").await?;
//!     let tokens = auth.token_service().generate_auth_tokens(&user.id).await?;
//!     println!("access token expires at {}", tokens.access.expires_at);
//!     let _ = users;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod storage;

// Re-export commonly used types and traits
pub use auth::{
    AuthService, AuthTokenPair, Claims, CreateUserRequest, RegisterUserRequest, Role,
    TokenCodec, TokenRecord, TokenService, TokenType, User, UserService,
};
pub use config::AppConfig;
pub use domain::{TokenId, UserId};
pub use errors::{AuthErrorType, Error, Result};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
