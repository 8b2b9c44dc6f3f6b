//! Authentication module entry point.
//!
//! Exposes the account and token lifecycle stack: Argon2 password hashing,
//! the JWT codec, the token issue/verify/consume service, and the
//! login/logout/refresh/reset/verify flows built on top of it.

pub mod auth_service;
pub mod hashing;
pub mod jwt;
pub mod models;
pub mod token_service;
pub mod user;
pub mod user_service;

pub use auth_service::AuthService;
pub use jwt::{Claims, TokenCodec};
pub use models::{AuthTokenPair, TokenQuery, TokenRecord, TokenType, TokenWithExpiry};
pub use token_service::TokenService;
pub use user::{Role, User};
pub use user_service::{CreateUserRequest, RegisterUserRequest, UserService};
