//! Repository contracts and their SQLite implementations.

mod token;
mod user;

pub use token::{SqlxTokenRepository, TokenRepository};
pub use user::{SqlxUserRepository, UserRepository};
