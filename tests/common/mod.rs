//! Common test utilities for the integration tests.
//!
//! Builds an isolated in-memory SQLite database per test plus the service
//! stack wired against it.

#![allow(dead_code)]

use std::sync::Arc;

use gatekey::auth::hashing;
use gatekey::auth::user::NewUser;
use gatekey::config::AuthConfig;
use gatekey::storage::repositories::{TokenRepository, UserRepository};
use gatekey::storage::{run_migrations, DbPool, SqlxTokenRepository, SqlxUserRepository};
use gatekey::{AuthService, Role, TokenCodec, TokenService, User, UserId, UserService};
use sqlx::sqlite::SqlitePoolOptions;

pub const TEST_PASSWORD: &str = "hunter42password";

pub struct TestContext {
    pub pool: DbPool,
    pub config: AuthConfig,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub user_service: UserService,
    pub token_service: TokenService,
    pub auth_service: AuthService,
}

impl TestContext {
    pub async fn new() -> Self {
        let pool = test_pool().await;
        let config = test_auth_config();

        let users: Arc<dyn UserRepository> = Arc::new(SqlxUserRepository::new(pool.clone()));
        let tokens: Arc<dyn TokenRepository> = Arc::new(SqlxTokenRepository::new(pool.clone()));
        let token_service = TokenService::new(tokens.clone(), users.clone(), config.clone());
        let auth_service = AuthService::new(users.clone(), tokens.clone(), token_service.clone());
        let user_service = UserService::new(users.clone());

        Self { pool, config, users, tokens, user_service, token_service, auth_service }
    }

    /// A codec sharing the test signing secret, for minting tokens with
    /// arbitrary expiries.
    pub fn codec(&self) -> TokenCodec {
        TokenCodec::new(self.config.jwt_secret.as_bytes())
    }

    /// Insert a user directly, bypassing request validation.
    pub async fn seed_user(&self, username: &str, email: &str) -> User {
        let password_hash = hashing::hash_password(TEST_PASSWORD).unwrap();
        self.users
            .create_user(NewUser {
                id: UserId::new(),
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role: Role::User,
            })
            .await
            .unwrap()
    }
}

/// One isolated in-memory database per pool. A single connection keeps the
/// `:memory:` database alive and shared across all queries in the test.
pub async fn test_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to create in-memory sqlite pool");
    run_migrations(&pool).await.expect("failed to run migrations");
    pool
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret-0123456789abcdef".to_string(),
        ..AuthConfig::default()
    }
}
