//! Integration tests for token issuance, verification, and consumption
//! against a real SQLite database.

mod common;

use chrono::{Duration, Utc};
use common::TestContext;
use gatekey::auth::models::{NewTokenRecord, TokenQuery};
use gatekey::{AuthErrorType, TokenType};

#[tokio::test]
async fn test_auth_token_pair_shape() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;

    let pair = ctx.token_service.generate_auth_tokens(&user.id).await.unwrap();

    let access_claims = ctx.codec().verify(&pair.access.token).unwrap();
    assert_eq!(access_claims.subject(), user.id);
    assert_eq!(access_claims.token_type, TokenType::Access);

    let refresh_claims = ctx.codec().verify(&pair.refresh.token).unwrap();
    assert_eq!(refresh_claims.subject(), user.id);
    assert_eq!(refresh_claims.token_type, TokenType::Refresh);

    assert!(pair.refresh.expires_at > pair.access.expires_at);
}

#[tokio::test]
async fn test_refresh_persisted_access_not() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;

    let pair = ctx.token_service.generate_auth_tokens(&user.id).await.unwrap();

    let stored = ctx
        .tokens
        .find_one(&TokenQuery::new().token(&pair.refresh.token))
        .await
        .unwrap();
    assert!(stored.is_some());
    let stored = stored.unwrap();
    assert_eq!(stored.user_id, user.id);
    assert_eq!(stored.token_type, TokenType::Refresh);
    assert!(!stored.blacklisted);

    let access_stored = ctx
        .tokens
        .find_one(&TokenQuery::new().token(&pair.access.token))
        .await
        .unwrap();
    assert!(access_stored.is_none());
}

#[tokio::test]
async fn test_issuance_is_collision_free() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;

    // Same subject, same type, same second; the unique token index would
    // reject a duplicate string on the second save.
    let first = ctx.token_service.generate_auth_tokens(&user.id).await.unwrap();
    let second = ctx.token_service.generate_auth_tokens(&user.id).await.unwrap();

    assert_ne!(first.refresh.token, second.refresh.token);
    assert_ne!(first.access.token, second.access.token);
}

#[tokio::test]
async fn test_verify_requires_persisted_record() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;

    // Valid signature, never saved
    let orphan = ctx
        .codec()
        .sign(&user.id, Utc::now() + Duration::minutes(10), TokenType::ResetPassword)
        .unwrap();

    let err = ctx
        .token_service
        .verify_token(&orphan, TokenType::ResetPassword)
        .await
        .unwrap_err();
    assert_eq!(err.auth_error_type(), Some(AuthErrorType::TokenNotFound));
}

#[tokio::test]
async fn test_verify_does_not_consume() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;
    let token = ctx.token_service.generate_verify_email_token(&user.id).await.unwrap();

    let first = ctx.token_service.verify_token(&token, TokenType::VerifyEmail).await.unwrap();
    let second = ctx.token_service.verify_token(&token, TokenType::VerifyEmail).await.unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_consume_is_single_use() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;
    let token = ctx.token_service.generate_verify_email_token(&user.id).await.unwrap();

    ctx.token_service.consume_token(&token, TokenType::VerifyEmail).await.unwrap();

    let err = ctx
        .token_service
        .consume_token(&token, TokenType::VerifyEmail)
        .await
        .unwrap_err();
    assert_eq!(err.auth_error_type(), Some(AuthErrorType::TokenNotFound));
}

#[tokio::test]
async fn test_type_confusion_rejected() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;
    let token = ctx.token_service.generate_verify_email_token(&user.id).await.unwrap();

    // A verify-email token presented as a reset token must not match
    let err = ctx
        .token_service
        .verify_token(&token, TokenType::ResetPassword)
        .await
        .unwrap_err();
    assert_eq!(err.auth_error_type(), Some(AuthErrorType::TokenNotFound));
}

#[tokio::test]
async fn test_expiry_boundary() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;
    let codec = ctx.codec();

    // Expired two seconds ago: rejected regardless of the stored record
    let expired_at = Utc::now() - Duration::seconds(2);
    let expired = codec.sign(&user.id, expired_at, TokenType::ResetPassword).unwrap();
    ctx.tokens
        .save(NewTokenRecord::new(
            expired.clone(),
            user.id.clone(),
            TokenType::ResetPassword,
            expired_at,
        ))
        .await
        .unwrap();
    let err = ctx
        .token_service
        .verify_token(&expired, TokenType::ResetPassword)
        .await
        .unwrap_err();
    assert_eq!(err.auth_error_type(), Some(AuthErrorType::ExpiredToken));

    // Still a few seconds from expiry: verifies
    let soon = Utc::now() + Duration::seconds(5);
    let live = codec.sign(&user.id, soon, TokenType::ResetPassword).unwrap();
    ctx.tokens
        .save(NewTokenRecord::new(live.clone(), user.id.clone(), TokenType::ResetPassword, soon))
        .await
        .unwrap();
    ctx.token_service.verify_token(&live, TokenType::ResetPassword).await.unwrap();
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;
    let token = ctx.token_service.generate_verify_email_token(&user.id).await.unwrap();

    let mut tampered = token.clone();
    tampered.pop();
    tampered.push(if token.ends_with('A') { 'B' } else { 'A' });

    let err = ctx
        .token_service
        .verify_token(&tampered, TokenType::VerifyEmail)
        .await
        .unwrap_err();
    assert_eq!(err.auth_error_type(), Some(AuthErrorType::MalformedToken));
}

#[tokio::test]
async fn test_reset_token_resolves_email_owner() {
    let ctx = TestContext::new().await;
    let alice = ctx.seed_user("alice", "alice@example.com").await;
    let _bob = ctx.seed_user("bob", "bob@example.com").await;

    // Case-variant email still resolves
    let token = ctx
        .token_service
        .generate_reset_password_token("Alice@Example.COM")
        .await
        .unwrap();
    let record = ctx
        .token_service
        .verify_token(&token, TokenType::ResetPassword)
        .await
        .unwrap();
    assert_eq!(record.user_id, alice.id);
}

#[tokio::test]
async fn test_reset_token_unknown_email() {
    let ctx = TestContext::new().await;
    let err = ctx
        .token_service
        .generate_reset_password_token("ghost@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_verify_access_token_claims() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;
    let pair = ctx.token_service.generate_auth_tokens(&user.id).await.unwrap();

    let claims = ctx.token_service.verify_access_token(&pair.access.token).unwrap();
    assert_eq!(claims.subject(), user.id);

    // A refresh token is not an access token
    let err = ctx.token_service.verify_access_token(&pair.refresh.token).unwrap_err();
    assert_eq!(err.auth_error_type(), Some(AuthErrorType::MalformedToken));
}

#[tokio::test]
async fn test_purge_expired_tokens() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("alice", "alice@example.com").await;
    let codec = ctx.codec();

    let stale_at = Utc::now() - Duration::minutes(5);
    let stale = codec.sign(&user.id, stale_at, TokenType::Refresh).unwrap();
    ctx.tokens
        .save(NewTokenRecord::new(stale, user.id.clone(), TokenType::Refresh, stale_at))
        .await
        .unwrap();
    ctx.token_service.generate_auth_tokens(&user.id).await.unwrap();

    let purged = ctx.tokens.purge_expired(Utc::now()).await.unwrap();
    assert_eq!(purged, 1);

    let remaining = ctx
        .tokens
        .find_one(&TokenQuery::new().user_id(user.id.clone()).token_type(TokenType::Refresh))
        .await
        .unwrap();
    assert!(remaining.is_some());
}
