//! Signed expiring token encoding and decoding.
//!
//! [`TokenCodec`] is the stateless layer of the token stack: it binds
//! `{subject, issued-at, expiry, type}` under an HS256 signature. Whether a
//! token is also *persisted* is the token service's concern, not this one's.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::models::TokenType;
use crate::domain::UserId;
use crate::errors::{AuthErrorType, Error, Result};

/// Claims carried by every gatekey token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Credential kind the token was minted as
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Unique token identifier; makes two signings with identical
    /// subject/type/expiry produce distinct strings
    pub jti: String,
}

impl Claims {
    pub fn subject(&self) -> UserId {
        UserId::from_str_unchecked(&self.sub)
    }
}

/// Encodes and decodes signed, expiring tokens with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a new codec with the given shared secret.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::default();
        // No leeway: a token one second past expiry is expired.
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token for `subject` expiring at `expires_at`.
    pub fn sign(
        &self,
        subject: &UserId,
        expires_at: DateTime<Utc>,
        token_type: TokenType,
    ) -> Result<String> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
            token_type,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| Error::internal(format!("Failed to sign token: {}", err)))
    }

    /// Verify signature and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
                match err.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        Error::auth("Token has expired", AuthErrorType::ExpiredToken)
                    }
                    _ => Error::auth("Invalid token", AuthErrorType::MalformedToken),
                }
            })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn sign_verify_round_trip() {
        let codec = codec();
        let user = UserId::new();
        let expires = Utc::now() + Duration::minutes(5);

        let token = codec.sign(&user, expires, TokenType::Access).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.subject(), user);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp, expires.timestamp());
    }

    #[test]
    fn same_inputs_produce_distinct_tokens() {
        let codec = codec();
        let user = UserId::new();
        let expires = Utc::now() + Duration::minutes(5);

        let a = codec.sign(&user, expires, TokenType::Refresh).unwrap();
        let b = codec.sign(&user, expires, TokenType::Refresh).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec();
        let token = codec
            .sign(&UserId::new(), Utc::now() - Duration::seconds(1), TokenType::Refresh)
            .unwrap();

        let err = codec.verify(&token).unwrap_err();
        assert_eq!(err.auth_error_type(), Some(AuthErrorType::ExpiredToken));
    }

    #[test]
    fn one_second_before_expiry_verifies() {
        let codec = codec();
        let token = codec
            .sign(&UserId::new(), Utc::now() + Duration::seconds(1), TokenType::Refresh)
            .unwrap();

        assert!(codec.verify(&token).is_ok());
    }

    #[test]
    fn tampered_token_is_malformed() {
        let codec = codec();
        let token = codec
            .sign(&UserId::new(), Utc::now() + Duration::minutes(5), TokenType::Access)
            .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        let err = codec.verify(&tampered).unwrap_err();
        assert_eq!(err.auth_error_type(), Some(AuthErrorType::MalformedToken));

        let err = codec.verify("not.a.jwt").unwrap_err();
        assert_eq!(err.auth_error_type(), Some(AuthErrorType::MalformedToken));
    }

    #[test]
    fn wrong_secret_is_malformed() {
        let token = codec()
            .sign(&UserId::new(), Utc::now() + Duration::minutes(5), TokenType::Access)
            .unwrap();

        let other = TokenCodec::new(b"ffffffffffffffffffffffffffffffff");
        let err = other.verify(&token).unwrap_err();
        assert_eq!(err.auth_error_type(), Some(AuthErrorType::MalformedToken));
    }
}
