//! HS256 JWT issuance and verification for access, refresh, and
//! single-purpose tokens.
//!
//! Each purpose signs with its own secret, so a token can only be
//! verified for the purpose it was minted for.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Claims embedded in every token this crate issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — user ID (UUID string).
    pub sub: String,
    pub email: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID. Two tokens minted within the same second must
    /// still be distinct strings (the ledger keys rows by the full token).
    pub jti: String,
}

impl Claims {
    /// Parse the subject claim as a user ID.
    pub fn subject(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub)
            .map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))
    }
}

/// An access/refresh pair as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issue a token scoped to one purpose by its dedicated secret.
pub fn issue_purpose_token(
    user_id: Uuid,
    email: &str,
    ttl_secs: i64,
    secret: &str,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_owned(),
        iat: now,
        exp: now + ttl_secs,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    jsonwebtoken::encode(&Header::default(), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Issue a signed access token (15-minute default TTL).
pub fn issue_access_token(
    user_id: Uuid,
    email: &str,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    issue_purpose_token(
        user_id,
        email,
        config.access_token_ttl_secs as i64,
        &config.access_token_secret,
    )
}

/// Issue a signed refresh token (30-day default TTL).
pub fn issue_refresh_token(
    user_id: Uuid,
    email: &str,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    issue_purpose_token(
        user_id,
        email,
        config.refresh_token_ttl_secs as i64,
        &config.refresh_token_secret,
    )
}

/// Issue a fresh access/refresh pair.
pub fn issue_token_pair(
    user_id: Uuid,
    email: &str,
    config: &AuthConfig,
) -> Result<TokenPair, AuthError> {
    Ok(TokenPair {
        access_token: issue_access_token(user_id, email, config)?,
        refresh_token: issue_refresh_token(user_id, email, config)?,
    })
}

/// Decode and verify a token against the given purpose secret.
///
/// Fails with `TokenExpired` on lapsed TTL and `TokenInvalid` on a bad
/// signature or malformed payload — including tokens signed with another
/// purpose's secret.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    jsonwebtoken::decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}
