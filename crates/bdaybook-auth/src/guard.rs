//! Request guard chain.
//!
//! Explicit functions composed in a fixed order — authenticate, load
//! user, check verified flag — for the HTTP layer to call in front of
//! its handlers.

use bdaybook_core::error::CoreError;
use bdaybook_core::models::user::User;
use bdaybook_core::repository::UserRepository;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::token::{self, Claims};

/// Validate an access token (signature, expiry) and return its claims.
/// Purely stateless — no store lookup is performed.
pub fn authenticate(access_token: &str, config: &AuthConfig) -> AuthResult<Claims> {
    token::decode_token(access_token, &config.access_token_secret)
}

/// Load the user named by validated claims. A subject that no longer
/// exists makes the token invalid.
pub async fn load_user<U: UserRepository>(repo: &U, claims: &Claims) -> AuthResult<User> {
    let user_id = claims.subject()?;
    repo.get_by_id(user_id).await.map_err(|e| match e {
        CoreError::NotFound { .. } => AuthError::TokenInvalid("unknown subject".into()),
        other => AuthError::from(other),
    })
}

/// Reject users that have not completed email verification.
pub fn require_verified(user: &User) -> AuthResult<()> {
    if user.verified {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// authenticate → load user.
pub async fn authorize<U: UserRepository>(
    repo: &U,
    config: &AuthConfig,
    access_token: &str,
) -> AuthResult<User> {
    let claims = authenticate(access_token, config)?;
    load_user(repo, &claims).await
}

/// authenticate → load user → check verified.
pub async fn authorize_verified<U: UserRepository>(
    repo: &U,
    config: &AuthConfig,
    access_token: &str,
) -> AuthResult<User> {
    let user = authorize(repo, config, access_token).await?;
    require_verified(&user)?;
    Ok(user)
}
