//! Authentication error types.

use bdaybook_core::error::CoreError;
use thiserror::Error;

/// Terminal, user-visible failures of the auth flows. None are retried.
///
/// `InvalidCredentials` carries the same message whether the email or the
/// password was wrong, so a caller cannot enumerate accounts through it.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already used")]
    EmailTaken,

    #[error("access denied")]
    InvalidCredentials,

    #[error("access denied")]
    RefreshDenied,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("user not found")]
    UserNotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("mail error: {0}")]
    Mail(String),

    /// Unexpected store failure, surfaced generically.
    #[error(transparent)]
    Store(#[from] CoreError),
}

pub type AuthResult<T> = Result<T, AuthError>;
