//! Password hashing and verification using Argon2id.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::AuthError;

/// Argon2id instance with OWASP ASVS recommended parameters:
/// m=19456 (19 MiB), t=2, p=1.
fn argon2() -> Result<Argon2<'static>, AuthError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

fn peppered<'a>(password: &'a str, pepper: Option<&str>) -> std::borrow::Cow<'a, str> {
    match pepper {
        Some(p) => std::borrow::Cow::Owned(format!("{p}{password}")),
        None => std::borrow::Cow::Borrowed(password),
    }
}

/// Hash a plaintext password into a PHC-format string.
///
/// The salt is randomly generated per call, so hashing the same
/// plaintext twice yields different digests. Empty input is rejected.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation("password must not be empty".into()));
    }

    let input = peppered(password, pepper);
    let salt = SaltString::generate(&mut OsRng);
    argon2()?
        .hash_password(input.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Crypto(format!("hash error: {e}")))
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// If `pepper` is provided it must match the pepper used during hashing.
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let input = peppered(password, pepper);

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    match argon2()?.verify_password(input.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// Generate a random alphanumeric temporary password for the reset flow.
pub fn generate_temp_password(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
