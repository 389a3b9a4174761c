//! Refresh token ledger — the authoritative record of which refresh
//! tokens are currently valid, and the rotation/revocation protocol
//! that prevents replay.

use bdaybook_core::error::CoreError;
use bdaybook_core::models::refresh_token::CreateRefreshToken;
use bdaybook_core::repository::RefreshTokenRepository;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::token::{self, TokenPair};

/// Tracks issued refresh tokens per user. Multiple rows per user are
/// allowed (multi-device); each row is redeemable exactly once.
#[derive(Clone)]
pub struct RefreshTokenLedger<R> {
    repo: R,
    config: AuthConfig,
}

impl<R: RefreshTokenRepository> RefreshTokenLedger<R> {
    pub fn new(repo: R, config: AuthConfig) -> Self {
        Self { repo, config }
    }

    /// Record a newly issued refresh token for the user.
    pub async fn record(&self, user_id: Uuid, token: &str) -> AuthResult<()> {
        let expires_at =
            Utc::now() + Duration::seconds(self.config.refresh_token_ttl_secs as i64);
        self.repo
            .create(CreateRefreshToken {
                user_id,
                token: token.to_owned(),
                expires_at,
            })
            .await?;
        Ok(())
    }

    /// Redeem a presented refresh token for a new access/refresh pair.
    ///
    /// The matched row is deleted before the new pair is issued — the
    /// anti-replay step. A token can be redeemed exactly once; reuse of
    /// an already-rotated token is indistinguishable from an unknown one.
    /// The store's `consume` makes match + delete exclusive, so two
    /// concurrent rotations of the same token have exactly one winner.
    pub async fn rotate(
        &self,
        user_id: Uuid,
        email: &str,
        presented_token: &str,
    ) -> AuthResult<TokenPair> {
        let row = self
            .repo
            .consume(user_id, presented_token)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => AuthError::RefreshDenied,
                other => AuthError::from(other),
            })?;

        // An expired row is consumed but never honored.
        if row.expires_at <= Utc::now() {
            return Err(AuthError::RefreshDenied);
        }

        let pair = token::issue_token_pair(user_id, email, &self.config)?;
        self.record(user_id, &pair.refresh_token).await?;
        Ok(pair)
    }

    /// Revoke a single refresh token, or all of the user's tokens when
    /// `token` is `None` (logout-all, password change, forced
    /// invalidation).
    pub async fn revoke(&self, user_id: Uuid, token: Option<&str>) -> AuthResult<()> {
        match token {
            Some(token) => self.repo.delete(user_id, token).await?,
            None => {
                self.repo.delete_all_for_user(user_id).await?;
            }
        }
        Ok(())
    }

    /// Delete all rows that expired before `now`; returns the count.
    ///
    /// Maintenance only — rotation already refuses expired rows, so
    /// skipping the sweep costs storage, never correctness.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        Ok(self.repo.delete_expired(now).await?)
    }
}
