//! In-memory implementation of [`RefreshTokenRepository`].

use std::collections::HashMap;
use std::sync::Arc;

use bdaybook_core::error::{CoreError, CoreResult};
use bdaybook_core::models::refresh_token::{CreateRefreshToken, RefreshToken};
use bdaybook_core::repository::RefreshTokenRepository;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory refresh token table.
///
/// `consume` holds the write lock across match + remove, which gives the
/// exclusivity the trait requires: of two racing consumers of the same
/// token, exactly one receives the row.
#[derive(Clone, Default)]
pub struct MemoryRefreshTokenRepository {
    rows: Arc<RwLock<HashMap<Uuid, RefreshToken>>>,
}

impl MemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live rows for a user. Test/diagnostic helper.
    pub async fn count_for_user(&self, user_id: Uuid) -> u64 {
        self.rows
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .count() as u64
    }
}

impl RefreshTokenRepository for MemoryRefreshTokenRepository {
    async fn create(&self, input: CreateRefreshToken) -> CoreResult<RefreshToken> {
        let mut rows = self.rows.write().await;
        let row = RefreshToken {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            token: input.token,
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };
        rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn consume(&self, user_id: Uuid, token: &str) -> CoreResult<RefreshToken> {
        let mut rows = self.rows.write().await;

        let id = rows
            .values()
            .find(|r| r.user_id == user_id && r.token == token)
            .map(|r| r.id);

        match id {
            Some(id) => rows.remove(&id).ok_or_else(|| {
                CoreError::Internal("refresh token row vanished under write lock".into())
            }),
            None => Err(CoreError::NotFound {
                entity: "refresh_token".into(),
                id: user_id.to_string(),
            }),
        }
    }

    async fn delete(&self, user_id: Uuid, token: &str) -> CoreResult<()> {
        self.rows
            .write()
            .await
            .retain(|_, r| !(r.user_id == user_id && r.token == token));
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> CoreResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, r| r.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, r| r.expires_at >= now);
        Ok((before - rows.len()) as u64)
    }
}
