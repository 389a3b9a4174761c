//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations are expected to
//! provide the per-operation atomicity documented on each method; the
//! auth crate relies on those guarantees and adds none of its own.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{
    refresh_token::{CreateRefreshToken, RefreshToken},
    user::{CreateUser, UpdateUser, User},
};

pub trait UserRepository: Send + Sync {
    /// Create a user. Fails with `AlreadyExists` when the email is taken;
    /// the uniqueness check and the insert must be one atomic step.
    fn create(&self, input: CreateUser) -> impl Future<Output = CoreResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = CoreResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = CoreResult<User>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = CoreResult<()>> + Send;
}

pub trait RefreshTokenRepository: Send + Sync {
    fn create(
        &self,
        input: CreateRefreshToken,
    ) -> impl Future<Output = CoreResult<RefreshToken>> + Send;

    /// Atomically find the row matching `(user_id, token)`, delete it, and
    /// return it. Fails with `NotFound` when no row matches.
    ///
    /// Matching and deleting must be exclusive with respect to concurrent
    /// `consume` calls on the same token: of two racing calls, exactly one
    /// may receive the row.
    fn consume(
        &self,
        user_id: Uuid,
        token: &str,
    ) -> impl Future<Output = CoreResult<RefreshToken>> + Send;

    /// Delete the row matching `(user_id, token)`, if any.
    fn delete(&self, user_id: Uuid, token: &str) -> impl Future<Output = CoreResult<()>> + Send;

    /// Delete every row for the user; returns the number removed.
    fn delete_all_for_user(&self, user_id: Uuid) -> impl Future<Output = CoreResult<u64>> + Send;

    /// Delete all rows with `expires_at < now`; returns the number removed.
    fn delete_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = CoreResult<u64>> + Send;
}
