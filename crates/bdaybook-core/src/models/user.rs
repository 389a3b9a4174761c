//! User domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique, compared case-sensitively as stored.
    pub email: String,
    /// Argon2id PHC-format hash. Never leaves the backend.
    pub password_hash: String,
    pub verified: bool,
    pub full_name: String,
    pub birthday: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    /// Already hashed — plaintext never reaches the store.
    pub password_hash: String,
    pub full_name: String,
    pub birthday: NaiveDate,
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub password_hash: Option<String>,
    pub verified: Option<bool>,
}

/// The projection returned to clients — everything except credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub verified: bool,
    pub full_name: String,
    pub birthday: NaiveDate,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            verified: user.verified,
            full_name: user.full_name,
            birthday: user.birthday,
        }
    }
}
