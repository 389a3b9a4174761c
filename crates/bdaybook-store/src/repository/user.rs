//! In-memory implementation of [`UserRepository`].

use std::collections::HashMap;
use std::sync::Arc;

use bdaybook_core::error::{CoreError, CoreResult};
use bdaybook_core::models::user::{CreateUser, UpdateUser, User};
use bdaybook_core::repository::UserRepository;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory user table. Email uniqueness is enforced under the write
/// lock, so check + insert is one atomic step.
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: impl ToString) -> CoreError {
    CoreError::NotFound {
        entity: "user".into(),
        id: id.to_string(),
    }
}

impl UserRepository for MemoryUserRepository {
    async fn create(&self, input: CreateUser) -> CoreResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == input.email) {
            return Err(CoreError::AlreadyExists {
                entity: "user".into(),
            });
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: input.email,
            password_hash: input.password_hash,
            verified: false,
            full_name: input.full_name,
            birthday: input.birthday,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<User> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn get_by_email(&self, email: &str) -> CoreResult<User> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| not_found(email))
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> CoreResult<User> {
        let mut users = self.users.write().await;

        if let Some(new_email) = &input.email {
            if users.values().any(|u| u.id != id && &u.email == new_email) {
                return Err(CoreError::AlreadyExists {
                    entity: "user".into(),
                });
            }
        }

        let user = users.get_mut(&id).ok_or_else(|| not_found(id))?;
        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(full_name) = input.full_name {
            user.full_name = full_name;
        }
        if let Some(birthday) = input.birthday {
            user.birthday = birthday;
        }
        if let Some(password_hash) = input.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(verified) = input.verified {
            user.verified = verified;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}
