//! Error types shared across the bdaybook crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Mail delivery failed: {0}")]
    MailDelivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
