//! bdaybook core — domain models, repository traits, and the outbound
//! mail abstraction shared across all crates.

pub mod error;
pub mod mailer;
pub mod models;
pub mod repository;

pub use error::{CoreError, CoreResult};
