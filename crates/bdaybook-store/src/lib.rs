//! bdaybook store — in-memory implementations of the `bdaybook-core`
//! repository traits.
//!
//! This is the reference store used by tests and local development. A
//! persistent engine implements the same traits for production; the
//! contracts it must honor (atomic `consume`, unique email at create)
//! are documented on the traits and exercised by this crate's tests.

mod repository;

pub use repository::{MemoryRefreshTokenRepository, MemoryUserRepository};
