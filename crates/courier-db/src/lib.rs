//! # courier-db
//!
//! Persistence layer: PostgreSQL repositories behind the domain traits, plus
//! in-memory implementations for tests and local development.

pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

pub use memory::{MemoryMessageRepository, MemoryUserRepository};
pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use repositories::{PgMessageRepository, PgUserRepository};
