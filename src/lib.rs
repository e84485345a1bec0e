//! Repository SDK - generic data access over a relational store and a cache
//!
//! Provides a paginated CRUD repository for any [`db::Entity`] on top of
//! sqlx, and a typed value/hash/set cache repository on top of Redis.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod tasks;
pub mod telemetry;

pub use cache::{CacheBackend, CacheRepository, MemoryBackend, RedisBackend};
pub use config::{CacheConfig, DatabaseConfig};
pub use db::{Database, Entity, GenericRepository, PaginationMetadata, Repository, Scope};
pub use error::{CacheError, DbError};
pub use tasks::spawn_cleanup_task;
