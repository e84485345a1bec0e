//! Cache Module
//!
//! Typed cache repository over a pluggable backend: Redis in production, an
//! in-memory store with TTL expiration for tests and local development.

mod backend;
mod entry;
mod memory;
mod redis;
mod repository;
mod store;


// Re-export public types
pub use self::redis::RedisBackend;
pub use backend::CacheBackend;
pub use entry::{CacheData, CacheEntry};
pub use memory::MemoryBackend;
pub use repository::{CacheRepository, KEEP_TTL};
pub use store::MemoryStore;
