//! Cache Backend Module
//!
//! The primitive command surface the cache repository is built on.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::CacheResult;

// == Cache Backend ==
/// Primitive cache commands. TTLs are in seconds.
///
/// Implementations follow Redis semantics: missing keys read as `None` or
/// empty, removals of missing keys succeed, and commands against a key of
/// another type fail with a store error.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// `SET`, with `EX ttl_seconds` when non-zero.
    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> CacheResult<()>;

    /// `GET`
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// `DEL`
    async fn del(&self, key: &str) -> CacheResult<()>;

    /// `HSET key field value [field value ...]`
    async fn hset(&self, key: &str, fields: &HashMap<String, String>) -> CacheResult<()>;

    /// `HGET`
    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>>;

    /// `HGETALL`; empty when the key is missing.
    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>>;

    /// `HDEL`
    async fn hdel(&self, key: &str, field: &str) -> CacheResult<()>;

    /// `SADD`
    async fn sadd(&self, key: &str, members: &[String]) -> CacheResult<()>;

    /// `SREM`
    async fn srem(&self, key: &str, member: &str) -> CacheResult<()>;

    /// `SISMEMBER`
    async fn sismember(&self, key: &str, member: &str) -> CacheResult<bool>;

    /// `EXPIRE`; returns whether the key existed.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool>;

    /// `EXISTS`
    async fn exists(&self, key: &str) -> CacheResult<bool>;
}
