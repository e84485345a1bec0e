//! Memory Backend Module
//!
//! [`CacheBackend`] over a shared in-process [`MemoryStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheBackend, MemoryStore};
use crate::error::CacheResult;

/// In-process backend for tests and local development.
///
/// Clones share the same key space.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes expired entries. Returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> CacheResult<()> {
        self.store
            .write()
            .await
            .set(key.to_string(), value, ttl_seconds);
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.store.write().await.get(key)
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.store.write().await.del(key);
        Ok(())
    }

    async fn hset(&self, key: &str, fields: &HashMap<String, String>) -> CacheResult<()> {
        let fields = fields.iter().map(|(f, v)| (f.clone(), v.clone()));
        self.store.write().await.hset(key, fields)
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        self.store.write().await.hget(key, field)
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        self.store.write().await.hgetall(key)
    }

    async fn hdel(&self, key: &str, field: &str) -> CacheResult<()> {
        self.store.write().await.hdel(key, field).map(|_| ())
    }

    async fn sadd(&self, key: &str, members: &[String]) -> CacheResult<()> {
        self.store
            .write()
            .await
            .sadd(key, members.iter().cloned())
    }

    async fn srem(&self, key: &str, member: &str) -> CacheResult<()> {
        self.store.write().await.srem(key, member).map(|_| ())
    }

    async fn sismember(&self, key: &str, member: &str) -> CacheResult<bool> {
        self.store.write().await.sismember(key, member)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool> {
        Ok(self.store.write().await.expire(key, ttl_seconds))
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.store.write().await.exists(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_key_space() {
        let backend = MemoryBackend::new();
        let other = backend.clone();

        backend.set("k", "v".to_string(), 0).await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(other.len().await, 1);
    }

    #[tokio::test]
    async fn test_hash_round_trip() {
        let backend = MemoryBackend::new();
        let fields = HashMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);

        backend.hset("h", &fields).await.unwrap();
        assert_eq!(backend.hgetall("h").await.unwrap(), fields);
        backend.hdel("h", "a").await.unwrap();
        assert_eq!(backend.hget("h", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_removals_of_missing_keys_succeed() {
        let backend = MemoryBackend::new();

        backend.del("missing").await.unwrap();
        backend.hdel("missing", "f").await.unwrap();
        backend.srem("missing", "m").await.unwrap();
        assert!(backend.is_empty().await);
    }
}
