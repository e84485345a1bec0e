//! Cache Repository Module
//!
//! Value, hash-field and set operations over a [`CacheBackend`], each bounded
//! by its own timeout. Values are JSON-encoded on write and decoded on read.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{CacheBackend, RedisBackend};
use crate::config::{CacheConfig, DEFAULT_TIMEOUT_SECS};
use crate::error::{CacheError, CacheResult};

/// TTL value meaning "no expiration" on writes.
pub const KEEP_TTL: u64 = 0;

// == Cache Repository ==
/// Typed cache operations over a backend.
#[derive(Debug, Clone)]
pub struct CacheRepository<B> {
    backend: B,
    timeout: Duration,
}

impl CacheRepository<RedisBackend> {
    /// Connects to Redis and applies the configured command timeout.
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        let backend = RedisBackend::connect(config).await?;
        Ok(Self::new(backend).with_timeout(config.command_timeout()))
    }
}

impl<B: CacheBackend> CacheRepository<B> {
    // == Constructor ==
    /// Wraps `backend` with the default per-call timeout.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Replaces the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs one operation under the timeout.
    async fn run<T, Fut>(&self, op: &'static str, key: &str, fut: Fut) -> CacheResult<T>
    where
        Fut: Future<Output = CacheResult<T>>,
    {
        debug!(op, key, "cache call");
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, key, timeout = ?self.timeout, "cache call timed out");
                Err(CacheError::Timeout(self.timeout))
            }
        }
    }

    /// Refreshes the key's expiry when `ttl` is non-zero.
    async fn refresh_ttl(&self, key: &str, ttl: u64) -> CacheResult<()> {
        if ttl > 0 {
            self.backend.expire(key, ttl).await?;
        }
        Ok(())
    }

    // == Values ==
    /// Stores `value` as JSON under `key`. A `ttl` of [`KEEP_TTL`] means no
    /// expiration.
    pub async fn save_value<V>(&self, key: &str, value: &V, ttl: u64) -> CacheResult<()>
    where
        V: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string(value).map_err(CacheError::Serialization)?;
        self.run("save_value", key, self.backend.set(key, encoded, ttl))
            .await
    }

    /// Reads and decodes the value under `key`.
    pub async fn get_value<V: DeserializeOwned>(&self, key: &str) -> CacheResult<V> {
        let raw = self
            .run("get_value", key, self.backend.get(key))
            .await?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        serde_json::from_str(&raw).map_err(CacheError::Deserialization)
    }

    /// Removes `key`. Succeeds when it is already absent.
    pub async fn remove_value(&self, key: &str) -> CacheResult<()> {
        self.run("remove_value", key, self.backend.del(key)).await
    }

    // == Hashes ==
    /// Sets one hash field. A non-zero `ttl` refreshes the whole key's expiry.
    pub async fn save_hash_field(&self, key: &str, field: &str, value: &str, ttl: u64) -> CacheResult<()> {
        let fields = HashMap::from([(field.to_string(), value.to_string())]);
        self.save_all_hash_fields(key, &fields, ttl).await
    }

    /// Sets every field in `fields`. A non-zero `ttl` refreshes the whole
    /// key's expiry.
    pub async fn save_all_hash_fields(
        &self,
        key: &str,
        fields: &HashMap<String, String>,
        ttl: u64,
    ) -> CacheResult<()> {
        self.run("save_hash_fields", key, async {
            self.backend.hset(key, fields).await?;
            self.refresh_ttl(key, ttl).await
        })
        .await
    }

    pub async fn get_hash_field(&self, key: &str, field: &str) -> CacheResult<String> {
        self.run("get_hash_field", key, self.backend.hget(key, field))
            .await?
            .ok_or_else(|| CacheError::NotFound(format!("{key}.{field}")))
    }

    /// Returns every field of the hash. A missing or empty hash is not found.
    pub async fn get_all_hash_fields(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        let fields = self
            .run("get_all_hash_fields", key, self.backend.hgetall(key))
            .await?;
        if fields.is_empty() {
            return Err(CacheError::NotFound(key.to_string()));
        }
        Ok(fields)
    }

    /// Removes one hash field. Succeeds when it is already absent.
    pub async fn remove_hash_field(&self, key: &str, field: &str) -> CacheResult<()> {
        self.run("remove_hash_field", key, self.backend.hdel(key, field))
            .await
    }

    // == Sets ==
    /// Adds members to the set. A non-zero `ttl` refreshes the whole key's
    /// expiry.
    pub async fn add_set_member<M: AsRef<str>>(&self, key: &str, ttl: u64, members: &[M]) -> CacheResult<()> {
        let members: Vec<String> = members.iter().map(|m| m.as_ref().to_string()).collect();
        self.run("add_set_member", key, async {
            self.backend.sadd(key, &members).await?;
            self.refresh_ttl(key, ttl).await
        })
        .await
    }

    /// Removes a member. Succeeds when it is already absent.
    pub async fn remove_set_member(&self, key: &str, member: &str) -> CacheResult<()> {
        self.run("remove_set_member", key, self.backend.srem(key, member))
            .await
    }

    pub async fn check_set_member(&self, key: &str, member: &str) -> CacheResult<bool> {
        self.run("check_set_member", key, self.backend.sismember(key, member))
            .await
    }

    // == Keys ==
    /// Sets the expiry of an existing key. A missing key is a no-op; a `ttl`
    /// of zero expires the key immediately.
    pub async fn set_expire(&self, key: &str, ttl: u64) -> CacheResult<()> {
        self.run("set_expire", key, self.backend.expire(key, ttl))
            .await
            .map(|_| ())
    }

    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.run("exists", key, self.backend.exists(key)).await
    }
}
