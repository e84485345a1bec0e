//! Redis Backend Module
//!
//! [`CacheBackend`] over a redis-rs `ConnectionManager`.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Cmd, FromRedisValue};
use tracing::info;

use crate::cache::CacheBackend;
use crate::config::CacheConfig;
use crate::error::CacheResult;

/// Redis-backed cache. Clones share one multiplexed connection that
/// reconnects on failure.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    // == Connect ==
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        Self::connect_url(&config.to_url()).await
    }

    pub async fn connect_url(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("cache connection established");
        Ok(Self { conn })
    }

    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> CacheResult<T> {
        let mut conn = self.conn.clone();
        Ok(cmd.query_async(&mut conn).await?)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> CacheResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if ttl_seconds > 0 {
            cmd.arg("EX").arg(ttl_seconds);
        }
        self.query(&cmd).await
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.query(redis::cmd("GET").arg(key)).await
    }

    async fn del(&self, key: &str) -> CacheResult<()> {
        self.query(redis::cmd("DEL").arg(key)).await
    }

    async fn hset(&self, key: &str, fields: &HashMap<String, String>) -> CacheResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        self.query(&cmd).await
    }

    async fn hget(&self, key: &str, field: &str) -> CacheResult<Option<String>> {
        self.query(redis::cmd("HGET").arg(key).arg(field)).await
    }

    async fn hgetall(&self, key: &str) -> CacheResult<HashMap<String, String>> {
        self.query(redis::cmd("HGETALL").arg(key)).await
    }

    async fn hdel(&self, key: &str, field: &str) -> CacheResult<()> {
        self.query(redis::cmd("HDEL").arg(key).arg(field)).await
    }

    async fn sadd(&self, key: &str, members: &[String]) -> CacheResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key);
        for member in members {
            cmd.arg(member);
        }
        self.query(&cmd).await
    }

    async fn srem(&self, key: &str, member: &str) -> CacheResult<()> {
        self.query(redis::cmd("SREM").arg(key).arg(member)).await
    }

    async fn sismember(&self, key: &str, member: &str) -> CacheResult<bool> {
        self.query(redis::cmd("SISMEMBER").arg(key).arg(member)).await
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> CacheResult<bool> {
        self.query(redis::cmd("EXPIRE").arg(key).arg(ttl_seconds)).await
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.query(redis::cmd("EXISTS").arg(key)).await
    }
}
