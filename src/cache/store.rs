//! Memory Store Module
//!
//! In-process cache engine with string, hash and set values, TTL expiration
//! and Redis-compatible command semantics.

use std::collections::{HashMap, HashSet};

use crate::cache::{CacheData, CacheEntry};
use crate::error::{CacheError, CacheResult};

fn wrong_type(key: &str, found: &CacheData) -> CacheError {
    CacheError::Store(format!(
        "WRONGTYPE Operation against a key holding the wrong kind of value ({key} is a {})",
        found.type_name()
    ))
}

// == Memory Store ==
/// Key space of the in-memory backend.
///
/// Expired entries are invisible to every command and removed lazily on
/// access or in bulk by [`MemoryStore::cleanup_expired`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, CacheEntry>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut CacheEntry> {
        if self.entries.get(key).is_some_and(CacheEntry::is_expired) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    /// Removes `key` if its hash or set became empty.
    fn drop_if_empty(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(|e| e.data.is_empty()) {
            self.entries.remove(key);
        }
    }

    // == Strings ==
    /// Stores a string value, replacing any previous value and TTL.
    pub fn set(&mut self, key: String, value: String, ttl_seconds: u64) {
        self.entries
            .insert(key, CacheEntry::new(CacheData::Value(value), ttl_seconds));
    }

    pub fn get(&mut self, key: &str) -> CacheResult<Option<String>> {
        match self.live(key) {
            None => Ok(None),
            Some(CacheEntry {
                data: CacheData::Value(value),
                ..
            }) => Ok(Some(value.clone())),
            Some(entry) => Err(wrong_type(key, &entry.data)),
        }
    }

    /// Removes `key`. Returns whether it existed.
    pub fn del(&mut self, key: &str) -> bool {
        self.live(key).is_some() && self.entries.remove(key).is_some()
    }

    // == Hashes ==
    /// Sets hash fields, creating the hash if needed. An existing TTL is kept.
    pub fn hset<I>(&mut self, key: &str, fields: I) -> CacheResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if self.live(key).is_none() {
            self.entries.insert(
                key.to_string(),
                CacheEntry::new(CacheData::Hash(HashMap::new()), 0),
            );
        }
        match self.entries.get_mut(key) {
            Some(CacheEntry {
                data: CacheData::Hash(hash),
                ..
            }) => {
                hash.extend(fields);
            }
            Some(entry) => return Err(wrong_type(key, &entry.data)),
            None => {}
        }
        self.drop_if_empty(key);
        Ok(())
    }

    pub fn hget(&mut self, key: &str, field: &str) -> CacheResult<Option<String>> {
        match self.live(key) {
            None => Ok(None),
            Some(CacheEntry {
                data: CacheData::Hash(hash),
                ..
            }) => Ok(hash.get(field).cloned()),
            Some(entry) => Err(wrong_type(key, &entry.data)),
        }
    }

    pub fn hgetall(&mut self, key: &str) -> CacheResult<HashMap<String, String>> {
        match self.live(key) {
            None => Ok(HashMap::new()),
            Some(CacheEntry {
                data: CacheData::Hash(hash),
                ..
            }) => Ok(hash.clone()),
            Some(entry) => Err(wrong_type(key, &entry.data)),
        }
    }

    /// Removes a hash field. Returns whether it existed.
    pub fn hdel(&mut self, key: &str, field: &str) -> CacheResult<bool> {
        let removed = match self.live(key) {
            None => false,
            Some(CacheEntry {
                data: CacheData::Hash(hash),
                ..
            }) => hash.remove(field).is_some(),
            Some(entry) => return Err(wrong_type(key, &entry.data)),
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    // == Sets ==
    /// Adds members, creating the set if needed. An existing TTL is kept.
    pub fn sadd<I>(&mut self, key: &str, members: I) -> CacheResult<()>
    where
        I: IntoIterator<Item = String>,
    {
        if self.live(key).is_none() {
            self.entries.insert(
                key.to_string(),
                CacheEntry::new(CacheData::Set(HashSet::new()), 0),
            );
        }
        match self.entries.get_mut(key) {
            Some(CacheEntry {
                data: CacheData::Set(set),
                ..
            }) => {
                set.extend(members);
            }
            Some(entry) => return Err(wrong_type(key, &entry.data)),
            None => {}
        }
        self.drop_if_empty(key);
        Ok(())
    }

    /// Removes a member. Returns whether it was present.
    pub fn srem(&mut self, key: &str, member: &str) -> CacheResult<bool> {
        let removed = match self.live(key) {
            None => false,
            Some(CacheEntry {
                data: CacheData::Set(set),
                ..
            }) => set.remove(member),
            Some(entry) => return Err(wrong_type(key, &entry.data)),
        };
        self.drop_if_empty(key);
        Ok(removed)
    }

    pub fn sismember(&mut self, key: &str, member: &str) -> CacheResult<bool> {
        match self.live(key) {
            None => Ok(false),
            Some(CacheEntry {
                data: CacheData::Set(set),
                ..
            }) => Ok(set.contains(member)),
            Some(entry) => Err(wrong_type(key, &entry.data)),
        }
    }

    // == Keys ==
    /// Sets the TTL of an existing key. A zero TTL deletes the key, as
    /// `EXPIRE key 0` does. Returns whether the key existed.
    pub fn expire(&mut self, key: &str, ttl_seconds: u64) -> bool {
        if ttl_seconds == 0 {
            return self.del(key);
        }
        match self.live(key) {
            None => false,
            Some(entry) => {
                entry.set_ttl(ttl_seconds);
                true
            }
        }
    }

    pub fn exists(&mut self, key: &str) -> bool {
        self.live(key).is_some()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_store_new() {
        let store = MemoryStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = MemoryStore::new();

        store.set("key1".to_string(), "value1".to_string(), 0);
        assert_eq!(store.get("key1").unwrap(), Some("value1".to_string()));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_store_del() {
        let mut store = MemoryStore::new();

        store.set("key1".to_string(), "value1".to_string(), 0);
        assert!(store.del("key1"));
        assert!(!store.del("key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = MemoryStore::new();

        store.set("key1".to_string(), "value1".to_string(), 1);
        assert!(store.exists("key1"));

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get("key1").unwrap(), None);
        assert!(!store.exists("key1"));
    }

    #[test]
    fn test_store_set_resets_ttl() {
        let mut store = MemoryStore::new();

        store.set("key1".to_string(), "a".to_string(), 1);
        store.set("key1".to_string(), "b".to_string(), 0);

        sleep(Duration::from_millis(1100));
        assert_eq!(store.get("key1").unwrap(), Some("b".to_string()));
    }

    #[test]
    fn test_store_hash_fields() {
        let mut store = MemoryStore::new();

        store.hset("h", fields(&[("a", "1"), ("b", "2")])).unwrap();
        store.hset("h", fields(&[("b", "3")])).unwrap();

        assert_eq!(store.hget("h", "a").unwrap(), Some("1".to_string()));
        assert_eq!(store.hget("h", "b").unwrap(), Some("3".to_string()));
        assert_eq!(store.hget("h", "c").unwrap(), None);
        assert_eq!(store.hgetall("h").unwrap().len(), 2);
    }

    #[test]
    fn test_store_hdel_last_field_removes_key() {
        let mut store = MemoryStore::new();

        store.hset("h", fields(&[("a", "1")])).unwrap();
        assert!(store.hdel("h", "a").unwrap());
        assert!(!store.hdel("h", "a").unwrap());
        assert!(!store.exists("h"));
    }

    #[test]
    fn test_store_hset_keeps_ttl() {
        let mut store = MemoryStore::new();

        store.hset("h", fields(&[("a", "1")])).unwrap();
        assert!(store.expire("h", 60));
        store.hset("h", fields(&[("b", "2")])).unwrap();

        assert!(store.entries["h"].expires_at.is_some());
    }

    #[test]
    fn test_store_sets() {
        let mut store = MemoryStore::new();

        store
            .sadd("s", vec!["x".to_string(), "y".to_string(), "x".to_string()])
            .unwrap();
        assert!(store.sismember("s", "x").unwrap());
        assert!(!store.sismember("s", "z").unwrap());
        assert!(store.srem("s", "x").unwrap());
        assert!(store.srem("s", "y").unwrap());
        assert!(!store.exists("s"));
    }

    #[test]
    fn test_store_wrong_type() {
        let mut store = MemoryStore::new();

        store.set("k".to_string(), "v".to_string(), 0);
        assert!(matches!(store.hget("k", "f"), Err(CacheError::Store(_))));
        assert!(matches!(
            store.sadd("k", vec!["m".to_string()]),
            Err(CacheError::Store(_))
        ));

        store.sadd("s", vec!["m".to_string()]).unwrap();
        assert!(matches!(store.get("s"), Err(CacheError::Store(_))));
    }

    #[test]
    fn test_store_expire_missing_key() {
        let mut store = MemoryStore::new();
        assert!(!store.expire("missing", 10));
    }

    #[test]
    fn test_store_expire_zero_deletes() {
        let mut store = MemoryStore::new();

        store.set("k".to_string(), "v".to_string(), 0);
        assert!(store.expire("k", 0));
        assert!(!store.exists("k"));
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = MemoryStore::new();

        store.set("key1".to_string(), "value1".to_string(), 1);
        store.set("key2".to_string(), "value2".to_string(), 10);

        sleep(Duration::from_millis(1100));

        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.exists("key2"));
    }
}
