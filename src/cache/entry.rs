//! Cache Entry Module
//!
//! Defines the structure for individual in-memory cache entries with TTL support.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Data ==
/// The value shapes a key can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheData {
    /// Plain string value
    Value(String),
    /// Field-to-value mapping
    Hash(HashMap<String, String>),
    /// Unordered unique members
    Set(HashSet<String>),
}

impl CacheData {
    /// Redis-style type name, used in WRONGTYPE errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            CacheData::Value(_) => "string",
            CacheData::Hash(_) => "hash",
            CacheData::Set(_) => "set",
        }
    }

    /// Empty hashes and sets do not exist as keys.
    pub fn is_empty(&self) -> bool {
        match self {
            CacheData::Value(_) => false,
            CacheData::Hash(fields) => fields.is_empty(),
            CacheData::Set(members) => members.is_empty(),
        }
    }
}

// == Cache Entry ==
/// A single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored data
    pub data: CacheData,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry. A TTL of zero seconds means no expiration.
    pub fn new(data: CacheData, ttl_seconds: u64) -> Self {
        let mut entry = Self {
            data,
            created_at: current_timestamp_ms(),
            expires_at: None,
        };
        entry.set_ttl(ttl_seconds);
        entry
    }

    // == Set TTL ==
    /// Sets expiration `ttl_seconds` from now, or clears it when zero.
    pub fn set_ttl(&mut self, ttl_seconds: u64) {
        self.expires_at = (ttl_seconds > 0)
            .then(|| current_timestamp_ms().saturating_add(ttl_seconds.saturating_mul(1000)));
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches the expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Returns remaining TTL in seconds, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| ms / 1000)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn value(v: &str) -> CacheData {
        CacheData::Value(v.to_string())
    }

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(value("test_value"), 0);

        assert_eq!(entry.data, value("test_value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = CacheEntry::new(value("test_value"), 60);

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(value("test_value"), 1);

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_set_ttl_zero_clears_expiration() {
        let mut entry = CacheEntry::new(value("v"), 30);
        entry.set_ttl(0);
        assert!(entry.expires_at.is_none());
        assert!(entry.ttl_remaining().is_none());
    }

    #[test]
    fn test_ttl_remaining_seconds() {
        let entry = CacheEntry::new(value("test_value"), 10);

        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining <= 10);
        assert!(remaining >= 9);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry {
            data: value("test"),
            created_at: now,
            expires_at: Some(now),
        };

        assert!(entry.is_expired(), "Entry should be expired at boundary");
        assert_eq!(entry.ttl_remaining_ms(), Some(0));
    }

    #[test]
    fn test_data_type_names_and_emptiness() {
        assert_eq!(value("x").type_name(), "string");
        assert!(!value("").is_empty());
        assert!(CacheData::Hash(HashMap::new()).is_empty());
        assert_eq!(CacheData::Set(HashSet::new()).type_name(), "set");
    }
}
