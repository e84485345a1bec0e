//! Integration Tests for the Cache Repository
//!
//! Exercises the public cache API end to end over the in-memory backend.
//! The Redis test needs a live server and is ignored by default:
//! `REDIS_URL=redis://127.0.0.1:6379/15 cargo test -- --ignored`

use std::collections::HashMap;
use std::time::Duration;

use repository_sdk::cache::KEEP_TTL;
use repository_sdk::{
    spawn_cleanup_task, CacheBackend, CacheError, CacheRepository, MemoryBackend, RedisBackend,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: u32,
    display_name: String,
    roles: Vec<String>,
}

fn profile() -> Profile {
    Profile {
        id: 7,
        display_name: "Ada".to_string(),
        roles: vec!["admin".to_string(), "ops".to_string()],
    }
}

/// Runs the shared scenario against any backend.
async fn exercise_repository<B: CacheBackend>(repo: &CacheRepository<B>, prefix: &str) {
    let value_key = format!("{prefix}:profile");
    let hash_key = format!("{prefix}:settings");
    let set_key = format!("{prefix}:online");

    // Values
    repo.save_value(&value_key, &profile(), 60).await.unwrap();
    let loaded: Profile = repo.get_value(&value_key).await.unwrap();
    assert_eq!(loaded, profile());
    repo.remove_value(&value_key).await.unwrap();
    assert!(matches!(
        repo.get_value::<Profile>(&value_key).await,
        Err(CacheError::NotFound(_))
    ));

    // Hashes
    let fields = HashMap::from([
        ("theme".to_string(), "dark".to_string()),
        ("lang".to_string(), "en".to_string()),
    ]);
    repo.save_all_hash_fields(&hash_key, &fields, 60).await.unwrap();
    repo.save_hash_field(&hash_key, "tz", "UTC", KEEP_TTL)
        .await
        .unwrap();
    assert_eq!(repo.get_hash_field(&hash_key, "theme").await.unwrap(), "dark");
    assert_eq!(repo.get_all_hash_fields(&hash_key).await.unwrap().len(), 3);
    repo.remove_hash_field(&hash_key, "theme").await.unwrap();
    assert!(matches!(
        repo.get_hash_field(&hash_key, "theme").await,
        Err(CacheError::NotFound(_))
    ));

    // Sets
    repo.add_set_member(&set_key, 60, &["u1", "u2"]).await.unwrap();
    assert!(repo.check_set_member(&set_key, "u1").await.unwrap());
    repo.remove_set_member(&set_key, "u1").await.unwrap();
    assert!(!repo.check_set_member(&set_key, "u1").await.unwrap());
    assert!(repo.check_set_member(&set_key, "u2").await.unwrap());

    // Cleanup
    for key in [&value_key, &hash_key, &set_key] {
        repo.remove_value(key).await.unwrap();
        assert!(!repo.exists(key).await.unwrap());
    }
}

#[tokio::test]
async fn test_memory_backend_full_scenario() {
    let repo = CacheRepository::new(MemoryBackend::new());
    exercise_repository(&repo, "it").await;
    assert!(repo.backend().is_empty().await);
}

#[tokio::test]
async fn test_value_expires_after_ttl() {
    let repo = CacheRepository::new(MemoryBackend::new());

    repo.save_value("short", &"lived", 1).await.unwrap();
    assert!(repo.exists("short").await.unwrap());

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(!repo.exists("short").await.unwrap());
    assert!(matches!(
        repo.get_value::<String>("short").await,
        Err(CacheError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_set_expire_updates_existing_key() {
    let repo = CacheRepository::new(MemoryBackend::new());

    repo.save_value("session", &profile(), KEEP_TTL).await.unwrap();
    repo.set_expire("session", 1).await.unwrap();
    assert!(repo.exists("session").await.unwrap());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(!repo.exists("session").await.unwrap());
}

#[tokio::test]
async fn test_set_expire_zero_removes_key() {
    let repo = CacheRepository::new(MemoryBackend::new());

    repo.save_value("gone", &1u8, KEEP_TTL).await.unwrap();
    repo.set_expire("gone", 0).await.unwrap();

    assert!(!repo.exists("gone").await.unwrap());
}

#[tokio::test]
async fn test_wrong_kind_is_store_error() {
    let repo = CacheRepository::new(MemoryBackend::new());

    repo.save_value("plain", &"text", KEEP_TTL).await.unwrap();
    let result = repo.save_hash_field("plain", "f", "v", KEEP_TTL).await;

    assert!(matches!(result, Err(CacheError::Store(_))));
}

#[tokio::test]
async fn test_cleanup_task_purges_repository_writes() {
    let backend = MemoryBackend::new();
    let repo = CacheRepository::new(backend.clone());
    let handle = spawn_cleanup_task(backend.clone(), Duration::from_millis(100));

    repo.save_value("ephemeral", &profile(), 1).await.unwrap();
    repo.save_value("durable", &profile(), KEEP_TTL).await.unwrap();
    assert_eq!(backend.len().await, 2);

    tokio::time::sleep(Duration::from_millis(1400)).await;

    assert_eq!(backend.len().await, 1);
    assert!(repo.exists("durable").await.unwrap());

    handle.abort();
}

#[tokio::test]
async fn test_clones_share_state() {
    let repo = CacheRepository::new(MemoryBackend::new());
    let other = repo.clone();

    repo.add_set_member("shared", KEEP_TTL, &["a"]).await.unwrap();
    assert!(other.check_set_member("shared", "a").await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running Redis server (REDIS_URL)"]
async fn test_redis_backend_full_scenario() {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
    let backend = RedisBackend::connect_url(&url).await.unwrap();
    let repo = CacheRepository::new(backend).with_timeout(Duration::from_secs(5));

    exercise_repository(&repo, &format!("sdk-it-{}", uuid::Uuid::new_v4())).await;
}
