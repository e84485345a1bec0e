//! TTL Cleanup Task
//!
//! Background task that periodically purges expired entries from a
//! [`MemoryBackend`]. Reads already hide expired keys; this bounds memory.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::MemoryBackend;

/// Spawns a background task that purges expired entries every `interval`.
///
/// The returned handle can be aborted on shutdown.
///
/// # Example
/// ```ignore
/// let backend = MemoryBackend::new();
/// let cleanup_handle = spawn_cleanup_task(backend.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(backend: MemoryBackend, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval = ?interval, "starting TTL cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.cleanup_expired().await;

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let backend = MemoryBackend::new();
        backend
            .set("expire_soon", "value".to_string(), 1)
            .await
            .unwrap();

        let handle = spawn_cleanup_task(backend.clone(), Duration::from_millis(200));

        tokio::time::sleep(Duration::from_millis(1600)).await;

        assert_eq!(backend.len().await, 0, "Expired entry should have been purged");

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let backend = MemoryBackend::new();
        backend
            .set("long_lived", "value".to_string(), 3600)
            .await
            .unwrap();

        let handle = spawn_cleanup_task(backend.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(
            backend.get("long_lived").await.unwrap(),
            Some("value".to_string())
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(MemoryBackend::new(), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
