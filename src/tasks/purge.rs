//! Overdue Purge Task
//!
//! Background task that periodically removes expired cache entries. Caches
//! only expire entries lazily on touch; this bounds how long untouched
//! expired entries keep occupying capacity.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ConcurrentCache;

/// Spawns a background task that calls `purge_overdue` every `interval`.
///
/// The task runs until the returned handle is aborted. Each pass takes the
/// cache's own locks for the duration of the purge only.
///
/// # Example
/// ```ignore
/// let cache: Arc<dyn ConcurrentCache<String, String>> = config.build()?;
/// let purge_handle = spawn_purge_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task<K, V, C>(cache: Arc<C>, interval: Duration) -> JoinHandle<()>
where
    C: ConcurrentCache<K, V> + ?Sized + 'static,
    K: 'static,
    V: 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting overdue purge task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_overdue();

            if removed > 0 {
                info!("Overdue purge: removed {} expired entries", removed);
            } else {
                debug!("Overdue purge: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{expires_after, ArcCache, LruCache};

    #[tokio::test]
    async fn test_purge_task_removes_expired_entries() {
        let cache = Arc::new(LruCache::new(100).unwrap());
        cache.add(
            "expire_soon".to_string(),
            "value".to_string(),
            expires_after(Duration::from_millis(50)),
        );

        let handle = spawn_purge_task(cache.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(400)).await;

        // len counts expired entries until they are purged
        assert_eq!(cache.len(), 0, "Expired entry should have been purged");

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_preserves_valid_entries() {
        let cache = Arc::new(ArcCache::new(100).unwrap());
        cache.add(
            "long_lived".to_string(),
            "value".to_string(),
            expires_after(Duration::from_secs(3600)),
        );

        let handle = spawn_purge_task(cache.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&"long_lived".to_string()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_accepts_trait_object() {
        let cache: Arc<dyn ConcurrentCache<u32, u32>> = Arc::new(LruCache::new(8).unwrap());
        cache.add(1, 1, expires_after(Duration::from_millis(10)));

        let handle = spawn_purge_task(cache.clone(), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(cache.is_empty());

        handle.abort();
    }

    #[tokio::test]
    async fn test_purge_task_can_be_aborted() {
        let cache = Arc::new(LruCache::<u32, u32>::new(8).unwrap());

        let handle = spawn_purge_task(cache, Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
