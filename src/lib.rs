//! mcache - bounded in-memory caches with TTL expiry
//!
//! Provides LRU, approximate LFU, adaptive (ARC) and hash-sharded caches,
//! each with lazy expiry, an optional eviction callback and hit statistics.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{
    expires_after, now_ms, ArcCache, CacheStats, ConcurrentCache, HashLfu, HashLru, LfuCache,
    LruCache, NO_EXPIRY,
};
pub use config::{CacheConfig, Policy};
pub use error::{CacheError, Result};
pub use tasks::spawn_purge_task;
