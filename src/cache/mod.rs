//! Cache Module
//!
//! Bounded in-memory caches with lazy TTL expiry and pluggable eviction:
//! LRU, approximate LFU, ARC, and hash-sharded LRU/LFU.
//!
//! The single-threaded primitives ([`SimpleLru`], [`SimpleLfu`]) implement
//! [`EvictionList`]. The thread-safe façades implement [`ConcurrentCache`].

mod arc;
mod entry;
mod hash;
mod lfu;
mod list;
mod lru;
mod stats;
mod sync_cache;
mod traits;


// Re-export public types
pub use arc::ArcCache;
pub use entry::{expires_after, is_expired, now_ms, Entry, Probe, NO_EXPIRY};
pub use hash::{HashCache, HashLfu, HashLru};
pub use lfu::SimpleLfu;
pub use lru::SimpleLru;
pub use stats::CacheStats;
pub use sync_cache::{LfuCache, LruCache, SyncCache};
pub use traits::{ConcurrentCache, EvictionList, OnEvict};
