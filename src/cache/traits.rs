//! Cache Traits
//!
//! [`EvictionList`] is the contract shared by the non-concurrent primitives;
//! [`ConcurrentCache`] is the object-safe surface every thread-safe cache
//! exposes to collaborators.

use std::hash::Hash;
use std::sync::Arc;

use crate::cache::{CacheStats, Probe};
use crate::error::Result;

/// Callback invoked synchronously, under the owning lock, whenever an entry
/// leaves a cache. Receives the key, the value and its expiration time.
///
/// The callback must not call back into the cache that invoked it: the lock
/// is not reentrant and the call would deadlock.
pub type OnEvict<K, V> = Arc<dyn Fn(&K, &V, i64) + Send + Sync>;

// == Eviction List ==
/// A bounded, non-thread-safe structure with lazy TTL expiry.
///
/// Expired entries found by `get`, `peek`, `contains`, `remove_oldest` and
/// `get_oldest` are removed as a side effect and reported as absent.
pub trait EvictionList {
    type Key: Eq + Hash + Clone;
    type Value;

    /// Creates an empty list holding at most `size` entries.
    fn build(size: usize, on_evict: Option<OnEvict<Self::Key, Self::Value>>) -> Result<Self>
    where
        Self: Sized;

    /// Inserts or updates an entry. Returns `true` if another entry was
    /// evicted to make room.
    fn add(&mut self, key: Self::Key, value: Self::Value, expiration_time: i64) -> bool;

    /// Looks up a key and counts it as a use.
    fn get(&mut self, key: &Self::Key) -> Option<(&Self::Value, i64)>;

    /// Looks up a key without counting it as a use.
    fn peek(&mut self, key: &Self::Key) -> Option<(&Self::Value, i64)>;

    fn contains(&mut self, key: &Self::Key) -> bool;

    /// Non-mutating lookup: never removes and never touches.
    fn probe(&self, key: &Self::Key) -> Probe<'_, Self::Value>;

    fn remove(&mut self, key: &Self::Key) -> bool;

    /// Detaches an entry without invoking the eviction callback.
    fn take(&mut self, key: &Self::Key) -> Option<(Self::Value, i64)>;

    fn remove_oldest(&mut self) -> Option<(Self::Key, Self::Value, i64)>;

    fn get_oldest(&mut self) -> Option<(&Self::Key, &Self::Value, i64)>;

    /// Keys from oldest to newest.
    fn keys(&self) -> Vec<Self::Key>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Removes every entry, invoking the callback for each.
    fn purge(&mut self);

    /// Removes only expired entries and returns how many were removed.
    fn purge_overdue(&mut self) -> usize;

    /// Changes the capacity, evicting the oldest entries on shrink. Returns
    /// the number evicted.
    fn resize(&mut self, size: usize) -> usize;
}

// == Concurrent Cache ==
/// Thread-safe cache surface shared by every policy.
pub trait ConcurrentCache<K, V>: Send + Sync {
    fn add(&self, key: K, value: V, expiration_time: i64) -> bool;

    fn get(&self, key: &K) -> Option<(V, i64)>;

    fn peek(&self, key: &K) -> Option<(V, i64)>;

    fn contains(&self, key: &K) -> bool;

    fn remove(&self, key: &K) -> bool;

    fn keys(&self) -> Vec<K>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge(&self);

    fn purge_overdue(&self) -> usize;

    fn stats(&self) -> CacheStats;
}
