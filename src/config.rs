//! Configuration Module
//!
//! Handles choosing a cache policy and its parameters from environment
//! variables, and building the chosen cache behind [`ConcurrentCache`].

use std::env;
use std::fmt::{self, Display};
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cache::{ArcCache, ConcurrentCache, HashLfu, HashLru, LfuCache, LruCache};
use crate::error::{CacheError, Result};

// == Policy ==
/// Eviction policy selectable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    Lru,
    Lfu,
    Arc,
    HashLru,
    HashLfu,
}

impl FromStr for Policy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Policy::Lru),
            "lfu" => Ok(Policy::Lfu),
            "arc" => Ok(Policy::Arc),
            "hashlru" | "hash_lru" | "hash-lru" => Ok(Policy::HashLru),
            "hashlfu" | "hash_lfu" | "hash-lfu" => Ok(Policy::HashLfu),
            _ => Err(CacheError::InvalidPolicy(s.to_string())),
        }
    }
}

impl Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Policy::Lru => "lru",
            Policy::Lfu => "lfu",
            Policy::Arc => "arc",
            Policy::HashLru => "hash_lru",
            Policy::HashLfu => "hash_lfu",
        };
        f.write_str(name)
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub size: usize,
    /// Shard count for the sharded policies, 0 = host parallelism
    pub shard_count: usize,
    /// Eviction policy
    pub policy: Policy,
    /// Background overdue-purge interval in milliseconds
    pub purge_interval_ms: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MCACHE_SIZE` - Maximum cache entries (default: 1024)
    /// - `MCACHE_SHARDS` - Shard count for sharded policies (default: 0)
    /// - `MCACHE_POLICY` - `lru`, `lfu`, `arc`, `hash_lru` or `hash_lfu` (default: lru)
    /// - `MCACHE_PURGE_INTERVAL_MS` - Purge frequency in milliseconds (default: 1000)
    ///
    /// Unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            size: env::var("MCACHE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.size),
            shard_count: env::var("MCACHE_SHARDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.shard_count),
            policy: env::var("MCACHE_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.policy),
            purge_interval_ms: env::var("MCACHE_PURGE_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.purge_interval_ms),
        }
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_millis(self.purge_interval_ms)
    }

    // == Build ==
    /// Constructs the configured cache.
    ///
    /// Fails with [`CacheError::InvalidSize`] when `size` is zero.
    pub fn build<K, V>(&self) -> Result<Arc<dyn ConcurrentCache<K, V>>>
    where
        K: Eq + Hash + Clone + Display + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let cache: Arc<dyn ConcurrentCache<K, V>> = match self.policy {
            Policy::Lru => Arc::new(LruCache::new(self.size)?),
            Policy::Lfu => Arc::new(LfuCache::new(self.size)?),
            Policy::Arc => Arc::new(ArcCache::new(self.size)?),
            Policy::HashLru => Arc::new(HashLru::new(self.size, self.shard_count)?),
            Policy::HashLfu => Arc::new(HashLfu::new(self.size, self.shard_count)?),
        };
        Ok(cache)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: 1024,
            shard_count: 0,
            policy: Policy::Lru,
            purge_interval_ms: 1000,
        }
    }
}
