//! Integration Tests for the Public Cache API
//!
//! Exercises every policy through the crate's public surface, from several
//! threads at once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mcache::{
    expires_after, ArcCache, CacheConfig, ConcurrentCache, HashLfu, HashLru, LfuCache, LruCache,
    Policy,
};

// == Helper Functions ==

const THREADS: usize = 8;
const KEYS_PER_THREAD: usize = 100;

fn all_policies(size: usize) -> Vec<(Policy, Arc<dyn ConcurrentCache<String, usize>>)> {
    [
        Policy::Lru,
        Policy::Lfu,
        Policy::Arc,
        Policy::HashLru,
        Policy::HashLfu,
    ]
    .into_iter()
    .map(|policy| {
        let config = CacheConfig {
            size,
            shard_count: 4,
            policy,
            ..CacheConfig::default()
        };
        (policy, config.build().unwrap())
    })
    .collect()
}

/// Each thread writes its own keys, then reads them back.
fn hammer(cache: Arc<dyn ConcurrentCache<String, usize>>) {
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..KEYS_PER_THREAD {
                    cache.add(format!("{t}:{i}"), t * KEYS_PER_THREAD + i, 0);
                    cache.get(&format!("{t}:{}", i / 2));
                    cache.contains(&format!("{}:{i}", (t + 1) % THREADS));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

// == Concurrency Tests ==

#[test]
fn test_concurrent_writes_respect_capacity() {
    for (policy, cache) in all_policies(64) {
        hammer(cache.clone());

        assert!(cache.len() <= 64, "{policy}: len {}", cache.len());
        assert!(cache.stats().evictions > 0, "{policy}");
    }
}

#[test]
fn test_concurrent_writes_keep_everything_when_it_fits() {
    for (policy, cache) in all_policies(THREADS * KEYS_PER_THREAD * 2) {
        hammer(cache.clone());

        if policy != Policy::HashLru && policy != Policy::HashLfu {
            assert_eq!(cache.len(), THREADS * KEYS_PER_THREAD, "{policy}");
        }
        let keys: HashSet<String> = cache.keys().into_iter().collect();
        assert_eq!(keys.len(), cache.len(), "{policy}: duplicate keys");

        for t in 0..THREADS {
            let key = format!("{t}:0");
            if cache.contains(&key) {
                assert_eq!(cache.peek(&key), Some((t * KEYS_PER_THREAD, 0)), "{policy}");
            }
        }
    }
}

#[test]
fn test_contains_or_add_is_atomic_across_threads() {
    let cache = Arc::new(LfuCache::new(16).unwrap());
    let inserted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = cache.clone();
            let inserted = inserted.clone();
            thread::spawn(move || {
                let (found, _) = cache.contains_or_add("shared", t, 0);
                if !found {
                    inserted.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(inserted.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_sharded_peek_or_add_is_atomic_per_key() {
    let cache = Arc::new(HashLru::new(256, 8).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                (0..32)
                    .filter(|i| cache.peek_or_add(format!("k{i}"), t, 0).0.is_none())
                    .count()
            })
        })
        .collect();
    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 32);
    assert_eq!(cache.len(), 32);
}

#[test]
fn test_eviction_callback_sees_every_departure() {
    let departed = Arc::new(AtomicUsize::new(0));
    let counter = departed.clone();
    let cache = Arc::new(
        LruCache::with_evict(32, move |_: &usize, _: &usize, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..KEYS_PER_THREAD {
                    cache.add(t * KEYS_PER_THREAD + i, i, 0);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let remaining = cache.len();
    assert_eq!(remaining, 32);
    assert_eq!(
        departed.load(Ordering::SeqCst),
        THREADS * KEYS_PER_THREAD - remaining
    );
    assert_eq!(cache.stats().evictions as usize, THREADS * KEYS_PER_THREAD - remaining);
}

// == Expiry Tests ==

#[test]
fn test_expired_entries_miss_for_every_policy() {
    for (policy, cache) in all_policies(64) {
        cache.add("short".to_string(), 1, expires_after(Duration::from_millis(100)));
        cache.add("long".to_string(), 2, expires_after(Duration::from_secs(60)));
        assert!(cache.contains(&"short".to_string()), "{policy}");

        thread::sleep(Duration::from_millis(150));

        assert_eq!(cache.get(&"short".to_string()), None, "{policy}");
        assert!(cache.contains(&"long".to_string()), "{policy}");
        assert_eq!(cache.purge_overdue(), 0, "{policy}");
        assert_eq!(cache.len(), 1, "{policy}");
    }
}

#[test]
fn test_purge_overdue_across_shards() {
    let cache = HashLfu::new(256, 4).unwrap();
    for i in 0..40u32 {
        let exp = if i % 4 == 0 {
            expires_after(Duration::from_millis(10))
        } else {
            0
        };
        cache.add(i, i, exp);
    }

    thread::sleep(Duration::from_millis(30));

    assert_eq!(cache.purge_overdue(), 10);
    assert_eq!(cache.len(), 30);
}

// == ARC Tests ==

#[test]
fn test_arc_concurrent_invariants() {
    let cache = Arc::new(ArcCache::new(32).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..500usize {
                    let key = (i * 31 + t * 7) % 96;
                    if i % 3 == 0 {
                        cache.get(&key);
                    } else {
                        cache.add(key, i, 0);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    cache.debug_validate_invariants();
    assert!(cache.len() <= 32);
    assert!(cache.recent_target() <= 32);
}

#[test]
fn test_purge_twice_empties_every_policy() {
    for (policy, cache) in all_policies(16) {
        for i in 0..10 {
            cache.add(format!("k{i}"), i, 0);
        }
        cache.purge();
        assert_eq!(cache.len(), 0, "{policy}");
        cache.purge();
        assert!(cache.is_empty(), "{policy}");
    }
}
