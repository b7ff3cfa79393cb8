//! Cache Entry Module
//!
//! Defines the stored entry and the epoch-millisecond expiry helpers shared by
//! every eviction list.

use std::time::Duration;

/// Expiration sentinel meaning the entry never expires.
pub const NO_EXPIRY: i64 = 0;

// == Cache Entry ==
/// A single stored key/value pair with its absolute expiration time.
#[derive(Debug, Clone)]
pub struct Entry<K, V> {
    /// The key, duplicated from the index so evictions can report it
    pub key: K,
    /// The stored value
    pub value: V,
    /// Expiration timestamp (Unix milliseconds), `NO_EXPIRY` = never
    pub expiration_time: i64,
}

impl<K, V> Entry<K, V> {
    // == Constructor ==
    pub fn new(key: K, value: V, expiration_time: i64) -> Self {
        Self {
            key,
            value,
            expiration_time,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is past its expiration time.
    pub fn is_expired(&self) -> bool {
        is_expired(self.expiration_time)
    }
}

// == Probe ==
/// Outcome of a non-mutating lookup.
///
/// Lets lock wrappers answer `peek`/`contains` under a shared lock and only
/// escalate to the exclusive lock when an expired entry has to be removed.
#[derive(Debug, PartialEq, Eq)]
pub enum Probe<'a, V> {
    /// Present and not expired
    Live(&'a V, i64),
    /// Present but past its expiration time
    Stale,
    /// Not present
    Absent,
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Returns the absolute expiration time `ttl` from now.
pub fn expires_after(ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms().saturating_add(ttl_ms)
}

/// Checks if an expiration time has passed.
///
/// Boundary condition: an entry is expired once the current time is greater
/// than or equal to its expiration time. `NO_EXPIRY` never expires.
pub fn is_expired(expiration_time: i64) -> bool {
    expiration_time != NO_EXPIRY && expiration_time <= now_ms()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_expiry_never_expires() {
        let entry = Entry::new("k", 1, NO_EXPIRY);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_past_expiration_is_expired() {
        let entry = Entry::new("k", 1, now_ms() - 1);
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        // Expires exactly now
        assert!(is_expired(now_ms()));
    }

    #[test]
    fn test_future_expiration_is_live() {
        let entry = Entry::new("k", 1, expires_after(Duration::from_secs(60)));
        assert!(!entry.is_expired());
        assert!(entry.expiration_time > now_ms());
    }

    #[test]
    fn test_expires_after_saturates() {
        assert_eq!(expires_after(Duration::MAX), i64::MAX);
    }
}
