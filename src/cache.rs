//! Time-to-live cache for idempotent read results.
//!
//! Entries carry an absolute expiry and are evicted lazily on `get`; there
//! is no background sweep. Time comes from [`tokio::time::Instant`] so tests
//! can drive expiry with a paused clock.

use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

/// Default lifetime of a cache entry.
pub(crate) const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached value together with its expiry instant.
#[derive(Debug)]
struct Entry<V> {
    /// Stored payload.
    value: V,
    /// Instant after which the payload must not be returned.
    expires_at: Instant,
}

/// Key/value store with per-entry expiry.
#[derive(Debug)]
pub(crate) struct TtlCache<V> {
    /// Entries by caller-constructed key.
    entries: Mutex<HashMap<String, Entry<V>>>,
    /// TTL applied by [`TtlCache::set`].
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache whose `set` uses `default_ttl`.
    pub(crate) fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Locks the entry map, recovering from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under `key` with the default TTL.
    pub(crate) fn set<K: Into<String>>(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Stores `value` under `key`, expiring `ttl` from now. Overwrites any
    /// existing entry.
    pub(crate) fn set_with_ttl<K: Into<String>>(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let _previous = self.lock().insert(key.into(), entry);
    }

    /// Returns the value stored under `key` unless it has expired. Expired
    /// entries are removed.
    pub(crate) fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if Instant::now() <= entry.expires_at {
            return Some(entry.value.clone());
        }
        let _evicted = entries.remove(key);
        None
    }

    /// Removes every entry.
    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired or not.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
#[allow(
    clippy::missing_docs_in_private_items,
    reason = "test code favours brevity"
)]
mod tests {
    use core::time::Duration;

    use serde_json::{Value, json};

    use super::TtlCache;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn set_then_get_returns_value() {
        let cache: TtlCache<Value> = TtlCache::default();
        let budgets = json!({"budgets": [{"id": "b1", "name": "Main"}]});
        cache.set_with_ttl("budgets:list", budgets.clone(), 5 * MINUTE);

        assert_eq!(cache.get("budgets:list"), Some(budgets));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let cache: TtlCache<Value> = TtlCache::default();
        let budgets = json!({"budgets": [{"id": "b1", "name": "Main"}]});
        cache.set_with_ttl("budgets:list", budgets.clone(), 5 * MINUTE);
        assert_eq!(cache.get("budgets:list"), Some(budgets));

        tokio::time::advance(6 * MINUTE).await;

        assert_eq!(cache.get("budgets:list"), None);
        assert_eq!(cache.get("budgets:list"), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_live_exactly_at_expiry() {
        let cache = TtlCache::new(MINUTE);
        cache.set("k", 1_u8);

        tokio::time::advance(MINUTE).await;

        assert_eq!(cache.get("k"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_and_resets_expiry() {
        let cache = TtlCache::new(MINUTE);
        cache.set("k", "old");
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.set("k", "new");
        tokio::time::advance(Duration::from_secs(45)).await;

        assert_eq!(cache.get("k"), Some("new"));
    }

    #[test]
    fn missing_key_is_absent() {
        let cache: TtlCache<String> = TtlCache::default();
        assert_eq!(cache.get("never-set"), None);
    }

    #[test]
    fn clear_removes_everything() {
        let cache = TtlCache::new(MINUTE);
        cache.set("a", 1_i32);
        cache.set("b", 2_i32);

        cache.clear();

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.len(), 0);
    }
}
