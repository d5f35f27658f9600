//! Generic time-boxed response cache.
//!
//! Entries older than the cache's validity are treated as absent by `get`,
//! but stay readable through `get_stale` until replaced. There is no
//! eviction task.

use crate::ports::{Clock, TokioClock};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Key used by caches holding a single global payload
pub const SINGLETON_KEY: &str = "";

/// Whether an entry stored at `stored_at` is still valid at `now`
pub fn is_valid(stored_at: Instant, validity: Duration, now: Instant) -> bool {
    now < stored_at + validity
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    payload: T,
    stored_at: Instant,
    invalidated: bool,
}

/// Keyed cache with a single validity duration
pub struct ResponseCache<T> {
    validity: Duration,
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T: Clone + Send + Sync> ResponseCache<T> {
    pub fn new(validity: Duration) -> Self {
        Self::with_clock(validity, Arc::new(TokioClock))
    }

    pub fn with_clock(validity: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            validity,
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Payload for `key` if present and still valid
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| !entry.invalidated && is_valid(entry.stored_at, self.validity, now))
            .map(|entry| entry.payload.clone())
    }

    /// Last stored payload for `key`, regardless of age
    pub fn get_stale(&self, key: &str) -> Option<T> {
        self.entries
            .read()
            .get(key)
            .map(|entry| entry.payload.clone())
    }

    /// Store or replace the payload for `key`
    pub fn set(&self, key: &str, payload: T) {
        let entry = CacheEntry {
            payload,
            stored_at: self.clock.now(),
            invalidated: false,
        };
        self.entries.write().insert(key.to_string(), entry);
    }

    /// Expire the entry for `key`; the payload stays available as stale
    pub fn invalidate(&self, key: &str) {
        if let Some(entry) = self.entries.write().get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// When `key` was last stored
    pub fn stored_at(&self, key: &str) -> Option<Instant> {
        self.entries.read().get(key).map(|entry| entry.stored_at)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Manually advanced clock
    struct ManualClock(Mutex<Instant>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            *self.0.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock()
        }
    }

    #[test]
    fn test_is_valid_boundary() {
        let start = Instant::now();
        let validity = Duration::from_secs(10);
        assert!(is_valid(start, validity, start));
        assert!(is_valid(start, validity, start + Duration::from_secs(9)));
        assert!(!is_valid(start, validity, start + validity));
    }

    #[test]
    fn test_expiry_with_manual_clock() {
        let clock = Arc::new(ManualClock(Mutex::new(Instant::now())));
        let cache = ResponseCache::with_clock(Duration::from_secs(5), clock.clone());

        assert_eq!(cache.get(SINGLETON_KEY), None::<u32>);
        cache.set(SINGLETON_KEY, 7u32);
        assert_eq!(cache.get(SINGLETON_KEY), Some(7));

        clock.advance(Duration::from_secs(4));
        assert_eq!(cache.get(SINGLETON_KEY), Some(7));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(SINGLETON_KEY), None);
        assert_eq!(cache.get_stale(SINGLETON_KEY), Some(7));
    }

    #[test]
    fn test_invalidate_keeps_stale() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("a", "one".to_string());
        cache.set("b", "two".to_string());
        cache.invalidate("a");

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get_stale("a").as_deref(), Some("one"));
        assert_eq!(cache.get("b").as_deref(), Some("two"));
        assert_eq!(cache.len(), 2);

        cache.set("a", "three".to_string());
        assert_eq!(cache.get("a").as_deref(), Some("three"));
    }
}
