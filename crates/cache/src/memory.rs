//! In-process LRU cache with per-entry expiry.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::Cache;

/// Default number of cached responses.
pub const DEFAULT_CAPACITY: usize = 4096;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// LRU-evicting, expiry-aware in-process cache.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        MemoryCache {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Number of live entries, expired ones included until next touch.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(e) if e.expires_at > Instant::now() => Some(e.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().put(key.to_string(), entry);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().pop(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_expires() {
        let cache = MemoryCache::new(8);
        cache.set("a", b"one".to_vec(), Duration::from_secs(60));
        assert_eq!(cache.get("a").as_deref(), Some(&b"one"[..]));

        cache.set("b", b"two".to_vec(), Duration::ZERO);
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        cache.set("a", vec![1], Duration::from_secs(60));
        cache.set("b", vec![2], Duration::from_secs(60));
        cache.get("a");
        cache.set("c", vec![3], Duration::from_secs(60));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn remove_drops_entry() {
        let cache = MemoryCache::with_defaults();
        cache.set("a", vec![1], Duration::from_secs(60));
        cache.remove("a");
        assert!(cache.get("a").is_none());
    }
}
