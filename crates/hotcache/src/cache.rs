//! HotCache: thread-safe LRU cache with idle-time expiry

use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use crate::config::CacheConfig;
use crate::lru::LruCache;
use crate::stats::CacheStats;

/// Bounded key/value cache evicting by recency and idle time
///
/// Every operation, `get` included, takes the same exclusive lock because a
/// hit moves the entry and refreshes its access time. Misses and expired
/// entries are both reported as `None`.
pub struct HotCache<K, V> {
    /// Recency list and index
    inner: Mutex<LruCache<K, V>>,

    /// Idle time after which an entry is treated as absent
    ttl: Duration,

    /// Cache statistics
    stats: CacheStats,
}

impl<K, V> HotCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a new HotCache
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of resident entries; 0 stores nothing
    /// * `ttl` - Idle time after which an entry expires
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(max_entries)),
            ttl,
            stats: CacheStats::new(),
        }
    }

    /// Create a HotCache from a [`CacheConfig`]
    pub fn with_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl())
    }

    /// Insert or update a value, marking it most recently used
    ///
    /// When a new key arrives at a full cache the least recently used entry
    /// is evicted first.
    pub fn set(&self, key: K, value: V) {
        let mut lru = self.inner.lock();
        let now = Instant::now();

        let fresh = !lru.contains(&key);
        if lru.put(key, value, now).is_some() {
            self.stats.record_eviction();
            trace!(len = lru.len(), capacity = lru.capacity(), "evicted least recently used entry");
        }
        if fresh {
            self.stats.record_insert();
        }
    }

    /// Get a value, marking it most recently used
    ///
    /// An entry idle for longer than the TTL is removed and reported as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut lru = self.inner.lock();
        let now = Instant::now();

        let expired = match lru.peek(key) {
            Some((_, touched)) => self.is_expired(touched, now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            lru.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            trace!(ttl = ?self.ttl, "expired entry removed on lookup");
            return None;
        }

        self.stats.record_hit();
        lru.get(key, now).cloned()
    }

    /// Remove a key, returning its value if it was resident
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Check for a live entry without changing recency or access time
    pub fn contains_key(&self, key: &K) -> bool {
        let lru = self.inner.lock();
        match lru.peek(key) {
            Some((_, touched)) => !self.is_expired(touched, Instant::now()),
            None => false,
        }
    }

    /// Drop every expired entry
    ///
    /// # Returns
    /// * `usize` - Number of entries removed
    pub fn purge_expired(&self) -> usize {
        let mut lru = self.inner.lock();
        let now = Instant::now();

        let mut purged = 0;
        // Access times grow from head to tail, so stop at the first live entry.
        while let Some(touched) = lru.front_touched() {
            if !self.is_expired(touched, now) {
                break;
            }
            lru.pop_front();
            purged += 1;
        }

        if purged > 0 {
            self.stats.record_expirations(purged as u64);
            trace!(purged, "purged expired entries");
        }
        purged
    }

    fn is_expired(&self, touched: Instant, now: Instant) -> bool {
        now.saturating_duration_since(touched) > self.ttl
    }
}

impl<K, V> HotCache<K, V> {
    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Idle time after which entries expire
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<K, V> HotCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Get current number of resident entries, expired ones included
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Drop all entries and reset statistics
    pub fn clear(&self) {
        self.inner.lock().clear();
        self.stats.reset();
    }
}

/// `{}` prints a one-line summary; `{:#}` also lists every entry from least
/// to most recently used with its idle time.
impl<K, V> fmt::Display for HotCache<K, V>
where
    K: Hash + Eq + Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lru = self.inner.lock();
        write!(
            f,
            "{} of {} entries resident, ttl {:?}",
            lru.len(),
            lru.capacity(),
            self.ttl
        )?;

        if f.alternate() {
            let now = Instant::now();
            for (key, touched) in lru.entries() {
                write!(
                    f,
                    "\n  {:?} idle {:?}",
                    key,
                    now.saturating_duration_since(touched)
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    const LONG: Duration = Duration::from_secs(60);

    #[test]
    fn test_cache_basic() {
        let cache = HotCache::new(10, LONG);

        cache.set("k", "v".to_string());

        assert_eq!(cache.get(&"k"), Some("v".to_string()));
        assert_eq!(cache.get(&"missing"), None);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().inserts(), 1);
    }

    #[test]
    fn test_cache_eviction() {
        let cache = HotCache::new(2, LONG);

        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_access_protects_from_eviction() {
        let cache = HotCache::new(2, LONG);

        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.set("c", 3);

        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn test_update_existing_key() {
        let cache = HotCache::new(2, LONG);

        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10); // Refreshes a
        cache.set("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.stats().inserts(), 3);
    }

    #[test]
    fn test_expired_entry_is_gone() {
        let cache = HotCache::new(10, Duration::from_millis(30));

        cache.set("k", 1);
        thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.get(&"k"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&"k"), None);
        assert_eq!(cache.stats().expirations(), 1);
        assert_eq!(cache.stats().misses(), 2);
    }

    #[test]
    fn test_get_refreshes_access_time() {
        let cache = HotCache::new(10, Duration::from_millis(300));

        cache.set("k", 1);
        thread::sleep(Duration::from_millis(180));
        assert_eq!(cache.get(&"k"), Some(1));
        thread::sleep(Duration::from_millis(180));

        assert_eq!(cache.get(&"k"), Some(1));
    }

    #[test]
    fn test_remove() {
        let cache = HotCache::new(10, LONG);

        cache.set("k", 1);
        assert_eq!(cache.remove(&"k"), Some(1));
        assert_eq!(cache.remove(&"k"), None);
        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let cache = HotCache::new(0, LONG);

        cache.set("a", 1);
        cache.set("b", 2);

        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.stats().evictions(), 2);
    }

    #[test]
    fn test_contains_key_keeps_order() {
        let cache = HotCache::new(2, LONG);

        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.contains_key(&"a"));
        cache.set("c", 3);

        assert!(!cache.contains_key(&"a"));
        assert!(cache.contains_key(&"b"));
        assert_eq!(cache.stats().hits(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let cache = HotCache::new(10, Duration::from_millis(30));

        cache.set("a", 1);
        cache.set("b", 2);
        thread::sleep(Duration::from_millis(80));
        cache.set("c", 3);

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn test_clear() {
        let cache = HotCache::new(10, LONG);

        cache.set("a", 1);
        cache.get(&"a");
        cache.clear();

        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().hits(), 0);
    }

    #[test]
    fn test_display() {
        let cache = HotCache::new(4, Duration::from_secs(3));
        cache.set(1, "one");

        assert_eq!(cache.to_string(), "1 of 4 entries resident, ttl 3s");
    }

    #[test]
    fn test_display_alternate_lists_entries() {
        let cache = HotCache::new(4, Duration::from_secs(3));
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get(&"a");

        let text = format!("{cache:#}");
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "2 of 4 entries resident, ttl 3s");
        assert!(lines[1].starts_with("  \"b\" idle "));
        assert!(lines[2].starts_with("  \"a\" idle "));
    }

    #[test]
    fn test_with_config() {
        let config = CacheConfig::new(3, Duration::from_millis(1500));
        let cache: HotCache<u32, u32> = HotCache::with_config(&config);

        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.ttl(), Duration::from_millis(1500));
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(HotCache::new(64, LONG));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1_000u64 {
                        let key = (t * 1_000 + i) % 200;
                        cache.set(key, i);
                        cache.get(&((key + 7) % 200));
                        if i % 10 == 0 {
                            cache.remove(&key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 64);
        let stats = cache.stats();
        assert_eq!(stats.hits() + stats.misses(), 8_000);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(
            capacity in 1usize..16,
            ops in prop::collection::vec((0u8..3, 0u16..64), 1..400),
        ) {
            let cache = HotCache::new(capacity, LONG);
            for (op, key) in ops {
                match op {
                    0 => cache.set(key, key),
                    1 => { cache.get(&key); }
                    _ => { cache.remove(&key); }
                }
                prop_assert!(cache.len() <= capacity);
            }
        }

        #[test]
        fn prop_latest_set_wins(keys in prop::collection::vec(0u8..8, 1..100)) {
            let cache = HotCache::new(8, LONG);
            for (i, key) in keys.iter().enumerate() {
                cache.set(*key, i);
            }
            let last = keys.len() - 1;
            prop_assert_eq!(cache.get(&keys[last]), Some(last));
        }
    }
}
