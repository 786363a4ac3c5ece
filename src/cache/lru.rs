//! LRU cache with lazy TTL expiry and an optional byte ceiling
//!
//! # Thread Safety
//!
//! **This cache is NOT thread-safe.** All methods take `&mut self`;
//! [`super::ResponseCache`] wraps its caches in a single mutex.
//!
//! # Expiry
//!
//! Entries are never removed because of age. A lookup of an entry older than the
//! TTL reports a miss, but the entry (and its validator token) stays until it is
//! replaced, invalidated or evicted by capacity pressure, so callers can still
//! issue a conditional refresh with the old validator.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Cache statistics for monitoring effectiveness
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub size: usize,
    pub bytes: usize,
    pub evictions: usize,
}

impl CacheStats {
    /// Calculate cache hit rate as a fraction (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cached value plus its bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// Opaque validator (ETag) for conditional refresh
    pub validator: Option<String>,
    pub size: usize,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= ttl
    }
}

/// LRU cache with TTL
///
/// Uses HashMap for O(1) lookups and VecDeque for tracking access order.
/// When capacity or the byte ceiling is reached, the least recently used
/// entries are evicted.
pub struct TtlLruCache<K, V> {
    capacity: usize,
    max_bytes: Option<usize>,
    ttl: Duration,
    map: HashMap<K, CacheEntry<V>>,
    order: VecDeque<K>,
    bytes: usize,
    hits: usize,
    misses: usize,
    evictions: usize,
}

impl<K: Hash + Eq + Clone, V> TtlLruCache<K, V> {
    pub fn new(capacity: usize, max_bytes: Option<usize>, ttl: Duration) -> Self {
        Self {
            capacity,
            max_bytes,
            ttl,
            map: HashMap::new(),
            order: VecDeque::with_capacity(capacity.min(1024)),
            bytes: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry
    ///
    /// A hit moves the key to the front of the LRU order. Expired entries count
    /// as misses and keep their position.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<&CacheEntry<V>> {
        let live = match self.map.get(key) {
            Some(entry) => !entry.is_expired(self.ttl, now),
            None => false,
        };
        if !live {
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.touch(key);
        self.map.get(key)
    }

    /// Validator of an entry regardless of age; no statistics recorded
    pub fn validator(&self, key: &K) -> Option<&str> {
        self.map.get(key).and_then(|e| e.validator.as_deref())
    }

    /// Restart an entry's TTL (upstream confirmed it is unchanged)
    pub fn refresh_at(&mut self, key: &K, now: Instant) -> bool {
        match self.map.get_mut(key) {
            Some(entry) => {
                entry.stored_at = now;
                self.touch(key);
                true
            }
            None => false,
        }
    }

    /// Insert or replace an entry of `size` bytes
    ///
    /// Returns `false` (and drops any previous entry for the key) when the value
    /// alone exceeds the byte ceiling or the cache has zero capacity.
    pub fn put_at(&mut self, key: K, value: V, validator: Option<String>, size: usize, now: Instant) -> bool {
        self.invalidate(&key);

        if self.capacity == 0 || self.max_bytes.is_some_and(|max| size > max) {
            return false;
        }

        while self.order.len() >= self.capacity
            || self.max_bytes.is_some_and(|max| self.bytes + size > max)
        {
            if !self.evict_oldest() {
                break;
            }
        }

        self.bytes += size;
        self.order.push_front(key.clone());
        self.map.insert(
            key,
            CacheEntry {
                value,
                validator,
                size,
                stored_at: now,
            },
        );
        true
    }

    /// Invalidate a specific cache entry
    pub fn invalidate(&mut self, key: &K) -> bool {
        match self.map.remove(key) {
            Some(entry) => {
                self.bytes -= entry.size;
                if let Some(pos) = self.order.iter().position(|k| k == key) {
                    self.order.remove(pos);
                }
                true
            }
            None => false,
        }
    }

    /// Clear all entries and counters
    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
        self.bytes = 0;
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.map.len(),
            bytes: self.bytes,
            evictions: self.evictions,
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if pos != 0 {
                if let Some(k) = self.order.remove(pos) {
                    self.order.push_front(k);
                }
            }
        }
    }

    fn evict_oldest(&mut self) -> bool {
        match self.order.pop_back() {
            Some(old) => {
                if let Some(entry) = self.map.remove(&old) {
                    self.bytes -= entry.size;
                }
                self.evictions += 1;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    fn cache(capacity: usize) -> TtlLruCache<String, i32> {
        TtlLruCache::new(capacity, None, TTL)
    }

    #[test]
    fn test_basic_operations() {
        let now = Instant::now();
        let mut cache = cache(3);
        assert!(cache.get_at(&"a".to_string(), now).is_none());
        assert!(cache.is_empty());

        cache.put_at("a".to_string(), 1, None, 1, now);
        cache.put_at("b".to_string(), 2, Some("\"etag-b\"".into()), 1, now);
        assert_eq!(cache.get_at(&"a".to_string(), now).map(|e| e.value), Some(1));
        let b = cache.get_at(&"b".to_string(), now).unwrap();
        assert_eq!(b.validator.as_deref(), Some("\"etag-b\""));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_eviction() {
        let now = Instant::now();
        let mut cache = cache(2);
        cache.put_at("a".to_string(), 1, None, 1, now);
        cache.put_at("b".to_string(), 2, None, 1, now);

        // 'a' becomes more recently used than 'b'
        cache.get_at(&"a".to_string(), now);
        cache.put_at("c".to_string(), 3, None, 1, now);

        assert!(cache.get_at(&"a".to_string(), now).is_some());
        assert!(cache.get_at(&"b".to_string(), now).is_none());
        assert!(cache.get_at(&"c".to_string(), now).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_expired_entry_is_miss_but_not_evicted() {
        let start = Instant::now();
        let mut cache = cache(3);
        cache.put_at("a".to_string(), 1, Some("v1".into()), 1, start);

        let later = start + TTL + Duration::from_millis(1);
        assert!(cache.get_at(&"a".to_string(), later).is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.validator(&"a".to_string()), Some("v1"));

        assert!(cache.refresh_at(&"a".to_string(), later));
        assert_eq!(cache.get_at(&"a".to_string(), later).map(|e| e.value), Some(1));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_byte_ceiling_evicts_and_rejects_oversized() {
        let now = Instant::now();
        let mut cache: TtlLruCache<String, &str> = TtlLruCache::new(10, Some(10), TTL);
        assert!(cache.put_at("a".into(), "aaaa", None, 4, now));
        assert!(cache.put_at("b".into(), "bbbb", None, 4, now));
        assert!(cache.put_at("c".into(), "cccc", None, 4, now));

        // 12 bytes would exceed the ceiling, so 'a' went
        assert_eq!(cache.stats().bytes, 8);
        assert!(cache.get_at(&"a".to_string(), now).is_none());

        assert!(!cache.put_at("huge".into(), "x", None, 11, now));
        assert!(cache.get_at(&"huge".to_string(), now).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_replace_updates_size() {
        let now = Instant::now();
        let mut cache: TtlLruCache<String, &str> = TtlLruCache::new(10, Some(100), TTL);
        cache.put_at("a".into(), "short", None, 5, now);
        cache.put_at("a".into(), "longer value", None, 12, now);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().bytes, 12);
    }

    #[test]
    fn test_clear_resets_counters() {
        let now = Instant::now();
        let mut cache = cache(3);
        cache.put_at("a".to_string(), 1, None, 1, now);
        cache.get_at(&"a".to_string(), now);
        cache.get_at(&"b".to_string(), now);
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 2,
            misses: 1,
            ..CacheStats::default()
        };
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
