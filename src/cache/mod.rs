//! Response cache for upstream file and directory-listing fetches
//!
//! Two independent [`TtlLruCache`]s: file content (entry cap, byte ceiling,
//! 5 minute TTL) and directory listings (entry cap, 2 minute TTL). Both live
//! behind one mutex so [`ResponseCache::clear`] resets everything in one step
//! from the caller's point of view.

pub mod lru;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::{GraphVaultConfig, ResponseCacheConfig};

pub use lru::{CacheEntry, CacheStats, TtlLruCache};

/// Kind of a directory listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// One entry of an upstream directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ListingKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha: Option<String>,
}

impl ListingEntry {
    fn approximate_size(&self) -> usize {
        self.name.len() + self.path.len() + self.sha.as_ref().map_or(0, String::len) + 16
    }
}

/// Value returned by a cache hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse<V> {
    pub value: V,
    pub validator: Option<String>,
}

/// Statistics of both caches
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseCacheStats {
    pub content: CacheStats,
    pub listings: CacheStats,
    pub hits: usize,
    pub misses: usize,
    /// Combined hit rate of both caches (0.0 to 1.0)
    pub hit_rate: f64,
}

struct Caches {
    content: TtlLruCache<String, String>,
    listings: TtlLruCache<String, Vec<ListingEntry>>,
}

/// Key of a file content fetch
pub fn content_key(owner: &str, repo: &str, git_ref: &str, path: &str) -> String {
    format!("{}/{}@{}:{}", owner, repo, git_ref, path)
}

/// Key of a directory listing fetch
pub fn listing_key(owner: &str, repo: &str, git_ref: &str, path: &str) -> String {
    format!("{}/{}@{}:{}/", owner, repo, git_ref, path.trim_end_matches('/'))
}

pub struct ResponseCache {
    inner: Mutex<Caches>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(&ResponseCacheConfig::default())
    }
}

impl ResponseCache {
    pub fn new(config: &ResponseCacheConfig) -> Self {
        Self {
            inner: Mutex::new(Caches {
                content: TtlLruCache::new(
                    config.content.capacity,
                    config.content.max_bytes,
                    config.content.ttl,
                ),
                listings: TtlLruCache::new(
                    config.listings.capacity,
                    config.listings.max_bytes,
                    config.listings.ttl,
                ),
            }),
        }
    }

    /// Caches sized by the `cache` section of the top-level configuration
    pub fn from_config(config: &GraphVaultConfig) -> Self {
        Self::new(&config.cache)
    }

    pub fn get_content(&self, key: &str) -> Option<CachedResponse<String>> {
        self.get_content_at(key, Instant::now())
    }

    pub(crate) fn get_content_at(&self, key: &str, now: Instant) -> Option<CachedResponse<String>> {
        let mut caches = self.inner.lock();
        caches
            .content
            .get_at(&key.to_string(), now)
            .map(|e| CachedResponse {
                value: e.value.clone(),
                validator: e.validator.clone(),
            })
    }

    /// Cache file content; returns `false` if it exceeds the byte ceiling
    pub fn put_content(&self, key: &str, content: String, validator: Option<String>) -> bool {
        let size = content.len();
        let stored = self
            .inner
            .lock()
            .content
            .put_at(key.to_string(), content, validator, size, Instant::now());
        if !stored {
            tracing::debug!(key, size, "content not cached");
        }
        stored
    }

    /// Validator of a content entry even if it has expired
    pub fn content_validator(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .content
            .validator(&key.to_string())
            .map(str::to_string)
    }

    /// Mark a content entry fresh again after a "not modified" upstream reply
    pub fn refresh_content(&self, key: &str) -> bool {
        self.inner
            .lock()
            .content
            .refresh_at(&key.to_string(), Instant::now())
    }

    pub fn invalidate_content(&self, key: &str) -> bool {
        self.inner.lock().content.invalidate(&key.to_string())
    }

    pub fn get_listing(&self, key: &str) -> Option<CachedResponse<Vec<ListingEntry>>> {
        self.get_listing_at(key, Instant::now())
    }

    pub(crate) fn get_listing_at(
        &self,
        key: &str,
        now: Instant,
    ) -> Option<CachedResponse<Vec<ListingEntry>>> {
        let mut caches = self.inner.lock();
        caches
            .listings
            .get_at(&key.to_string(), now)
            .map(|e| CachedResponse {
                value: e.value.clone(),
                validator: e.validator.clone(),
            })
    }

    pub fn put_listing(&self, key: &str, entries: Vec<ListingEntry>, validator: Option<String>) -> bool {
        let size = entries.iter().map(ListingEntry::approximate_size).sum();
        self.inner
            .lock()
            .listings
            .put_at(key.to_string(), entries, validator, size, Instant::now())
    }

    pub fn listing_validator(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .listings
            .validator(&key.to_string())
            .map(str::to_string)
    }

    pub fn refresh_listing(&self, key: &str) -> bool {
        self.inner
            .lock()
            .listings
            .refresh_at(&key.to_string(), Instant::now())
    }

    pub fn invalidate_listing(&self, key: &str) -> bool {
        self.inner.lock().listings.invalidate(&key.to_string())
    }

    /// Drop every entry of both caches and reset all counters
    pub fn clear(&self) {
        let mut caches = self.inner.lock();
        caches.content.clear();
        caches.listings.clear();
    }

    pub fn stats(&self) -> ResponseCacheStats {
        let caches = self.inner.lock();
        let content = caches.content.stats();
        let listings = caches.listings.stats();
        let combined = CacheStats {
            hits: content.hits + listings.hits,
            misses: content.misses + listings.misses,
            ..CacheStats::default()
        };
        ResponseCacheStats {
            hits: combined.hits,
            misses: combined.misses,
            hit_rate: combined.hit_rate(),
            content,
            listings,
        }
    }
}
