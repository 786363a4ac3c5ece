//! Integration tests for the response cache
//!
//! Uses short TTLs and real sleeps.

use graphvault::{
    content_key, listing_key, CacheLimits, ListingEntry, ListingKind, ResponseCache,
    ResponseCacheConfig,
};
use std::thread;
use std::time::Duration;

fn short_ttl_config() -> ResponseCacheConfig {
    ResponseCacheConfig {
        content: CacheLimits {
            capacity: 3,
            max_bytes: Some(64),
            ttl: Duration::from_millis(50),
        },
        listings: CacheLimits {
            capacity: 2,
            max_bytes: None,
            ttl: Duration::from_millis(50),
        },
    }
}

fn entry(name: &str, kind: ListingKind) -> ListingEntry {
    ListingEntry {
        name: name.to_string(),
        path: name.to_string(),
        kind,
        size: 0,
        sha: None,
    }
}

#[test]
fn test_entry_expires_without_eviction() {
    let cache = ResponseCache::new(&short_ttl_config());
    let key = content_key("octocat", "hello-world", "main", "README.md");
    cache.put_content(&key, "# Hello".into(), Some("\"etag-1\"".into()));
    assert_eq!(cache.get_content(&key).unwrap().value, "# Hello");

    thread::sleep(Duration::from_millis(80));
    assert!(cache.get_content(&key).is_none());

    // Still resident: size unchanged, validator available for revalidation
    let stats = cache.stats();
    assert_eq!(stats.content.size, 1);
    assert_eq!(stats.content.evictions, 0);
    assert_eq!(cache.content_validator(&key).as_deref(), Some("\"etag-1\""));

    assert!(cache.refresh_content(&key));
    assert!(cache.get_content(&key).is_some());
}

#[test]
fn test_capacity_and_byte_ceiling() {
    let cache = ResponseCache::new(&short_ttl_config());
    for i in 0..4 {
        cache.put_content(&format!("k{}", i), "x".repeat(10), None);
    }
    assert!(cache.get_content("k0").is_none());
    assert!(cache.get_content("k3").is_some());
    assert_eq!(cache.stats().content.evictions, 1);

    // Larger than the 64 byte ceiling on its own
    assert!(!cache.put_content("huge", "y".repeat(65), None));
    assert!(cache.get_content("huge").is_none());
}

#[test]
fn test_listings_are_independent_of_content() {
    let cache = ResponseCache::new(&short_ttl_config());
    let key = listing_key("octocat", "hello-world", "main", "src");
    cache.put_listing(
        &key,
        vec![entry("lib.rs", ListingKind::File), entry("bin", ListingKind::Dir)],
        None,
    );

    assert!(cache.get_content(&key).is_none());
    let listing = cache.get_listing(&key).unwrap();
    assert_eq!(listing.value.len(), 2);
    assert_eq!(listing.value[1].kind, ListingKind::Dir);

    assert!(cache.invalidate_listing(&key));
    assert!(cache.get_listing(&key).is_none());

    let stats = cache.stats();
    assert_eq!(stats.listings.hits, 1);
    assert_eq!(stats.listings.misses, 1);
    assert_eq!(stats.content.misses, 1);
}

#[test]
fn test_listing_entry_json_shape() {
    let raw = r#"{"name": "lib.rs", "path": "src/lib.rs", "type": "file", "size": 42, "sha": "abc"}"#;
    let parsed: ListingEntry = serde_json::from_str(raw).unwrap();
    assert_eq!(parsed.kind, ListingKind::File);
    assert_eq!(parsed.size, 42);
}

#[test]
fn test_shared_across_threads() {
    let cache = std::sync::Arc::new(ResponseCache::default());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = std::sync::Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..25 {
                    let key = format!("t{}-{}", t, i);
                    cache.put_content(&key, key.clone(), None);
                    assert!(cache.get_content(&key).is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let stats = cache.stats();
    assert_eq!(stats.content.size, 100);
    assert_eq!(stats.hits, 100);
}
