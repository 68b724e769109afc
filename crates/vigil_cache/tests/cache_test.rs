//! Tests for the ResultCache implementation.

use image::RgbaImage;
use std::sync::Arc;
use vigil_cache::{ResultCache, ResultCacheConfig, Weighted};
use vigil_core::{GeneratedImage, GeneratedOutput, OutputKind, RequestFingerprint};

fn text_cache(max_bytes: usize) -> ResultCache<&'static str, String> {
    ResultCache::new(ResultCacheConfig::default().with_max_bytes(max_bytes))
}

#[test]
fn test_put_then_get_returns_value() {
    let cache = text_cache(1024);
    cache.put("a", "alpha".to_string());
    assert_eq!(cache.get(&"a"), Some("alpha".to_string()));
    assert_eq!(cache.get(&"missing"), None);
}

#[test]
fn test_put_replaces_existing_value() {
    let cache = text_cache(1024);
    cache.put("a", "first".to_string());
    cache.put("a", "second!".to_string());
    assert_eq!(cache.get(&"a"), Some("second!".to_string()));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.total_bytes(), 7);
}

#[test]
fn test_eviction_removes_least_recently_inserted() {
    let cache = text_cache(30);
    cache.put("a", "x".repeat(10));
    cache.put("b", "x".repeat(10));
    cache.put("c", "x".repeat(10));
    cache.put("d", "x".repeat(10));

    assert!(!cache.contains(&"a"));
    assert!(cache.contains(&"b"));
    assert!(cache.contains(&"c"));
    assert!(cache.contains(&"d"));
    assert_eq!(cache.stats().evictions(), &1);
}

#[test]
fn test_get_refreshes_recency() {
    let cache = text_cache(30);
    cache.put("a", "x".repeat(10));
    cache.put("b", "x".repeat(10));
    cache.put("c", "x".repeat(10));

    // Touch "a" so "b" becomes the oldest
    assert!(cache.get(&"a").is_some());
    cache.put("d", "x".repeat(10));

    assert!(cache.contains(&"a"));
    assert!(!cache.contains(&"b"));
}

#[test]
fn test_large_value_evicts_several_entries() {
    let cache = text_cache(30);
    cache.put("a", "x".repeat(10));
    cache.put("b", "x".repeat(10));
    cache.put("c", "x".repeat(10));
    cache.put("big", "x".repeat(25));

    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&"big"));
    assert!(cache.total_bytes() <= cache.max_bytes());
}

#[test]
fn test_oversized_value_is_not_cached() {
    let cache = text_cache(10);
    cache.put("a", "small".to_string());
    cache.put("a", "x".repeat(11));
    assert_eq!(cache.get(&"a"), None);
    assert!(cache.is_empty());
}

#[test]
fn test_clear_keeps_counters() {
    let cache = text_cache(1024);
    cache.put("a", "alpha".to_string());
    assert!(cache.get(&"a").is_some());
    assert!(cache.get(&"b").is_none());

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.total_bytes(), 0);
    let stats = cache.stats();
    assert_eq!(*stats.hits(), 1);
    assert_eq!(*stats.misses(), 1);
}

#[test]
fn test_set_max_bytes_shrinks_cache() {
    let cache = text_cache(100);
    cache.put("a", "x".repeat(10));
    cache.put("b", "x".repeat(10));
    cache.put("c", "x".repeat(10));

    cache.set_max_bytes(15);

    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&"c"));
    assert_eq!(cache.max_bytes(), 15);
}

#[test]
fn test_generated_output_weight_uses_pixel_buffer() {
    let pixels = RgbaImage::new(10, 20);
    let image = GeneratedImage::new(vec![0u8; 16], "image/png", pixels);
    let output = Arc::new(GeneratedOutput::new(Some(image), Some("caption".to_string())));
    assert_eq!(output.size_bytes(), 10 * 20 * 4 + "caption".len());

    let cache: ResultCache = ResultCache::new(ResultCacheConfig::default().with_max_bytes(4096));
    let key = RequestFingerprint::compute("a cat", OutputKind::Combined, &[]);
    cache.put(key.clone(), output.clone());
    let cached = cache.get(&key).expect("cached output");
    assert!(Arc::ptr_eq(&cached, &output));
}

#[test]
fn test_concurrent_access() {
    let cache = Arc::new(text_cache(10_000));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    let key: &'static str = if i % 2 == 0 { "even" } else { "odd" };
                    cache.put(key, format!("{t}-{i}"));
                    assert!(cache.get(&key).is_some());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }
    assert_eq!(cache.len(), 2);
    assert!(cache.total_bytes() <= cache.max_bytes());
}
