//! Integration tests for the context cache
//!
//! Covers the snapshot path through ContextBuilder, projection caching via
//! the projector, weak ownership, LRU eviction and the invalidation hooks.

use std::sync::Arc;
use std::time::Duration;

use galaxy_intent::cache::ContextCache;
use galaxy_intent::core::config::{CacheConfig, ProjectionConfig};
use galaxy_intent::core::types::Vec3;
use galaxy_intent::llm::{DetailLevel, SceneProjector};
use galaxy_intent::scene::{ContextBuilder, ObjectRecord, RawObject, SceneDocument, SceneSnapshot};

fn snapshot(galaxy: &str, count: usize) -> Arc<SceneSnapshot> {
    let objects = (0..count)
        .map(|i| {
            ObjectRecord::simple(i as i32, &format!("Obj{}", i), "enemy", Vec3::splat(i as f32))
                .unwrap()
        })
        .collect();
    Arc::new(SceneSnapshot::new(galaxy, None, objects).unwrap())
}

fn document(count: i32) -> SceneDocument {
    SceneDocument {
        galaxy: "HoneyhiveGalaxy".into(),
        zone: None,
        objects: (1..=count)
            .map(|id| RawObject {
                id,
                name: format!("Kuribo{}", id),
                object_type: "enemy".into(),
                position: [id as f32 * 10.0, 0.0, 0.0],
                ..RawObject::default()
            })
            .collect(),
    }
}

#[test]
fn test_builder_round_trip_returns_same_snapshot() {
    let cache = Arc::new(ContextCache::default());
    let builder = ContextBuilder::new(Arc::clone(&cache));
    let doc = document(3);

    let first = builder.snapshot(&doc).unwrap();
    let second = builder.snapshot(&doc).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.snapshot_entries, 1);
}

#[test]
fn test_count_mismatch_is_a_miss() {
    let cache = ContextCache::default();
    let snap = snapshot("G", 3);
    cache.put("G", None, &snap);

    assert!(cache.get("G", None, 4).is_none());
    // The mismatched entry is purged
    assert!(!cache.contains("G", None));
}

#[test]
fn test_cache_does_not_keep_snapshots_alive() {
    let cache = ContextCache::default();
    let snap = snapshot("G", 2);
    cache.put("G", None, &snap);
    assert!(cache.get("G", None, 2).is_some());

    drop(snap);
    assert!(cache.get("G", None, 2).is_none());
}

#[test]
fn test_lru_victim_is_least_recently_touched() {
    let cache = ContextCache::new(CacheConfig {
        max_snapshots: 2,
        ..CacheConfig::default()
    });
    let a = snapshot("A", 1);
    let b = snapshot("B", 1);
    let c = snapshot("C", 1);

    cache.put("A", None, &a);
    cache.put("B", None, &b);
    assert!(cache.get("A", None, 1).is_some());
    cache.put("C", None, &c);

    assert!(cache.contains("A", None));
    assert!(!cache.contains("B", None));
    assert!(cache.contains("C", None));
    assert_eq!(cache.snapshot_count(), 2);
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_ttl_expiry() {
    let cache = ContextCache::new(CacheConfig {
        ttl_ms: 1,
        ..CacheConfig::default()
    });
    let snap = snapshot("G", 1);
    cache.put("G", None, &snap);
    std::thread::sleep(Duration::from_millis(20));

    assert!(cache.get("G", None, 1).is_none());
    assert!(cache.stats().expirations >= 1);
}

#[test]
fn test_projection_is_cached_until_scope_invalidated() {
    let cache = ContextCache::default();
    let projector = SceneProjector::new(&ProjectionConfig::default());
    let snap = snapshot("G", 4);

    let first = projector.project_cached(&cache, &snap, DetailLevel::Standard);
    let second = projector.project_cached(&cache, &snap, DetailLevel::Standard);
    assert!(Arc::ptr_eq(&first, &second));

    // Different level, different entry
    let minimal = projector.project_cached(&cache, &snap, DetailLevel::Minimal);
    assert!(!Arc::ptr_eq(&first, &minimal));
    assert_eq!(cache.projection_count(), 2);

    cache.invalidate_scope("G");
    assert_eq!(cache.projection_count(), 0);
    let rebuilt = projector.project_cached(&cache, &snap, DetailLevel::Standard);
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    assert_eq!(*first, *rebuilt);
}

#[test]
fn test_sub_scope_invalidation_keeps_other_zones() {
    let cache = ContextCache::default();
    let whole = snapshot("G", 1);
    let zone_a = snapshot("G", 1);
    let zone_b = snapshot("G", 1);
    let other = snapshot("H", 1);

    cache.put("G", None, &whole);
    cache.put("G", Some("A"), &zone_a);
    cache.put("G", Some("B"), &zone_b);
    cache.put("H", None, &other);

    cache.invalidate_sub_scope("G", "A");

    assert!(!cache.contains("G", None));
    assert!(!cache.contains("G", Some("A")));
    assert!(cache.contains("G", Some("B")));
    assert!(cache.contains("H", None));
}

#[test]
fn test_concurrent_put_and_get() {
    let cache = Arc::new(ContextCache::default());

    std::thread::scope(|scope| {
        for t in 0..8 {
            let cache = Arc::clone(&cache);
            scope.spawn(move || {
                for i in 0..50 {
                    let galaxy = format!("G{}", (t * 50 + i) % 12);
                    let built = snapshot(&galaxy, 1);
                    cache.put(&galaxy, None, &built);
                    let _ = cache.get(&galaxy, None, 1);
                }
            });
        }
    });

    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 8 * 50);
}
