//! Bounded, TTL-expiring cache of scene snapshots and their projections
//!
//! Safe to share between threads without external locking. Every read and
//! every write stamps the entry with the next value of one shared access
//! counter; when a cache is full the entry with the smallest stamp goes.
//!
//! Snapshots are held weakly: the cache only speeds up access while some
//! other owner keeps a snapshot alive. A lookup whose snapshot is gone is a
//! miss and the caller rebuilds.
//!
//! Staleness is detected by object count and age only. An edit that keeps
//! the count unchanged is invisible here, which is why the editor calls the
//! invalidation hooks on every mutation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::core::config::CacheConfig;
use crate::llm::context::DetailLevel;
use crate::scene::snapshot::SceneSnapshot;

/// Key of a snapshot entry: `galaxy:zone`, or `galaxy:full` for the whole galaxy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    galaxy: String,
    zone: Option<String>,
}

impl SnapshotKey {
    pub fn new(galaxy: &str, zone: Option<&str>) -> Self {
        Self {
            galaxy: galaxy.to_string(),
            zone: zone.filter(|z| !z.is_empty()).map(str::to_string),
        }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.galaxy, self.zone.as_deref().unwrap_or("full"))
    }
}

/// Key of a projection entry: `level:galaxy:zone:count`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionKey {
    level: DetailLevel,
    scope: SnapshotKey,
    object_count: usize,
}

impl ProjectionKey {
    pub fn new(level: DetailLevel, galaxy: &str, zone: Option<&str>, object_count: usize) -> Self {
        Self {
            level,
            scope: SnapshotKey::new(galaxy, zone),
            object_count,
        }
    }
}

impl fmt::Display for ProjectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.level, self.scope, self.object_count)
    }
}

struct SnapshotEntry {
    snapshot: Weak<SceneSnapshot>,
    created_at: Instant,
    last_access: AtomicU64,
    object_count: usize,
}

struct ProjectionEntry {
    value: Arc<Value>,
    created_at: Instant,
    last_access: AtomicU64,
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub snapshot_entries: usize,
    pub projection_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

enum Lookup<T> {
    Hit(T),
    Missing,
    Stale(&'static str),
}

/// Snapshot and projection cache
pub struct ContextCache {
    ttl: Duration,
    max_snapshots: usize,
    max_projections: usize,
    snapshots: DashMap<SnapshotKey, SnapshotEntry>,
    projections: DashMap<ProjectionKey, ProjectionEntry>,
    access_clock: AtomicU64,
    counters: Counters,
}

impl ContextCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            ttl: config.ttl(),
            max_snapshots: config.max_snapshots.max(1),
            max_projections: config.max_projections.max(1),
            snapshots: DashMap::new(),
            projections: DashMap::new(),
            access_clock: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    #[inline]
    fn tick(&self) -> u64 {
        self.access_clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    fn expired(&self, created_at: Instant) -> bool {
        created_at.elapsed() > self.ttl
    }

    // === SNAPSHOTS ===

    /// Cached snapshot for this galaxy/zone, if still valid for `expected_count` objects
    pub fn get(
        &self,
        galaxy: &str,
        zone: Option<&str>,
        expected_count: usize,
    ) -> Option<Arc<SceneSnapshot>> {
        let key = SnapshotKey::new(galaxy, zone);

        // The map guard must be released before any removal below.
        let lookup = match self.snapshots.get(&key) {
            None => Lookup::Missing,
            Some(entry) => {
                if self.expired(entry.created_at) {
                    Lookup::Stale("expired")
                } else if entry.object_count != expected_count {
                    Lookup::Stale("object count changed")
                } else {
                    match entry.snapshot.upgrade() {
                        Some(snapshot) => {
                            entry.last_access.store(self.tick(), Ordering::Relaxed);
                            Lookup::Hit(snapshot)
                        }
                        None => Lookup::Stale("released"),
                    }
                }
            }
        };

        match lookup {
            Lookup::Hit(snapshot) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Snapshot cache hit");
                Some(snapshot)
            }
            Lookup::Missing => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Lookup::Stale(reason) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                self.snapshots.remove_if(&key, |_, e| {
                    self.expired(e.created_at)
                        || e.object_count != expected_count
                        || e.snapshot.strong_count() == 0
                });
                tracing::debug!(key = %key, reason, "Purged stale snapshot entry");
                None
            }
        }
    }

    /// Remember `snapshot` without taking ownership of it
    pub fn put(&self, galaxy: &str, zone: Option<&str>, snapshot: &Arc<SceneSnapshot>) {
        let key = SnapshotKey::new(galaxy, zone);
        self.sweep_snapshots();

        while self.snapshots.len() >= self.max_snapshots && !self.snapshots.contains_key(&key) {
            if !self.evict_lru_snapshot() {
                break;
            }
        }

        self.snapshots.insert(
            key,
            SnapshotEntry {
                snapshot: Arc::downgrade(snapshot),
                created_at: Instant::now(),
                last_access: AtomicU64::new(self.tick()),
                object_count: snapshot.len(),
            },
        );
    }

    /// Cached snapshot, or build, cache and return a new one
    pub fn get_or_build<E, F>(
        &self,
        galaxy: &str,
        zone: Option<&str>,
        expected_count: usize,
        build: F,
    ) -> Result<Arc<SceneSnapshot>, E>
    where
        F: FnOnce() -> Result<SceneSnapshot, E>,
    {
        if let Some(cached) = self.get(galaxy, zone, expected_count) {
            return Ok(cached);
        }
        let snapshot = Arc::new(build()?);
        self.put(galaxy, zone, &snapshot);
        Ok(snapshot)
    }

    fn sweep_snapshots(&self) {
        let before = self.snapshots.len();
        self.snapshots
            .retain(|_, e| !self.expired(e.created_at) && e.snapshot.strong_count() > 0);
        let dropped = before.saturating_sub(self.snapshots.len());
        if dropped > 0 {
            self.counters
                .expirations
                .fetch_add(dropped as u64, Ordering::Relaxed);
        }
    }

    fn evict_lru_snapshot(&self) -> bool {
        let victim = self
            .snapshots
            .iter()
            .min_by_key(|e| e.last_access.load(Ordering::Relaxed))
            .map(|e| e.key().clone());

        match victim {
            Some(key) => {
                let removed = self.snapshots.remove(&key).is_some();
                if removed {
                    self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "Evicted least recently used snapshot");
                }
                removed
            }
            None => false,
        }
    }

    // === PROJECTIONS ===

    pub fn get_projection(
        &self,
        level: DetailLevel,
        galaxy: &str,
        zone: Option<&str>,
        object_count: usize,
    ) -> Option<Arc<Value>> {
        let key = ProjectionKey::new(level, galaxy, zone, object_count);

        let lookup = match self.projections.get(&key) {
            None => Lookup::Missing,
            Some(entry) if self.expired(entry.created_at) => Lookup::Stale("expired"),
            Some(entry) => {
                entry.last_access.store(self.tick(), Ordering::Relaxed);
                Lookup::Hit(Arc::clone(&entry.value))
            }
        };

        match lookup {
            Lookup::Hit(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Projection cache hit");
                Some(value)
            }
            Lookup::Missing => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Lookup::Stale(reason) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
                self.projections
                    .remove_if(&key, |_, e| self.expired(e.created_at));
                tracing::debug!(key = %key, reason, "Purged stale projection entry");
                None
            }
        }
    }

    pub fn put_projection(
        &self,
        level: DetailLevel,
        galaxy: &str,
        zone: Option<&str>,
        object_count: usize,
        value: Value,
    ) -> Arc<Value> {
        let key = ProjectionKey::new(level, galaxy, zone, object_count);
        self.sweep_projections();

        while self.projections.len() >= self.max_projections && !self.projections.contains_key(&key)
        {
            if !self.evict_lru_projection() {
                break;
            }
        }

        let value = Arc::new(value);
        self.projections.insert(
            key,
            ProjectionEntry {
                value: Arc::clone(&value),
                created_at: Instant::now(),
                last_access: AtomicU64::new(self.tick()),
            },
        );
        value
    }

    /// Cached projection, or build, cache and return a new one
    pub fn get_or_build_projection<F>(
        &self,
        level: DetailLevel,
        galaxy: &str,
        zone: Option<&str>,
        object_count: usize,
        build: F,
    ) -> Arc<Value>
    where
        F: FnOnce() -> Value,
    {
        if let Some(cached) = self.get_projection(level, galaxy, zone, object_count) {
            return cached;
        }
        self.put_projection(level, galaxy, zone, object_count, build())
    }

    fn sweep_projections(&self) {
        let before = self.projections.len();
        self.projections.retain(|_, e| !self.expired(e.created_at));
        let dropped = before.saturating_sub(self.projections.len());
        if dropped > 0 {
            self.counters
                .expirations
                .fetch_add(dropped as u64, Ordering::Relaxed);
        }
    }

    fn evict_lru_projection(&self) -> bool {
        let victim = self
            .projections
            .iter()
            .min_by_key(|e| e.last_access.load(Ordering::Relaxed))
            .map(|e| e.key().clone());

        match victim {
            Some(key) => {
                let removed = self.projections.remove(&key).is_some();
                if removed {
                    self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, "Evicted least recently used projection");
                }
                removed
            }
            None => false,
        }
    }

    // === INVALIDATION ===

    /// Drop every snapshot and projection of a galaxy, whole or zoned
    ///
    /// Galaxy names are compared whole, so "Bowser" does not drop "BowserJr".
    pub fn invalidate_scope(&self, galaxy: &str) {
        self.snapshots.retain(|k, _| k.galaxy != galaxy);
        self.projections.retain(|k, _| k.scope.galaxy != galaxy);
        tracing::debug!(galaxy, "Invalidated galaxy context");
    }

    /// Drop one zone's entries and the whole-galaxy entries that aggregate it
    pub fn invalidate_sub_scope(&self, galaxy: &str, zone: &str) {
        let stale = |key: &SnapshotKey| {
            key.galaxy == galaxy && key.zone.as_deref().map_or(true, |z| z == zone)
        };
        self.snapshots.retain(|k, _| !stale(k));
        self.projections.retain(|k, _| !stale(&k.scope));
        tracing::debug!(galaxy, zone, "Invalidated zone context");
    }

    pub fn clear(&self) {
        self.snapshots.clear();
        self.projections.clear();
    }

    // === INSPECTION ===

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Entry is resident, regardless of validity
    pub fn contains(&self, galaxy: &str, zone: Option<&str>) -> bool {
        self.snapshots.contains_key(&SnapshotKey::new(galaxy, zone))
    }

    /// Current access stamp of a resident snapshot entry
    pub fn last_access(&self, galaxy: &str, zone: Option<&str>) -> Option<u64> {
        self.snapshots
            .get(&SnapshotKey::new(galaxy, zone))
            .map(|e| e.last_access.load(Ordering::Relaxed))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            snapshot_entries: self.snapshots.len(),
            projection_entries: self.projections.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        }
    }
}

impl Default for ContextCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
