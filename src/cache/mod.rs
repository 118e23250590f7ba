//! Context caching for scene snapshots and their serialized projections

pub mod context_cache;

pub use context_cache::{CacheStats, ContextCache, ProjectionKey, SnapshotKey};
