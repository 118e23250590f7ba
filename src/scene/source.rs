//! Scene accessor and snapshot construction
//!
//! The editor exposes its current objects through [`SceneSource`]; nothing
//! here reaches into editor internals. [`ContextBuilder`] sits between the
//! source and the context cache and owns the live snapshot.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cache::ContextCache;
use crate::core::error::{GalaxyError, SceneError};
use crate::core::types::{ObjectId, Vec3};
use crate::scene::naming::{derive_tags, display_name_for};
use crate::scene::record::{ObjectRecord, ObjectType, RawObject};
use crate::scene::snapshot::SceneSnapshot;

/// Read-only view the editor exposes over its loaded scene
pub trait SceneSource {
    fn galaxy_name(&self) -> &str;

    /// Zone currently being edited, `None` for the whole galaxy
    fn zone_name(&self) -> Option<&str>;

    /// Cheap count used as the cache fingerprint
    fn object_count(&self) -> usize;

    fn objects(&self) -> Vec<RawObject>;
}

/// Convert a loader record into a validated [`ObjectRecord`]
pub fn record_from_raw(raw: RawObject) -> Result<ObjectRecord, SceneError> {
    let object_type = ObjectType::parse(&raw.object_type);
    let display_name = raw
        .display_name
        .filter(|d| !d.trim().is_empty())
        .or_else(|| display_name_for(&raw.name).map(str::to_string))
        .unwrap_or_else(|| raw.name.clone());

    let mut tags = raw.tags;
    derive_tags(&raw.name, &object_type, &raw.layer, &mut tags);

    ObjectRecord::new(
        ObjectId(raw.id),
        raw.name,
        display_name,
        object_type,
        Vec3::from_array(raw.position),
        Vec3::from_array(raw.rotation),
        Vec3::from_array(raw.scale),
        raw.layer,
        raw.zone,
        raw.properties,
        tags,
    )
}

/// Build a snapshot from everything the source currently holds
pub fn build_snapshot(source: &dyn SceneSource) -> Result<SceneSnapshot, SceneError> {
    let records = source
        .objects()
        .into_iter()
        .map(record_from_raw)
        .collect::<Result<Vec<_>, _>>()?;
    SceneSnapshot::new(
        source.galaxy_name(),
        source.zone_name().map(str::to_string),
        records,
    )
}

/// Serialized scene as exported by the level loader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    pub galaxy: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub objects: Vec<RawObject>,
}

impl SceneDocument {
    pub fn from_json(content: &str) -> Result<Self, GalaxyError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, GalaxyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl SceneSource for SceneDocument {
    fn galaxy_name(&self) -> &str {
        &self.galaxy
    }

    fn zone_name(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn objects(&self) -> Vec<RawObject> {
        self.objects.clone()
    }
}

/// Hands out the current snapshot, rebuilding only on a cache miss
///
/// The cache never keeps a snapshot alive on its own; this builder holds the
/// strong reference to the most recent one.
pub struct ContextBuilder {
    cache: Arc<ContextCache>,
    current: Mutex<Option<Arc<SceneSnapshot>>>,
}

impl ContextBuilder {
    pub fn new(cache: Arc<ContextCache>) -> Self {
        Self {
            cache,
            current: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<ContextCache> {
        &self.cache
    }

    /// Snapshot for the source's current state
    pub fn snapshot(&self, source: &dyn SceneSource) -> Result<Arc<SceneSnapshot>, SceneError> {
        let galaxy = source.galaxy_name();
        let zone = source.zone_name();

        if let Some(hit) = self.cache.get(galaxy, zone, source.object_count()) {
            *self.current.lock() = Some(Arc::clone(&hit));
            return Ok(hit);
        }

        let snapshot = Arc::new(build_snapshot(source)?);
        tracing::debug!(
            galaxy,
            zone = zone.unwrap_or("full"),
            objects = snapshot.len(),
            "Built scene snapshot"
        );
        self.cache.put(galaxy, zone, &snapshot);
        *self.current.lock() = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Scene mutation hook: drop cached views of the edited galaxy or zone
    pub fn scene_changed(&self, galaxy: &str, zone: Option<&str>) {
        match zone {
            Some(zone) => self.cache.invalidate_sub_scope(galaxy, zone),
            None => self.cache.invalidate_scope(galaxy),
        }
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|s| s.galaxy() == galaxy) {
            *current = None;
        }
    }
}
