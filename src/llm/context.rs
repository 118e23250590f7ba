//! Scene projections sent to language-model providers
//!
//! A projection is a bounded JSON view of a snapshot. The detail level
//! decides which per-object fields are included; the compact AI variant
//! trades completeness for a small, relevance-ordered payload.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::cache::ContextCache;
use crate::core::config::ProjectionConfig;
use crate::core::types::{round1, to_array, Vec3};
use crate::scene::naming::LAYER_TAG_PREFIX;
use crate::scene::record::{ObjectRecord, PropertyValue};
use crate::scene::snapshot::SceneSnapshot;
use crate::spatial::SparseHashGrid;

/// How much of each object a projection carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// id, name, type, position
    Minimal,
    /// plus display name, layer, zone, tags and the type index
    #[default]
    Standard,
    /// plus rotation, scale and properties
    Detailed,
    /// plus the proximity map
    Spatial,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Detailed => "detailed",
            Self::Spatial => "spatial",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "detailed" => Ok(Self::Detailed),
            "spatial" => Ok(Self::Spatial),
            other => Err(format!("unknown detail level: {}", other)),
        }
    }
}

/// Relevance rank of a classification in the AI projection (lower first)
pub fn type_rank(object_type: &str) -> u8 {
    match object_type {
        "level" => 1,
        "enemy" => 2,
        "collectible" => 3,
        "platform" => 4,
        "start" => 5,
        "area" => 6,
        "camera" => 7,
        "gravity" => 8,
        _ => 10,
    }
}

/// Tags worth sending: no layer markers, no placeholder tags, no single letters
fn relevant_tags(record: &ObjectRecord) -> Vec<&str> {
    record
        .tags()
        .iter()
        .map(String::as_str)
        .filter(|t| {
            !t.starts_with(LAYER_TAG_PREFIX) && *t != "unknown" && *t != "debug" && t.chars().count() > 1
        })
        .take(3)
        .collect()
}

fn property_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Bool(v) => Value::Bool(*v),
        PropertyValue::Int(v) => Value::from(*v),
        PropertyValue::Float(v) => Value::from(*v),
        PropertyValue::Text(v) => Value::String(v.clone()),
    }
}

fn vec_json(v: Vec3) -> Value {
    json!(to_array(v))
}

/// Builds projections of snapshots
#[derive(Debug, Clone)]
pub struct SceneProjector {
    parallel_threshold: usize,
    proximity_radius: f32,
}

impl Default for SceneProjector {
    fn default() -> Self {
        Self::new(&ProjectionConfig::default())
    }
}

impl SceneProjector {
    pub fn new(config: &ProjectionConfig) -> Self {
        Self {
            parallel_threshold: config.parallel_threshold.max(1),
            proximity_radius: config.proximity_radius,
        }
    }

    fn object_json(record: &ObjectRecord, level: DetailLevel) -> Value {
        let mut object = Map::new();
        object.insert("id".into(), json!(record.id()));
        object.insert("name".into(), json!(record.name()));
        object.insert("type".into(), json!(record.object_type().as_str()));
        object.insert("position".into(), vec_json(record.position()));

        if level != DetailLevel::Minimal {
            object.insert("display_name".into(), json!(record.display_name()));
            object.insert("layer".into(), json!(record.layer()));
            object.insert("zone".into(), json!(record.zone()));
            object.insert("tags".into(), json!(record.tags()));
        }

        if matches!(level, DetailLevel::Detailed | DetailLevel::Spatial) {
            object.insert("rotation".into(), vec_json(record.rotation()));
            object.insert("scale".into(), vec_json(record.scale()));
            let properties: Map<String, Value> = record
                .properties()
                .iter()
                .map(|(k, v)| (k.clone(), property_json(v)))
                .collect();
            object.insert("properties".into(), Value::Object(properties));
        }

        Value::Object(object)
    }

    /// Full projection at `level`; object order always matches the snapshot
    pub fn project(&self, snapshot: &SceneSnapshot, level: DetailLevel) -> Value {
        let records = snapshot.objects();
        let parallel = records.len() >= self.parallel_threshold;

        let objects: Vec<Value> = if parallel {
            records
                .par_iter()
                .map(|r| Self::object_json(r, level))
                .collect()
        } else {
            records.iter().map(|r| Self::object_json(r, level)).collect()
        };

        let mut root = Map::new();
        root.insert("galaxy".into(), json!(snapshot.galaxy()));
        root.insert("zone".into(), json!(snapshot.zone()));
        root.insert("detail".into(), json!(level.as_str()));
        root.insert("object_count".into(), json!(records.len()));
        root.insert("objects".into(), Value::Array(objects));

        if level != DetailLevel::Minimal {
            let mut index: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
            for record in records {
                index
                    .entry(record.object_type().as_str())
                    .or_default()
                    .push(json!(record.id()));
            }
            root.insert("type_index".into(), json!(index));
        }

        if level == DetailLevel::Spatial {
            root.insert("proximity".into(), self.proximity_map(snapshot, parallel));
        }

        Value::Object(root)
    }

    /// id -> ids within the proximity radius; objects without neighbours are left out
    fn proximity_map(&self, snapshot: &SceneSnapshot, parallel: bool) -> Value {
        let mut grid = SparseHashGrid::new(self.proximity_radius);
        grid.rebuild(snapshot.objects().iter().map(|r| (r.id(), r.position())));

        let neighbours_of = |record: &ObjectRecord| {
            let mut ids = grid.query_radius(record.position(), self.proximity_radius);
            ids.retain(|&id| id != record.id());
            ids.sort_unstable();
            (record.id(), ids)
        };

        let rows: Vec<_> = if parallel {
            snapshot.objects().par_iter().map(neighbours_of).collect()
        } else {
            snapshot.objects().iter().map(neighbours_of).collect()
        };

        let map: Map<String, Value> = rows
            .into_iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(id, ids)| (id.to_string(), json!(ids)))
            .collect();
        Value::Object(map)
    }

    /// Compact projection ordered by distance from `origin`, then type relevance
    pub fn project_for_ai(&self, snapshot: &SceneSnapshot, max_objects: usize, origin: Vec3) -> Value {
        let mut ranked: Vec<&ObjectRecord> = snapshot.objects().iter().collect();
        ranked.sort_by_key(|r| {
            (
                OrderedFloat(r.distance_to(origin)),
                type_rank(r.object_type().as_str()),
            )
        });
        ranked.truncate(max_objects);

        let objects: Vec<Value> = ranked
            .iter()
            .map(|r| {
                let p = r.position();
                let mut object = Map::new();
                object.insert("id".into(), json!(r.id()));
                object.insert("name".into(), json!(r.name()));
                object.insert("type".into(), json!(r.object_type().as_str()));
                object.insert(
                    "position".into(),
                    json!([round1(p.x), round1(p.y), round1(p.z)]),
                );
                if r.display_name() != r.name() {
                    object.insert("display_name".into(), json!(r.display_name()));
                }
                if !r.has_default_scale() {
                    let s = r.scale();
                    object.insert("scale".into(), json!([round1(s.x), round1(s.y), round1(s.z)]));
                }
                let tags = relevant_tags(r);
                if !tags.is_empty() {
                    object.insert("tags".into(), json!(tags));
                }
                Value::Object(object)
            })
            .collect();

        let included = objects.len();
        json!({
            "galaxy": snapshot.galaxy(),
            "zone": snapshot.zone(),
            "total_objects": snapshot.len(),
            "included_objects": included,
            "objects": objects,
        })
    }

    /// Projection through the context cache
    pub fn project_cached(
        &self,
        cache: &ContextCache,
        snapshot: &SceneSnapshot,
        level: DetailLevel,
    ) -> Arc<Value> {
        cache.get_or_build_projection(level, snapshot.galaxy(), snapshot.zone(), snapshot.len(), || {
            self.project(snapshot, level)
        })
    }
}

/// Short text overview of a snapshot for prompts and the CLI
pub fn scene_summary(snapshot: &SceneSnapshot) -> String {
    let mut s = String::new();
    s.push_str(&format!("Galaxy: {}\n", snapshot.galaxy()));
    if let Some(zone) = snapshot.zone() {
        s.push_str(&format!("Zone: {}\n", zone));
    }
    s.push_str(&format!("Objects: {}\n", snapshot.len()));

    let types = snapshot.type_names();
    if !types.is_empty() {
        s.push_str("\nBy type:\n");
        for name in types {
            s.push_str(&format!("- {}: {}\n", name, snapshot.by_type(name).count()));
        }
    }
    s
}
