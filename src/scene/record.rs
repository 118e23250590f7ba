//! Object records - one entity of a galaxy scene

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::SceneError;
use crate::core::types::{is_finite_vec, ObjectId, Vec3, UNIT_SCALE};

/// Object classification
///
/// The named variants are the classifications produced by the level loader.
/// Anything else (`enemy`, `collectible`, ...) is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Level,
    Area,
    Camera,
    Child,
    Cutscene,
    Debug,
    Gravity,
    MapPart,
    Position,
    Sound,
    Stage,
    Start,
    Unknown,
    Other(String),
}

impl ObjectType {
    /// Parse a classification string, case-insensitively
    pub fn parse(value: &str) -> Self {
        let lower = value.trim().to_lowercase();
        match lower.as_str() {
            "level" | "obj" => Self::Level,
            "area" => Self::Area,
            "camera" => Self::Camera,
            "child" => Self::Child,
            "cutscene" | "demo" => Self::Cutscene,
            "debug" => Self::Debug,
            "gravity" | "planet" => Self::Gravity,
            "mappart" | "mapparts" => Self::MapPart,
            "position" => Self::Position,
            "sound" => Self::Sound,
            "stage" => Self::Stage,
            "start" => Self::Start,
            "" | "unknown" => Self::Unknown,
            _ => Self::Other(lower),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Level => "level",
            Self::Area => "area",
            Self::Camera => "camera",
            Self::Child => "child",
            Self::Cutscene => "cutscene",
            Self::Debug => "debug",
            Self::Gravity => "gravity",
            Self::MapPart => "mappart",
            Self::Position => "position",
            Self::Sound => "sound",
            Self::Stage => "stage",
            Self::Start => "start",
            Self::Unknown => "unknown",
            Self::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObjectType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Scalar property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Object as handed over by the level loader, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawObject {
    pub id: i32,
    pub name: String,
    /// Optional; derived from the name table when absent
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub object_type: String,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub layer: String,
    pub zone: String,
    pub properties: BTreeMap<String, PropertyValue>,
    /// Optional; derived tags are appended to these
    pub tags: Vec<String>,
}

impl Default for RawObject {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            display_name: None,
            object_type: "unknown".into(),
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            layer: "common".into(),
            zone: String::new(),
            properties: BTreeMap::new(),
            tags: Vec::new(),
        }
    }
}

/// Immutable record of one object in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    id: ObjectId,
    name: String,
    display_name: String,
    #[serde(rename = "type")]
    object_type: ObjectType,
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    layer: String,
    zone: String,
    properties: BTreeMap<String, PropertyValue>,
    tags: Vec<String>,
}

impl ObjectRecord {
    /// Validated factory
    ///
    /// Rejects empty names and non-finite transforms. Tags are kept in the
    /// given order, duplicates included.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ObjectId,
        name: impl Into<String>,
        display_name: impl Into<String>,
        object_type: ObjectType,
        position: Vec3,
        rotation: Vec3,
        scale: Vec3,
        layer: impl Into<String>,
        zone: impl Into<String>,
        properties: BTreeMap<String, PropertyValue>,
        tags: Vec<String>,
    ) -> Result<Self, SceneError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SceneError::EmptyName(id));
        }
        for (field, v) in [("position", position), ("rotation", rotation), ("scale", scale)] {
            if !is_finite_vec(v) {
                return Err(SceneError::NonFinite { id, field });
            }
        }

        let display_name = display_name.into();
        Ok(Self {
            id,
            display_name: if display_name.is_empty() { name.clone() } else { display_name },
            name,
            object_type,
            position,
            rotation,
            scale,
            layer: layer.into(),
            zone: zone.into(),
            properties,
            tags,
        })
    }

    /// Minimal record placed at `position`, for tests and quick tooling
    pub fn simple(
        id: i32,
        name: &str,
        object_type: &str,
        position: Vec3,
    ) -> Result<Self, SceneError> {
        Self::new(
            ObjectId(id),
            name,
            name,
            ObjectType::parse(object_type),
            position,
            Vec3::ZERO,
            UNIT_SCALE,
            "common",
            "",
            BTreeMap::new(),
            Vec::new(),
        )
    }

    /// Same record with a different tag list
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    pub fn has_default_scale(&self) -> bool {
        self.scale == UNIT_SCALE
    }
}
