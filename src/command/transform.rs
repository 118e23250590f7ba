//! Structured edits handed to the scene applier
//!
//! A backend reply becomes a `CommandResult` holding ordered
//! `Transformation`s. Nothing here touches the scene; `validate` only checks
//! that each edit is applicable to a snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::{is_finite_vec, ObjectId, Vec3};
use crate::scene::record::PropertyValue;
use crate::scene::snapshot::SceneSnapshot;

/// Scale components above this are applied but flagged
pub const MAX_REASONABLE_SCALE: f32 = 100.0;

/// Coordinates beyond this magnitude are applied but flagged
pub const MAX_REASONABLE_COORDINATE: f32 = 100_000.0;

/// What a transformation acts on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformTarget {
    /// An existing object
    Object(ObjectId),
    /// A new object of the given type
    Add(String),
}

impl fmt::Display for TransformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(id) => write!(f, "object {}", id),
            Self::Add(object_type) => write!(f, "new {}", object_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Move,
    Rotate,
    Scale,
    SetProperty,
    Add,
    Delete,
    Duplicate,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Rotate => "rotate",
            Self::Scale => "scale",
            Self::SetProperty => "set_property",
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Duplicate => "duplicate",
        }
    }

    /// Move, rotate and scale carry their payload in `vector`
    pub fn requires_vector(&self) -> bool {
        matches!(self, Self::Move | Self::Rotate | Self::Scale)
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub target: TransformTarget,
    pub kind: TransformKind,
    /// Position for move/add, Euler degrees for rotate, factors for scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec3>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default)]
    pub description: String,
}

impl Transformation {
    pub fn new(target: TransformTarget, kind: TransformKind) -> Self {
        Self {
            target,
            kind,
            vector: None,
            properties: BTreeMap::new(),
            description: String::new(),
        }
    }

    pub fn with_vector(mut self, vector: Vec3) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A validation finding for the transformation at `index`
#[derive(Debug, Clone, PartialEq)]
pub struct TransformIssue {
    pub index: usize,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for TransformIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transformation {}: {}", self.index, self.message)
    }
}

/// Check every transformation against `snapshot`
///
/// Never stops at the first problem; all findings come back in input order.
pub fn validate_transformations(
    transformations: &[Transformation],
    snapshot: &SceneSnapshot,
) -> Vec<TransformIssue> {
    let mut issues = Vec::new();

    for (index, t) in transformations.iter().enumerate() {
        let mut push = |severity: Severity, message: String| {
            issues.push(TransformIssue {
                index,
                severity,
                message,
            })
        };

        match &t.target {
            TransformTarget::Object(id) if !snapshot.contains(*id) => {
                push(Severity::Error, format!("unknown target object {}", id));
            }
            TransformTarget::Add(object_type) if object_type.trim().is_empty() => {
                push(Severity::Error, "add target has no object type".into());
            }
            _ => {}
        }

        if t.kind.requires_vector() && t.vector.is_none() {
            push(Severity::Error, format!("{} requires a vector", t.kind));
        }
        if t.kind == TransformKind::SetProperty && t.properties.is_empty() {
            push(Severity::Error, "set_property without properties".into());
        }

        for (key, value) in &t.properties {
            if let PropertyValue::Float(v) = value {
                if !v.is_finite() {
                    push(
                        Severity::Error,
                        format!("property '{}' is not a finite number", key),
                    );
                }
            }
        }

        let Some(vector) = t.vector else {
            continue;
        };
        if !is_finite_vec(vector) {
            push(Severity::Error, format!("{} vector is not finite", t.kind));
            continue;
        }

        match t.kind {
            TransformKind::Scale => {
                let v = vector.to_array();
                if v.iter().any(|c| *c <= 0.0) {
                    push(Severity::Error, format!("scale must be positive, got {:?}", v));
                } else if v.iter().any(|c| *c > MAX_REASONABLE_SCALE) {
                    push(
                        Severity::Warning,
                        format!("scale {:?} exceeds {}", v, MAX_REASONABLE_SCALE),
                    );
                }
            }
            TransformKind::Move | TransformKind::Add | TransformKind::Duplicate => {
                if vector.abs().max_element() > MAX_REASONABLE_COORDINATE {
                    push(
                        Severity::Warning,
                        format!(
                            "position {:?} is far outside the usual level bounds",
                            vector.to_array()
                        ),
                    );
                }
            }
            _ => {}
        }
    }

    issues
}

/// Result handed to the scene applier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub transformations: Vec<Transformation>,
    pub feedback: String,
    /// Backend reply exactly as received
    pub raw_response: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Backend that produced the reply
    pub provider: Option<String>,
}

impl CommandResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![message.into()],
            ..Self::default()
        }
    }

    /// Run validation and fold the findings into `errors`/`warnings`
    ///
    /// Any error marks the whole result unsuccessful.
    pub fn validate(&mut self, snapshot: &SceneSnapshot) {
        for issue in validate_transformations(&self.transformations, snapshot) {
            match issue.severity {
                Severity::Error => self.errors.push(issue.to_string()),
                Severity::Warning => {
                    tracing::warn!(index = issue.index, "{}", issue.message);
                    self.warnings.push(issue.to_string());
                }
            }
        }
        if !self.errors.is_empty() {
            self.success = false;
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
