//! Core type definitions used throughout the codebase

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

pub use glam::Vec3;

/// Identifier of an object within one snapshot
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct ObjectId(pub i32);

impl ObjectId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }
}

/// Default scale of an untouched object
pub const UNIT_SCALE: Vec3 = Vec3::ONE;

/// True when all three components are finite
#[inline]
pub fn is_finite_vec(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// Round to one decimal place
#[inline]
pub fn round1(value: f32) -> f64 {
    (f64::from(value) * 10.0).round() / 10.0
}

/// Vector as a `[x, y, z]` array
#[inline]
pub fn to_array(v: Vec3) -> [f32; 3] {
    [v.x, v.y, v.z]
}
