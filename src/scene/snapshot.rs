//! Immutable, indexed view of every object in a scene or zone

use ahash::AHashMap;

use crate::core::error::SceneError;
use crate::core::types::{ObjectId, Vec3};
use crate::scene::record::ObjectRecord;

/// Point-in-time view of a galaxy (or one of its zones)
///
/// Built once, never mutated. Indices are derived from `objects` at
/// construction, so they can never drift from it. Share it as
/// `Arc<SceneSnapshot>`; the context cache only holds weak references.
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    galaxy: String,
    zone: Option<String>,
    objects: Vec<ObjectRecord>,
    by_id: AHashMap<ObjectId, usize>,
    by_type: AHashMap<String, Vec<usize>>,
    by_name: AHashMap<String, Vec<usize>>,
}

impl SceneSnapshot {
    /// Build a snapshot; object ids must be unique
    pub fn new(
        galaxy: impl Into<String>,
        zone: Option<String>,
        objects: Vec<ObjectRecord>,
    ) -> Result<Self, SceneError> {
        let galaxy = galaxy.into();
        if galaxy.trim().is_empty() {
            return Err(SceneError::EmptyScope);
        }

        let mut by_id = AHashMap::with_capacity(objects.len());
        let mut by_type: AHashMap<String, Vec<usize>> = AHashMap::new();
        let mut by_name: AHashMap<String, Vec<usize>> = AHashMap::new();

        for (i, object) in objects.iter().enumerate() {
            if by_id.insert(object.id(), i).is_some() {
                return Err(SceneError::DuplicateId(object.id()));
            }
            by_type
                .entry(object.object_type().as_str().to_string())
                .or_default()
                .push(i);
            by_name
                .entry(object.name().to_lowercase())
                .or_default()
                .push(i);
        }

        Ok(Self {
            galaxy,
            zone: zone.filter(|z| !z.is_empty()),
            objects,
            by_id,
            by_type,
            by_name,
        })
    }

    pub fn galaxy(&self) -> &str {
        &self.galaxy
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn objects(&self) -> &[ObjectRecord] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectRecord> {
        self.by_id.get(&id).map(|&i| &self.objects[i])
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Records of one classification, in snapshot order
    pub fn by_type(&self, object_type: &str) -> impl Iterator<Item = &ObjectRecord> + '_ {
        self.by_type
            .get(&object_type.to_lowercase())
            .into_iter()
            .flatten()
            .map(move |&i| &self.objects[i])
    }

    /// Records with this exact name (case-insensitive), in snapshot order
    pub fn by_name(&self, name: &str) -> impl Iterator<Item = &ObjectRecord> + '_ {
        self.by_name
            .get(&name.to_lowercase())
            .into_iter()
            .flatten()
            .map(move |&i| &self.objects[i])
    }

    /// Classification names present, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_type.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Records within `radius` of `center`, in snapshot order
    pub fn within_radius(&self, center: Vec3, radius: f32) -> Vec<&ObjectRecord> {
        self.objects
            .iter()
            .filter(|o| o.distance_to(center) <= radius)
            .collect()
    }

    /// Axis-aligned bounds of every position, `None` when empty
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.objects.first()?.position();
        Some(self.objects.iter().fold((first, first), |(min, max), o| {
            (min.min(o.position()), max.max(o.position()))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SceneSnapshot {
        SceneSnapshot::new(
            "RedBlueExGalaxy",
            Some("RedBlueExZone".into()),
            vec![
                ObjectRecord::simple(1, "Goomba1", "enemy", Vec3::new(0.0, 0.0, 0.0)).unwrap(),
                ObjectRecord::simple(2, "Goomba2", "enemy", Vec3::new(10.0, 0.0, 0.0)).unwrap(),
                ObjectRecord::simple(3, "Coin1", "collectible", Vec3::new(0.0, 200.0, 0.0))
                    .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_indices_match_objects() {
        let snap = snapshot();
        assert_eq!(snap.len(), 3);
        let enemies: Vec<_> = snap.by_type("Enemy").map(|o| o.id().0).collect();
        assert_eq!(enemies, vec![1, 2]);
        assert_eq!(snap.by_name("coin1").count(), 1);
        assert_eq!(snap.get(ObjectId(2)).unwrap().name(), "Goomba2");
        assert!(snap.get(ObjectId(9)).is_none());
        assert_eq!(snap.type_names(), vec!["collectible", "enemy"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = SceneSnapshot::new(
            "Galaxy",
            None,
            vec![
                ObjectRecord::simple(1, "A", "enemy", Vec3::ZERO).unwrap(),
                ObjectRecord::simple(1, "B", "enemy", Vec3::ZERO).unwrap(),
            ],
        );
        assert!(matches!(result, Err(SceneError::DuplicateId(ObjectId(1)))));
    }

    #[test]
    fn test_empty_zone_normalised() {
        let snap = SceneSnapshot::new("Galaxy", Some(String::new()), vec![]).unwrap();
        assert_eq!(snap.zone(), None);
        assert!(snap.is_empty());
        assert!(snap.bounds().is_none());
    }

    #[test]
    fn test_within_radius_and_bounds() {
        let snap = snapshot();
        assert_eq!(snap.within_radius(Vec3::ZERO, 50.0).len(), 2);
        let (min, max) = snap.bounds().unwrap();
        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::new(10.0, 200.0, 0.0));
    }
}
