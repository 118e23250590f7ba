//! Sparse hash grid for efficient proximity queries

use ahash::AHashMap;

use crate::core::types::{ObjectId, Vec3};

/// Sparse 3D hash grid; cells are only allocated where objects exist
pub struct SparseHashGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32, i32), Vec<(ObjectId, Vec3)>>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            cells: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec3) -> (i32, i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, object: ObjectId, pos: Vec3) {
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push((object, pos));
    }

    /// All objects in the 3x3x3 block of cells around `pos`
    ///
    /// Cells past the `i32` edge of the grid do not exist and are skipped.
    pub fn query_neighbors(&self, pos: Vec3) -> impl Iterator<Item = (ObjectId, Vec3)> + '_ {
        let (cx, cy, cz) = self.cell_coord(pos);

        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).flat_map(move |dz| {
                    let cell = match (cx.checked_add(dx), cy.checked_add(dy), cz.checked_add(dz)) {
                        (Some(x), Some(y), Some(z)) => self.cells.get(&(x, y, z)),
                        _ => None,
                    };
                    cell.into_iter().flatten().copied()
                })
            })
        })
    }

    /// Objects within `radius` of `center`; `radius` must not exceed the cell size
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<ObjectId> {
        self.query_neighbors(center)
            .filter(|(_, pos)| center.distance(*pos) <= radius)
            .map(|(id, _)| id)
            .collect()
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, objects: impl Iterator<Item = (ObjectId, Vec3)>) {
        self.clear();
        for (object, pos) in objects {
            self.insert(object, pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_radius_across_cells() {
        let mut grid = SparseHashGrid::new(10.0);
        grid.insert(ObjectId(1), Vec3::new(9.0, 0.0, 0.0));
        grid.insert(ObjectId(2), Vec3::new(11.0, 0.0, 0.0));
        grid.insert(ObjectId(3), Vec3::new(25.0, 0.0, 0.0));

        let mut found = grid.query_radius(Vec3::new(10.0, 0.0, 0.0), 10.0);
        found.sort();
        assert_eq!(found, vec![ObjectId(1), ObjectId(2)]);
    }

    #[test]
    fn test_negative_coordinates() {
        let mut grid = SparseHashGrid::new(5.0);
        grid.rebuild(
            vec![
                (ObjectId(1), Vec3::new(-1.0, -1.0, -1.0)),
                (ObjectId(2), Vec3::new(1.0, 1.0, 1.0)),
            ]
            .into_iter(),
        );
        assert_eq!(grid.query_radius(Vec3::ZERO, 5.0).len(), 2);
    }

    #[test]
    fn test_edge_of_grid_does_not_overflow() {
        let mut grid = SparseHashGrid::new(10.0);
        grid.insert(ObjectId(1), Vec3::new(2.0e12, 0.0, 0.0));
        grid.insert(ObjectId(2), Vec3::new(-2.0e12, 0.0, 0.0));
        grid.insert(ObjectId(3), Vec3::ZERO);

        let far: Vec<_> = grid.query_neighbors(Vec3::new(2.0e12, 0.0, 0.0)).collect();
        assert_eq!(far.len(), 1);
        assert_eq!(far[0].0, ObjectId(1));
        assert_eq!(grid.query_radius(Vec3::new(-2.0e12, 0.0, 0.0), 10.0), vec![ObjectId(2)]);
        assert_eq!(grid.query_radius(Vec3::ZERO, 10.0), vec![ObjectId(3)]);
    }
}
