use glam::DVec3;
use rstar::primitives::GeomWithData;
use rstar::{RStarInsertionStrategy, RTree, RTreeParams};

use super::VoxelGrid;

///Node sizing of the lookup tree; quadratic split with capacity 8.
pub struct LookupParams;

impl RTreeParams for LookupParams {
    const MIN_SIZE: usize = 4;
    const MAX_SIZE: usize = 8;
    const REINSERTION_COUNT: usize = 3;
    type DefaultInsertionStrategy = RStarInsertionStrategy;
}

type LookupEntry = GeomWithData<[f64; 3], u8>;

///An occupied voxel centre (mm) with the extruder that owns it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OccupiedPosition {
    pub position: DVec3,
    pub owner: u8,
}

///An R-tree over the occupied voxels of a grid, for nearest-neighbour
///queries against the voxel centres.
pub struct SpatialLookup {
    tree: RTree<LookupEntry, LookupParams>,
}

impl SpatialLookup {
    pub fn from_voxel_grid(grid: &VoxelGrid) -> Self {
        let mut entries = Vec::with_capacity(grid.occupied_count());
        {
            let entries = std::sync::Mutex::new(&mut entries);
            grid.visit_occupied(|position, owner| {
                let centre = grid.to_global(position, true);
                entries
                    .lock()
                    .expect("collecting occupied voxels")
                    .push(LookupEntry::new([centre.x, centre.y, centre.z], owner));
            });
        }

        Self {
            tree: RTree::bulk_load_with_params(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    ///The occupied voxel centre closest to `position` (mm), by squared
    ///Euclidean distance.
    pub fn nearest(&self, position: DVec3) -> Option<OccupiedPosition> {
        self.tree
            .nearest_neighbor(&[position.x, position.y, position.z])
            .map(|entry| OccupiedPosition {
                position: DVec3::new(entry.geom()[0], entry.geom()[1], entry.geom()[2]),
                owner: entry.data,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;
    use crate::voxel::{Aabb3, LocalCoordinates};

    #[test]
    fn nearest_finds_closest_centre() {
        let bounding_box = Aabb3::new(Point3::new(0, 0, 0), Point3::new(10_000, 10_000, 10_000));
        let grid = VoxelGrid::new(&bounding_box, 1_000).unwrap();
        grid.set(LocalCoordinates::new(0, 0, 0), 0);
        grid.set(LocalCoordinates::new(9, 9, 9), 1);

        let lookup = SpatialLookup::from_voxel_grid(&grid);
        assert_eq!(lookup.len(), 2);

        let near_origin = lookup.nearest(DVec3::new(1.0, 1.0, 1.0)).unwrap();
        assert_eq!(near_origin.owner, 0);

        let near_far_corner = lookup.nearest(DVec3::new(9.0, 9.0, 9.0)).unwrap();
        assert_eq!(near_far_corner.owner, 1);
    }

    #[test]
    fn empty_grid_yields_no_neighbour() {
        let bounding_box = Aabb3::new(Point3::new(0, 0, 0), Point3::new(1_000, 1_000, 1_000));
        let grid = VoxelGrid::new(&bounding_box, 500).unwrap();
        let lookup = SpatialLookup::from_voxel_grid(&grid);
        assert!(lookup.is_empty());
        assert!(lookup.nearest(DVec3::ZERO).is_none());
    }
}
