mod grid;
mod lookup;

pub use grid::{Aabb3, LocalCoordinates, VoxelGrid};
pub use lookup::{OccupiedPosition, SpatialLookup};
