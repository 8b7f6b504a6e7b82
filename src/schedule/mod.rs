mod constraints;
mod extruder_scheduler;
mod feature_scheduler;

pub use constraints::{
    append_bed_adhesion_constraints, append_mesh_features_constraints,
    append_monotonic_constraints, SequenceConstraints,
};
pub use extruder_scheduler::ExtruderPlanScheduler;
pub use feature_scheduler::FeatureExtrusionScheduler;

use geo::MultiPolygon;

use crate::geometry::Point3;
use crate::storage::MeshStorage;
use crate::texture::TextureDataProvider;

///What to do to a move sequence when starting it from a chosen candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeSequenceAction {
    ///The point already is the start point.
    None,
    ///Reverse the open sequence; the point is its last one.
    Reverse,
    ///Rotate the closed sequence to end with the move at this index.
    Reorder { move_index: usize },
}

///A candidate position to start printing a feature from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartCandidatePoint {
    pub position: Point3,
    pub feature_index: usize,
    ///Index of the sequence within its feature; `None` when the feature
    ///is printed as-is without reordering.
    pub sequence_index: Option<usize>,
    pub action: ChangeSequenceAction,
}

///The best candidate found so far, with its squared distance to the
///nozzle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestStartPoint {
    pub distance_squared: i64,
    pub point: StartCandidatePoint,
}

impl ClosestStartPoint {
    ///Keep the closer of the two. Exact ties keep the incumbent, which
    ///makes the outcome deterministic but otherwise arbitrary.
    pub fn challenge(closest: &mut Option<Self>, challenger: Self) {
        if closest
            .as_ref()
            .map_or(true, |best| challenger.distance_squared < best.distance_squared)
        {
            *closest = Some(challenger);
        }
    }
}

///Shared inputs of a scheduling run over one layer.
pub struct ScheduleContext<'a> {
    pub meshes: &'a [MeshStorage],
    pub layer_index: usize,
    ///Overhanging areas seams should stay out of, mm.
    pub overhang_areas: Option<&'a MultiPolygon<f64>>,
    ///Painted-texture data and the feature name carrying the seam
    ///preference, when the build uses painted seams.
    pub texture: Option<(&'a dyn TextureDataProvider, &'a str)>,
    ///Seed for the random seam strategy; `None` draws from entropy.
    pub seam_seed: Option<u64>,
}

impl<'a> ScheduleContext<'a> {
    pub fn new(meshes: &'a [MeshStorage], layer_index: usize) -> Self {
        Self {
            meshes,
            layer_index,
            overhang_areas: None,
            texture: None,
            seam_seed: None,
        }
    }
}
