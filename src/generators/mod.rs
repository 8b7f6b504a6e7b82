mod infill;
mod insets;
mod lines;
mod skin;
mod skirt_brim;

pub use infill::MeshInfillGenerator;
pub use insets::MeshInsetsGenerator;
pub use lines::spaced_line_fill;
pub use skin::MeshSkinGenerator;
pub use skirt_brim::SkirtBrimGenerator;

use crate::geometry::{mm_to_micron, Micron, Point2, Point3, Velocity};
use crate::plan::{ContinuousExtruderMoveSequence, ExtruderPlan, ExtrusionMove};
use crate::settings::Settings;
use crate::storage::SliceDataStorage;

///Vertical placement of the layer being generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerContext {
    pub layer_index: usize,
    pub z: Micron,
    pub thickness: Micron,
}

///Produces the feature extrusions of one concern (walls, skin, infill,
///bed adhesion) for a layer, appending them to the extruder plans under
///construction.
pub trait FeatureGenerator {
    ///Generators disabled by settings short-circuit here.
    fn is_active(&self, storage: &SliceDataStorage, settings: &Settings) -> bool;

    ///One-shot precomputation before any layer is generated.
    fn pre_calculate(&mut self, _storage: &SliceDataStorage, _settings: &Settings) {}

    fn generate(
        &self,
        storage: &SliceDataStorage,
        settings: &Settings,
        layer: &LayerContext,
        extruder_plans: &mut [ExtruderPlan],
    );
}

///The extruder plan with the given number, if the layer has one.
pub fn extruder_plan_for(
    extruder_plans: &mut [ExtruderPlan],
    extruder_nr: u8,
) -> Option<&mut ExtruderPlan> {
    extruder_plans
        .iter_mut()
        .find(|plan| plan.extruder_nr() == extruder_nr)
}

///An open move sequence along a polyline, at constant width and speed.
pub fn polyline_sequence(
    points: &[Point2],
    line_width: Micron,
    speed: Velocity,
) -> Option<ContinuousExtruderMoveSequence> {
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }

    let mut sequence = ContinuousExtruderMoveSequence::open(Point3::from_xy(*first));
    for point in rest {
        sequence.append_extrusion_move(ExtrusionMove::new(
            Point3::from_xy(*point),
            line_width,
            speed,
        ));
    }
    Some(sequence)
}

///A closed move sequence around a ring of vertices (without a duplicated
///closing vertex), at constant width and speed.
pub fn ring_sequence(
    points: &[Point2],
    line_width: Micron,
    speed: Velocity,
) -> Option<ContinuousExtruderMoveSequence> {
    if points.len() < 3 {
        return None;
    }

    let mut sequence = ContinuousExtruderMoveSequence::closed(Point3::from_xy(points[0]));
    for point in points.iter().skip(1).chain(std::iter::once(&points[0])) {
        sequence.append_extrusion_move(ExtrusionMove::new(
            Point3::from_xy(*point),
            line_width,
            speed,
        ));
    }
    Some(sequence)
}

///The exterior ring of a geo polygon as micron points, dropping the
///repeated closing coordinate.
pub fn ring_from_polygon(polygon: &geo::Polygon<f64>) -> Vec<Point2> {
    let coords = &polygon.exterior().0;
    let open_end = if coords.len() > 1 && coords.first() == coords.last() {
        coords.len() - 1
    } else {
        coords.len()
    };
    coords[..open_end]
        .iter()
        .map(|coord| Point2::new(mm_to_micron(coord.x), mm_to_micron(coord.y)))
        .collect()
}
