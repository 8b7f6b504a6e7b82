mod consumption;
mod multi;

pub use consumption::ConsumptionEstimationExporter;
pub use multi::MultiExporter;

use crate::geometry::{Micron, Point3, Velocity};
use crate::plan::PrintFeatureType;

///Ordered sink for the emission of a print plan. Events arrive in exactly
///the order of a depth-first pre-order walk of the plan tree; positions
///are absolute.
pub trait PlanExporter {
    fn layer_start(&mut self, layer_index: usize, start_position: Point3);

    fn layer_end(&mut self, layer_index: usize, z: Micron, thickness: Micron);

    fn travel(&mut self, position: Point3, speed: Velocity, feature_type: PrintFeatureType);

    #[allow(clippy::too_many_arguments)]
    fn extrusion(
        &mut self,
        position: Point3,
        speed: Velocity,
        extruder_nr: u8,
        mm3_per_mm: f64,
        line_width: Micron,
        line_thickness: Micron,
        feature_type: PrintFeatureType,
        update_extrusion_offset: bool,
    );

    fn extruder_change(&mut self, next_extruder: u8);
}
