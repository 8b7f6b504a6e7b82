use std::collections::BTreeMap;

use crate::geometry::{Duration, Micron, Point3, Velocity};
use crate::plan::PrintFeatureType;

use super::PlanExporter;

///Accumulates per-feature print durations and per-extruder filament
///volumes by integrating over the distance between consecutive events.
#[derive(Default)]
pub struct ConsumptionEstimationExporter {
    durations: BTreeMap<PrintFeatureType, Duration>,
    extrusion_amounts: BTreeMap<u8, f64>,
    last_position: Option<Point3>,
}

impl ConsumptionEstimationExporter {
    pub fn new() -> Self {
        Self::default()
    }

    ///Accumulated durations in seconds, per feature type.
    pub fn durations(&self) -> &BTreeMap<PrintFeatureType, Duration> {
        &self.durations
    }

    ///Accumulated extruded volume in mm³, per extruder.
    pub fn extrusion_amounts(&self) -> &BTreeMap<u8, f64> {
        &self.extrusion_amounts
    }

    fn distance_to_last_mm(&self, position: Point3) -> Option<f64> {
        self.last_position
            .map(|last_position| (position - last_position).vsize_mm())
    }

    fn add_duration(&mut self, distance_mm: Option<f64>, speed: Velocity, feature: PrintFeatureType) {
        if let Some(distance_mm) = distance_mm {
            let duration = speed.duration_for(distance_mm);
            *self.durations.entry(feature).or_default() += duration;
        }
    }
}

impl PlanExporter for ConsumptionEstimationExporter {
    fn layer_start(&mut self, _layer_index: usize, _start_position: Point3) {}

    fn layer_end(&mut self, _layer_index: usize, _z: Micron, _thickness: Micron) {}

    fn travel(&mut self, position: Point3, speed: Velocity, feature_type: PrintFeatureType) {
        let distance = self.distance_to_last_mm(position);
        self.add_duration(distance, speed, feature_type);
        self.last_position = Some(position);
    }

    fn extrusion(
        &mut self,
        position: Point3,
        speed: Velocity,
        extruder_nr: u8,
        mm3_per_mm: f64,
        _line_width: Micron,
        _line_thickness: Micron,
        feature_type: PrintFeatureType,
        _update_extrusion_offset: bool,
    ) {
        let distance = self.distance_to_last_mm(position);
        self.add_duration(distance, speed, feature_type);

        if let Some(distance) = distance {
            *self.extrusion_amounts.entry(extruder_nr).or_default() += distance * mm3_per_mm;
        }

        self.last_position = Some(position);
    }

    fn extruder_change(&mut self, _next_extruder: u8) {}
}
