use crate::geometry::{Micron, Point3, Velocity};
use crate::plan::PrintFeatureType;

use super::PlanExporter;

///Forwards every event to a set of exporters, in registration order.
#[derive(Default)]
pub struct MultiExporter<'a> {
    exporters: Vec<&'a mut dyn PlanExporter>,
}

impl<'a> MultiExporter<'a> {
    pub fn new() -> Self {
        Self {
            exporters: Vec::new(),
        }
    }

    pub fn append(&mut self, exporter: &'a mut dyn PlanExporter) {
        self.exporters.push(exporter);
    }
}

impl PlanExporter for MultiExporter<'_> {
    fn layer_start(&mut self, layer_index: usize, start_position: Point3) {
        for exporter in self.exporters.iter_mut() {
            exporter.layer_start(layer_index, start_position);
        }
    }

    fn layer_end(&mut self, layer_index: usize, z: Micron, thickness: Micron) {
        for exporter in self.exporters.iter_mut() {
            exporter.layer_end(layer_index, z, thickness);
        }
    }

    fn travel(&mut self, position: Point3, speed: Velocity, feature_type: PrintFeatureType) {
        for exporter in self.exporters.iter_mut() {
            exporter.travel(position, speed, feature_type);
        }
    }

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
    ) {
        for exporter in self.exporters.iter_mut() {
            exporter.extrusion(
                position,
                speed,
                extruder_nr,
                mm3_per_mm,
                line_width,
                line_thickness,
                feature_type,
                update_extrusion_offset,
            );
        }
    }

    fn extruder_change(&mut self, next_extruder: u8) {
        for exporter in self.exporters.iter_mut() {
            exporter.extruder_change(next_extruder);
        }
    }
}
