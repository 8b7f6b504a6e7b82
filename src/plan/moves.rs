use crate::export::PlanExporter;
use crate::geometry::{Micron, Point3, Ratio, SpeedDerivatives, Velocity};

use super::operation::{OperationMut, OperationRef, PrintOperationSequence};
use super::PrintFeatureType;

///A travel target. The start of the move is wherever the previous move
///ended; Z is relative to the owning layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TravelMove {
    pub position: Point3,
}

impl TravelMove {
    pub fn new(position: Point3) -> Self {
        Self { position }
    }
}

///A move that deposits material on its way to `position`. The line width
///may vary over the move; Z is relative to the owning layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtrusionMove {
    pub position: Point3,
    pub line_width_start: Micron,
    pub line_width_end: Micron,
    pub speed: Velocity,
    pub flow_ratio: Ratio,
}

impl ExtrusionMove {
    pub fn new(position: Point3, line_width: Micron, speed: Velocity) -> Self {
        Self {
            position,
            line_width_start: line_width,
            line_width_end: line_width,
            speed,
            flow_ratio: Ratio(1.0),
        }
    }

    pub fn with_widths(
        position: Point3,
        line_width_start: Micron,
        line_width_end: Micron,
        speed: Velocity,
    ) -> Self {
        Self {
            position,
            line_width_start,
            line_width_end,
            speed,
            flow_ratio: Ratio(1.0),
        }
    }
}

///A travel between two scheduled pieces of work: one or more travel
///targets printed at travel speed.
#[derive(Clone, Debug, PartialEq)]
pub struct TravelRoute {
    pub feature_type: PrintFeatureType,
    pub speed: SpeedDerivatives,
    pub moves: Vec<TravelMove>,
}

impl TravelRoute {
    pub fn new(feature_type: PrintFeatureType, speed: SpeedDerivatives) -> Self {
        Self {
            feature_type,
            speed,
            moves: Vec::new(),
        }
    }

    pub fn append(&mut self, travel_move: TravelMove) {
        self.moves.push(travel_move);
    }

    pub fn find_start_position(&self) -> Option<Point3> {
        self.moves.first().map(|travel_move| travel_move.position)
    }

    pub fn find_end_position(&self) -> Option<Point3> {
        self.moves.last().map(|travel_move| travel_move.position)
    }

    pub fn write(&self, exporter: &mut dyn PlanExporter, layer_z: Micron) {
        for travel_move in &self.moves {
            let mut position = travel_move.position;
            position.z += layer_z;
            exporter.travel(position, self.speed.speed, self.feature_type);
        }
    }
}

impl PrintOperationSequence for TravelRoute {
    fn child_refs(&self) -> Vec<OperationRef<'_>> {
        self.moves.iter().map(OperationRef::TravelMove).collect()
    }

    fn child_muts(&mut self) -> Vec<OperationMut<'_>> {
        self.moves.iter_mut().map(OperationMut::TravelMove).collect()
    }
}

///A switch from one extruder to another, sitting between the two extruder
///plans it separates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtruderChange {
    pub previous_extruder: u8,
    pub next_extruder: u8,
}

impl ExtruderChange {
    pub fn new(previous_extruder: u8, next_extruder: u8) -> Self {
        Self {
            previous_extruder,
            next_extruder,
        }
    }

    pub fn write(&self, exporter: &mut dyn PlanExporter) {
        exporter.extruder_change(self.next_extruder);
    }
}
