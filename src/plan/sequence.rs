use crate::export::PlanExporter;
use crate::geometry::{micron_to_mm, Micron, Point3};

use super::layer::LayerPlan;
use super::moves::{ExtrusionMove, TravelMove};
use super::operation::{OperationMut, OperationRef, PrintOperationSequence};
use super::PrintFeatureType;

///A single move inside a continuous sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SequenceMove {
    Extrusion(ExtrusionMove),
    Travel(TravelMove),
}

impl SequenceMove {
    pub fn position(&self) -> Point3 {
        match self {
            SequenceMove::Extrusion(extrusion) => extrusion.position,
            SequenceMove::Travel(travel) => travel.position,
        }
    }

    fn set_position(&mut self, position: Point3) {
        match self {
            SequenceMove::Extrusion(extrusion) => extrusion.position = position,
            SequenceMove::Travel(travel) => travel.position = position,
        }
    }
}

///An uninterrupted run of extruder moves: a closed polygon or an open
///polyline. Moves store their end point; the start of each move is the end
///of the previous one, and the first starts at `start_position`. A closed
///sequence's last move ends back at the start.
///
///All Z coordinates are relative; the sequence-wide `z_offset` is added on
///top of the layer Z on emission.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuousExtruderMoveSequence {
    closed: bool,
    start_position: Point3,
    z_offset: Micron,
    moves: Vec<SequenceMove>,
}

impl ContinuousExtruderMoveSequence {
    pub fn new(closed: bool, start_position: Point3) -> Self {
        Self {
            closed,
            start_position,
            z_offset: 0,
            moves: Vec::new(),
        }
    }

    pub fn open(start_position: Point3) -> Self {
        Self::new(false, start_position)
    }

    pub fn closed(start_position: Point3) -> Self {
        Self::new(true, start_position)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn z_offset(&self) -> Micron {
        self.z_offset
    }

    pub fn set_z_offset(&mut self, z_offset: Micron) {
        self.z_offset = z_offset;
    }

    pub fn append_extrusion_move(&mut self, extrusion_move: ExtrusionMove) {
        self.moves.push(SequenceMove::Extrusion(extrusion_move));
    }

    pub fn append_travel_move(&mut self, travel_move: TravelMove) {
        self.moves.push(SequenceMove::Travel(travel_move));
    }

    pub fn moves(&self) -> &[SequenceMove] {
        &self.moves
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn find_start_position(&self) -> Option<Point3> {
        Some(self.start_position)
    }

    pub fn find_end_position(&self) -> Option<Point3> {
        self.moves
            .last()
            .map(SequenceMove::position)
            .or(Some(self.start_position))
    }

    ///The candidate start points of this sequence: every vertex for a
    ///closed sequence, the two endpoints for an open one.
    pub fn vertices(&self) -> Vec<Point3> {
        if self.closed {
            self.moves.iter().map(SequenceMove::position).collect()
        } else {
            let mut endpoints = vec![self.start_position];
            if let Some(last) = self.moves.last() {
                endpoints.push(last.position());
            }
            endpoints
        }
    }

    ///Rotate a closed sequence so that it ends with the move at
    ///`move_index`, which makes that move's end point the new seam.
    ///Does nothing on open sequences.
    pub fn reorder_to_end_with(&mut self, move_index: usize) {
        if !self.closed || move_index >= self.moves.len() {
            return;
        }

        self.start_position = self.moves[move_index].position();
        let len = self.moves.len();
        self.moves.rotate_left((move_index + 1) % len);
    }

    ///Flip an open sequence end-to-start. Per-move attributes stay with
    ///their segment; start and end widths of each move swap. Does nothing
    ///on closed sequences.
    pub fn reverse(&mut self) {
        if self.closed || self.moves.is_empty() {
            return;
        }

        let old_start = self.start_position;
        let positions: Vec<Point3> = self.moves.iter().map(SequenceMove::position).collect();

        self.start_position = *positions.last().expect("sequence has moves");
        self.moves.reverse();

        // After the reversal, move i covers the segment that ended where
        // move i started; re-target every move at its segment's old start.
        let move_count = self.moves.len();
        for (index, sequence_move) in self.moves.iter_mut().enumerate() {
            let new_target = if index == move_count - 1 {
                old_start
            } else {
                positions[move_count - 2 - index]
            };
            sequence_move.set_position(new_target);

            if let SequenceMove::Extrusion(extrusion) = sequence_move {
                std::mem::swap(
                    &mut extrusion.line_width_start,
                    &mut extrusion.line_width_end,
                );
            }
        }
    }

    pub fn write(
        &self,
        exporter: &mut dyn PlanExporter,
        layer: &LayerPlan,
        extruder_nr: u8,
        feature_type: PrintFeatureType,
    ) {
        let travel_speed = layer.configs().travel.speed;

        for sequence_move in &self.moves {
            match sequence_move {
                SequenceMove::Extrusion(extrusion) => {
                    let position = layer.absolute_position(self, extrusion.position);
                    // The relative Z raises or lowers the deposited line.
                    let line_thickness = layer.thickness() + extrusion.position.z;
                    let mm3_per_mm = micron_to_mm(extrusion.line_width_start)
                        * micron_to_mm(line_thickness)
                        * extrusion.flow_ratio.0;
                    exporter.extrusion(
                        position,
                        extrusion.speed,
                        extruder_nr,
                        mm3_per_mm,
                        extrusion.line_width_start,
                        line_thickness,
                        feature_type,
                        false,
                    );
                }
                SequenceMove::Travel(travel) => {
                    let position = layer.absolute_position(self, travel.position);
                    exporter.travel(position, travel_speed, PrintFeatureType::MoveCombing);
                }
            }
        }
    }
}

impl PrintOperationSequence for ContinuousExtruderMoveSequence {
    fn child_refs(&self) -> Vec<OperationRef<'_>> {
        self.moves
            .iter()
            .map(|sequence_move| match sequence_move {
                SequenceMove::Extrusion(extrusion) => OperationRef::ExtrusionMove(extrusion),
                SequenceMove::Travel(travel) => OperationRef::TravelMove(travel),
            })
            .collect()
    }

    fn child_muts(&mut self) -> Vec<OperationMut<'_>> {
        self.moves
            .iter_mut()
            .map(|sequence_move| match sequence_move {
                SequenceMove::Extrusion(extrusion) => OperationMut::ExtrusionMove(extrusion),
                SequenceMove::Travel(travel) => OperationMut::TravelMove(travel),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Velocity;

    fn open_sequence() -> ContinuousExtruderMoveSequence {
        let mut sequence = ContinuousExtruderMoveSequence::open(Point3::new(0, 0, 0));
        sequence.append_extrusion_move(ExtrusionMove::with_widths(
            Point3::new(1_000, 0, 0),
            400,
            500,
            Velocity(30.0),
        ));
        sequence.append_extrusion_move(ExtrusionMove::with_widths(
            Point3::new(2_000, 500, 0),
            500,
            400,
            Velocity(30.0),
        ));
        sequence
    }

    fn closed_square() -> ContinuousExtruderMoveSequence {
        let mut sequence = ContinuousExtruderMoveSequence::closed(Point3::new(0, 0, 0));
        for position in [
            Point3::new(1_000, 0, 0),
            Point3::new(1_000, 1_000, 0),
            Point3::new(0, 1_000, 0),
            Point3::new(0, 0, 0),
        ] {
            sequence.append_extrusion_move(ExtrusionMove::new(position, 400, Velocity(30.0)));
        }
        sequence
    }

    #[test]
    fn reverse_is_an_involution() {
        let original = open_sequence();
        let mut sequence = original.clone();
        sequence.reverse();
        assert_eq!(sequence.find_start_position(), Some(Point3::new(2_000, 500, 0)));
        assert_eq!(sequence.find_end_position(), Some(Point3::new(0, 0, 0)));
        sequence.reverse();
        assert_eq!(sequence, original);
    }

    #[test]
    fn reverse_swaps_segment_widths() {
        let mut sequence = open_sequence();
        sequence.reverse();
        match sequence.moves()[0] {
            SequenceMove::Extrusion(extrusion) => {
                // The last segment of the original, traversed backwards.
                assert_eq!(extrusion.position, Point3::new(1_000, 0, 0));
                assert_eq!(extrusion.line_width_start, 400);
                assert_eq!(extrusion.line_width_end, 500);
            }
            SequenceMove::Travel(_) => panic!("expected an extrusion move"),
        }
    }

    #[test]
    fn reorder_keeps_segment_multiset() {
        let original = closed_square();
        let original_positions: std::collections::HashSet<_> = original
            .moves()
            .iter()
            .map(|sequence_move| sequence_move.position())
            .collect();

        for move_index in 0..4 {
            let mut sequence = closed_square();
            sequence.reorder_to_end_with(move_index);
            let positions: std::collections::HashSet<_> = sequence
                .moves()
                .iter()
                .map(|sequence_move| sequence_move.position())
                .collect();
            assert_eq!(positions, original_positions);
            // The new start is the reorder target's position.
            assert_eq!(
                sequence.find_start_position(),
                Some(original.moves()[move_index].position())
            );
            // The loop still closes on itself.
            assert_eq!(sequence.find_start_position(), sequence.find_end_position());
        }
    }

    #[test]
    fn reorder_ignores_open_sequences() {
        let mut sequence = open_sequence();
        let before = sequence.clone();
        sequence.reorder_to_end_with(1);
        assert_eq!(sequence, before);
    }
}
