use crate::export::PlanExporter;
use crate::geometry::{Micron, Point3};

use super::layer::LayerPlan;
use super::moves::TravelRoute;
use super::operation::{OperationMut, OperationRef, PrintOperationSequence};
use super::sequence::ContinuousExtruderMoveSequence;
use super::PrintFeatureType;

///What produced a feature extrusion, and the extra attributes that come
///with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureKind {
    ///Not tied to a mesh, e.g. skirt/brim or prime tower.
    Plain,
    ///Extruded for a mesh; the index points into the sliced storage.
    Mesh { mesh_index: usize },
    ///A wall of a mesh at a given inset depth, 0 being the outer wall.
    Wall { mesh_index: usize, inset_index: usize },
}

impl FeatureKind {
    pub fn mesh_index(&self) -> Option<usize> {
        match self {
            FeatureKind::Plain => None,
            FeatureKind::Mesh { mesh_index } | FeatureKind::Wall { mesh_index, .. } => {
                Some(*mesh_index)
            }
        }
    }

    pub fn inset_index(&self) -> Option<usize> {
        match self {
            FeatureKind::Wall { inset_index, .. } => Some(*inset_index),
            _ => None,
        }
    }
}

///A child of a feature extrusion.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureOperation {
    Sequence(ContinuousExtruderMoveSequence),
    Travel(TravelRoute),
}

impl FeatureOperation {
    pub fn find_start_position(&self) -> Option<Point3> {
        match self {
            FeatureOperation::Sequence(sequence) => sequence.find_start_position(),
            FeatureOperation::Travel(route) => route.find_start_position(),
        }
    }

    pub fn find_end_position(&self) -> Option<Point3> {
        match self {
            FeatureOperation::Sequence(sequence) => sequence.find_end_position(),
            FeatureOperation::Travel(route) => route.find_end_position(),
        }
    }
}

///All moves realising one print feature at one layer: the move sequences
///plus the travels stitched between them.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureExtrusion {
    feature_type: PrintFeatureType,
    line_width: Micron,
    kind: FeatureKind,
    operations: Vec<FeatureOperation>,
}

impl FeatureExtrusion {
    pub fn new(feature_type: PrintFeatureType, line_width: Micron, kind: FeatureKind) -> Self {
        Self {
            feature_type,
            line_width,
            kind,
            operations: Vec::new(),
        }
    }

    pub fn feature_type(&self) -> PrintFeatureType {
        self.feature_type
    }

    pub fn line_width(&self) -> Micron {
        self.line_width
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn operations(&self) -> &[FeatureOperation] {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut Vec<FeatureOperation> {
        &mut self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn append_sequence(&mut self, sequence: ContinuousExtruderMoveSequence) {
        self.operations.push(FeatureOperation::Sequence(sequence));
    }

    pub fn sequences(&self) -> impl Iterator<Item = &ContinuousExtruderMoveSequence> {
        self.operations.iter().filter_map(|operation| match operation {
            FeatureOperation::Sequence(sequence) => Some(sequence),
            FeatureOperation::Travel(_) => None,
        })
    }

    ///Take the move sequences out, leaving the feature empty. The
    ///schedulers use this to reorder and hand the sequences back through
    ///`set_sequences`.
    pub fn take_sequences(&mut self) -> Vec<ContinuousExtruderMoveSequence> {
        std::mem::take(&mut self.operations)
            .into_iter()
            .filter_map(|operation| match operation {
                FeatureOperation::Sequence(sequence) => Some(sequence),
                FeatureOperation::Travel(_) => None,
            })
            .collect()
    }

    pub fn set_sequences(&mut self, sequences: Vec<ContinuousExtruderMoveSequence>) {
        self.operations = sequences
            .into_iter()
            .map(FeatureOperation::Sequence)
            .collect();
    }

    pub fn find_start_position(&self) -> Option<Point3> {
        self.operations
            .iter()
            .find_map(FeatureOperation::find_start_position)
    }

    pub fn find_end_position(&self) -> Option<Point3> {
        self.operations
            .iter()
            .rev()
            .find_map(FeatureOperation::find_end_position)
    }

    pub fn write(&self, exporter: &mut dyn PlanExporter, layer: &LayerPlan, extruder_nr: u8) {
        for operation in &self.operations {
            match operation {
                FeatureOperation::Sequence(sequence) => {
                    sequence.write(exporter, layer, extruder_nr, self.feature_type);
                }
                FeatureOperation::Travel(route) => route.write(exporter, layer.z()),
            }
        }
    }
}

impl PrintOperationSequence for FeatureExtrusion {
    fn child_refs(&self) -> Vec<OperationRef<'_>> {
        self.operations
            .iter()
            .map(|operation| match operation {
                FeatureOperation::Sequence(sequence) => OperationRef::Sequence(sequence),
                FeatureOperation::Travel(route) => OperationRef::TravelRoute(route),
            })
            .collect()
    }

    fn child_muts(&mut self) -> Vec<OperationMut<'_>> {
        self.operations
            .iter_mut()
            .map(|operation| match operation {
                FeatureOperation::Sequence(sequence) => OperationMut::Sequence(sequence),
                FeatureOperation::Travel(route) => OperationMut::TravelRoute(route),
            })
            .collect()
    }
}
