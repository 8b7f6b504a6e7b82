use std::sync::Arc;

use crate::export::PlanExporter;
use crate::geometry::{Micron, Point3};

use super::config::PathConfigStorage;
use super::extruder::ExtruderPlan;
use super::moves::{ExtruderChange, TravelRoute};
use super::operation::{search_depth, OperationMut, OperationRef, PrintOperationSequence};
use super::sequence::ContinuousExtruderMoveSequence;
use super::SearchOrder;

///A child of a layer plan. Between two extruder plans with different
///extruder numbers sits exactly one extruder change.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerOperation {
    ExtruderPlan(ExtruderPlan),
    ExtruderChange(ExtruderChange),
    Travel(TravelRoute),
}

impl LayerOperation {
    pub fn find_start_position(&self) -> Option<Point3> {
        match self {
            LayerOperation::ExtruderPlan(plan) => plan.find_start_position(),
            LayerOperation::ExtruderChange(_) => None,
            LayerOperation::Travel(route) => route.find_start_position(),
        }
    }

    pub fn find_end_position(&self) -> Option<Point3> {
        match self {
            LayerOperation::ExtruderPlan(plan) => plan.find_end_position(),
            LayerOperation::ExtruderChange(_) => None,
            LayerOperation::Travel(route) => route.find_end_position(),
        }
    }
}

///All work at one Z level: the extruder plans, the changes between them
///and the travels stitching them together.
#[derive(Clone, Debug)]
pub struct LayerPlan {
    layer_index: usize,
    z: Micron,
    thickness: Micron,
    configs: Arc<PathConfigStorage>,
    operations: Vec<LayerOperation>,
}

impl LayerPlan {
    pub fn new(
        layer_index: usize,
        z: Micron,
        thickness: Micron,
        configs: Arc<PathConfigStorage>,
    ) -> Self {
        Self {
            layer_index,
            z,
            thickness,
            configs,
            operations: Vec::new(),
        }
    }

    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    pub fn z(&self) -> Micron {
        self.z
    }

    pub fn thickness(&self) -> Micron {
        self.thickness
    }

    pub fn configs(&self) -> &PathConfigStorage {
        &self.configs
    }

    pub fn operations(&self) -> &[LayerOperation] {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut Vec<LayerOperation> {
        &mut self.operations
    }

    ///Append an extruder plan, skipping empty ones unless told otherwise.
    pub fn append_extruder_plan(&mut self, extruder_plan: ExtruderPlan, keep_empty: bool) {
        if keep_empty || !extruder_plan.is_empty() {
            self.operations
                .push(LayerOperation::ExtruderPlan(extruder_plan));
        }
    }

    pub fn extruder_plans(&self) -> impl Iterator<Item = &ExtruderPlan> {
        self.operations.iter().filter_map(|operation| match operation {
            LayerOperation::ExtruderPlan(plan) => Some(plan),
            _ => None,
        })
    }

    pub fn extruder_plans_mut(&mut self) -> impl Iterator<Item = &mut ExtruderPlan> {
        self.operations
            .iter_mut()
            .filter_map(|operation| match operation {
                LayerOperation::ExtruderPlan(plan) => Some(plan),
                _ => None,
            })
    }

    ///The absolute position of a point of a sequence in this layer: the
    ///relative Z plus the layer Z plus the sequence's own offset.
    pub fn absolute_position(
        &self,
        sequence: &ContinuousExtruderMoveSequence,
        relative_position: Point3,
    ) -> Point3 {
        let mut absolute = relative_position;
        absolute.z += self.z + sequence.z_offset();
        absolute
    }

    ///Where the nozzle starts on this layer: the start of the first move
    ///sequence anywhere below this plan, as an absolute position.
    pub fn find_extruder_start_position(&self) -> Option<Point3> {
        let sequence = self.find_by_type::<ContinuousExtruderMoveSequence, _>(
            SearchOrder::Forward,
            search_depth::FULL,
            |_| true,
        )?;
        let start = sequence.find_start_position()?;
        Some(self.absolute_position(sequence, start))
    }

    pub fn find_start_position(&self) -> Option<Point3> {
        self.operations
            .iter()
            .find_map(LayerOperation::find_start_position)
    }

    pub fn find_end_position(&self) -> Option<Point3> {
        self.operations
            .iter()
            .rev()
            .find_map(LayerOperation::find_end_position)
    }

    ///Emit the layer: a layer-start event, the children in order, then a
    ///layer-end event.
    pub fn write(&self, exporter: &mut dyn PlanExporter) {
        let start_position = self.find_extruder_start_position().unwrap_or_default();
        exporter.layer_start(self.layer_index, start_position);

        for operation in &self.operations {
            match operation {
                LayerOperation::ExtruderPlan(plan) => plan.write(exporter, self),
                LayerOperation::ExtruderChange(change) => change.write(exporter),
                LayerOperation::Travel(route) => route.write(exporter, self.z),
            }
        }

        exporter.layer_end(self.layer_index, self.z, self.thickness);
    }
}

impl PrintOperationSequence for LayerPlan {
    fn child_refs(&self) -> Vec<OperationRef<'_>> {
        self.operations
            .iter()
            .map(|operation| match operation {
                LayerOperation::ExtruderPlan(plan) => OperationRef::ExtruderPlan(plan),
                LayerOperation::ExtruderChange(change) => OperationRef::ExtruderChange(change),
                LayerOperation::Travel(route) => OperationRef::TravelRoute(route),
            })
            .collect()
    }

    fn child_muts(&mut self) -> Vec<OperationMut<'_>> {
        self.operations
            .iter_mut()
            .map(|operation| match operation {
                LayerOperation::ExtruderPlan(plan) => OperationMut::ExtruderPlan(plan),
                LayerOperation::ExtruderChange(change) => OperationMut::ExtruderChange(change),
                LayerOperation::Travel(route) => OperationMut::TravelRoute(route),
            })
            .collect()
    }
}
