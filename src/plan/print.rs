use std::collections::BTreeSet;

use crate::export::PlanExporter;

use super::extruder::ExtruderPlan;
use super::layer::LayerPlan;
use super::operation::{OperationMut, OperationRef, PrintOperationSequence};
use super::SearchOrder;

///The whole print: layer plans in strictly increasing layer order.
#[derive(Clone, Debug, Default)]
pub struct PrintPlan {
    layers: Vec<LayerPlan>,
}

impl PrintPlan {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn append_layer(&mut self, layer: LayerPlan) {
        debug_assert!(
            self.layers
                .last()
                .map_or(true, |last| last.layer_index() < layer.layer_index()),
            "layer plans must be appended in increasing layer order"
        );
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[LayerPlan] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut Vec<LayerPlan> {
        &mut self.layers
    }

    ///Every extruder that has a plan anywhere in the print.
    pub fn calculate_used_extruders(&self) -> BTreeSet<u8> {
        self.find_all_by_type::<ExtruderPlan>(SearchOrder::Forward, Some(1))
            .into_iter()
            .map(|plan| plan.extruder_nr())
            .collect()
    }

    pub fn write(&self, exporter: &mut dyn PlanExporter) {
        for layer in &self.layers {
            layer.write(exporter);
        }
    }
}

impl PrintOperationSequence for PrintPlan {
    fn child_refs(&self) -> Vec<OperationRef<'_>> {
        self.layers.iter().map(OperationRef::LayerPlan).collect()
    }

    fn child_muts(&mut self) -> Vec<OperationMut<'_>> {
        self.layers.iter_mut().map(OperationMut::LayerPlan).collect()
    }
}
