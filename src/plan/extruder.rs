use crate::export::PlanExporter;
use crate::geometry::Point3;

use super::feature::FeatureExtrusion;
use super::layer::LayerPlan;
use super::moves::TravelRoute;
use super::operation::{OperationMut, OperationRef, PrintOperationSequence};

///A child of an extruder plan.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtruderOperation {
    Feature(FeatureExtrusion),
    Travel(TravelRoute),
}

impl ExtruderOperation {
    pub fn find_start_position(&self) -> Option<Point3> {
        match self {
            ExtruderOperation::Feature(feature) => feature.find_start_position(),
            ExtruderOperation::Travel(route) => route.find_start_position(),
        }
    }

    pub fn find_end_position(&self) -> Option<Point3> {
        match self {
            ExtruderOperation::Feature(feature) => feature.find_end_position(),
            ExtruderOperation::Travel(route) => route.find_end_position(),
        }
    }
}

///Everything one extruder prints within a layer: feature extrusions plus
///the travels stitched between them. All features of a plan use the same
///extruder.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtruderPlan {
    extruder_nr: u8,
    operations: Vec<ExtruderOperation>,
}

impl ExtruderPlan {
    pub fn new(extruder_nr: u8) -> Self {
        Self {
            extruder_nr,
            operations: Vec::new(),
        }
    }

    pub fn extruder_nr(&self) -> u8 {
        self.extruder_nr
    }

    pub fn operations(&self) -> &[ExtruderOperation] {
        &self.operations
    }

    pub fn operations_mut(&mut self) -> &mut Vec<ExtruderOperation> {
        &mut self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn append_feature(&mut self, feature: FeatureExtrusion) {
        self.operations.push(ExtruderOperation::Feature(feature));
    }

    pub fn features(&self) -> impl Iterator<Item = &FeatureExtrusion> {
        self.operations.iter().filter_map(|operation| match operation {
            ExtruderOperation::Feature(feature) => Some(feature),
            ExtruderOperation::Travel(_) => None,
        })
    }

    pub fn features_mut(&mut self) -> impl Iterator<Item = &mut FeatureExtrusion> {
        self.operations
            .iter_mut()
            .filter_map(|operation| match operation {
                ExtruderOperation::Feature(feature) => Some(feature),
                ExtruderOperation::Travel(_) => None,
            })
    }

    ///Take the features out for reordering, leaving the plan empty.
    pub fn take_features(&mut self) -> Vec<FeatureExtrusion> {
        std::mem::take(&mut self.operations)
            .into_iter()
            .filter_map(|operation| match operation {
                ExtruderOperation::Feature(feature) => Some(feature),
                ExtruderOperation::Travel(_) => None,
            })
            .collect()
    }

    pub fn set_features(&mut self, features: Vec<FeatureExtrusion>) {
        self.operations = features
            .into_iter()
            .map(ExtruderOperation::Feature)
            .collect();
    }

    pub fn find_start_position(&self) -> Option<Point3> {
        self.operations
            .iter()
            .find_map(ExtruderOperation::find_start_position)
    }

    pub fn find_end_position(&self) -> Option<Point3> {
        self.operations
            .iter()
            .rev()
            .find_map(ExtruderOperation::find_end_position)
    }

    pub fn write(&self, exporter: &mut dyn PlanExporter, layer: &LayerPlan) {
        for operation in &self.operations {
            match operation {
                ExtruderOperation::Feature(feature) => {
                    feature.write(exporter, layer, self.extruder_nr);
                }
                ExtruderOperation::Travel(route) => route.write(exporter, layer.z()),
            }
        }
    }
}

impl PrintOperationSequence for ExtruderPlan {
    fn child_refs(&self) -> Vec<OperationRef<'_>> {
        self.operations
            .iter()
            .map(|operation| match operation {
                ExtruderOperation::Feature(feature) => OperationRef::FeatureExtrusion(feature),
                ExtruderOperation::Travel(route) => OperationRef::TravelRoute(route),
            })
            .collect()
    }

    fn child_muts(&mut self) -> Vec<OperationMut<'_>> {
        self.operations
            .iter_mut()
            .map(|operation| match operation {
                ExtruderOperation::Feature(feature) => OperationMut::FeatureExtrusion(feature),
                ExtruderOperation::Travel(route) => OperationMut::TravelRoute(route),
            })
            .collect()
    }
}
