use itertools::Itertools;

use crate::plan::{
    ContinuousExtruderMoveSequence, ExtruderPlan, ExtrusionMove, FeatureExtrusion, FeatureKind,
    PrintFeatureType,
};
use crate::settings::Settings;
use crate::storage::{ExtrusionLine, SliceDataStorage};

use super::{extruder_plan_for, FeatureGenerator, LayerContext};

///Turns the variable-width wall toolpaths of a mesh into wall feature
///extrusions, one feature per inset index.
pub struct MeshInsetsGenerator {
    mesh_index: usize,
}

impl MeshInsetsGenerator {
    pub fn new(mesh_index: usize) -> Self {
        Self { mesh_index }
    }

    fn sequence_from_line(
        line: &ExtrusionLine,
        configs: &crate::plan::GCodePathConfig,
    ) -> Option<ContinuousExtruderMoveSequence> {
        let first = line.junctions.first()?;
        let mut sequence = ContinuousExtruderMoveSequence::new(
            line.closed,
            crate::geometry::Point3::from_xy(first.position),
        );

        if line.closed {
            for (start, end) in line.junctions.iter().circular_tuple_windows() {
                if start.position == end.position {
                    continue;
                }
                sequence.append_extrusion_move(ExtrusionMove::with_widths(
                    crate::geometry::Point3::from_xy(end.position),
                    start.width,
                    end.width,
                    configs.speed_derivatives.speed,
                ));
            }
        } else {
            for (start, end) in line.junctions.iter().tuple_windows() {
                sequence.append_extrusion_move(ExtrusionMove::with_widths(
                    crate::geometry::Point3::from_xy(end.position),
                    start.width,
                    end.width,
                    configs.speed_derivatives.speed,
                ));
            }
        }

        (!sequence.is_empty()).then_some(sequence)
    }
}

impl FeatureGenerator for MeshInsetsGenerator {
    fn is_active(&self, storage: &SliceDataStorage, _settings: &Settings) -> bool {
        storage.meshes[self.mesh_index].settings.wall_line_count > 0
    }

    fn generate(
        &self,
        storage: &SliceDataStorage,
        settings: &Settings,
        layer: &LayerContext,
        extruder_plans: &mut [ExtruderPlan],
    ) {
        let mesh = &storage.meshes[self.mesh_index];
        let Some(mesh_layer) = mesh.layers.get(layer.layer_index) else {
            return;
        };

        let configs = settings.path_configs(layer.layer_index);

        for part in &mesh_layer.parts {
            // One feature per inset depth present in the toolpaths.
            let mut features: Vec<FeatureExtrusion> = Vec::new();

            for line in &part.wall_toolpaths {
                if line.is_empty() {
                    continue;
                }

                let feature_type = if line.inset_index == 0 {
                    PrintFeatureType::OuterWall
                } else {
                    PrintFeatureType::InnerWall
                };
                let config = configs.config_for(feature_type);

                let Some(sequence) = Self::sequence_from_line(line, config) else {
                    continue;
                };

                let feature_position = features
                    .iter()
                    .position(|feature| feature.kind().inset_index() == Some(line.inset_index));
                let feature = match feature_position {
                    Some(position) => &mut features[position],
                    None => {
                        features.push(FeatureExtrusion::new(
                            feature_type,
                            config.line_width,
                            FeatureKind::Wall {
                                mesh_index: self.mesh_index,
                                inset_index: line.inset_index,
                            },
                        ));
                        features.last_mut().expect("a feature was just pushed")
                    }
                };
                feature.append_sequence(sequence);
            }

            for feature in features {
                let extruder_nr = if feature.feature_type() == PrintFeatureType::OuterWall {
                    mesh.settings.wall_0_extruder_nr
                } else {
                    mesh.settings.wall_x_extruder_nr
                };
                if let Some(plan) = extruder_plan_for(extruder_plans, extruder_nr) {
                    plan.append_feature(feature);
                }
            }
        }
    }
}
