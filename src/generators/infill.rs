use crate::plan::{ExtruderPlan, FeatureExtrusion, FeatureKind, PrintFeatureType};
use crate::settings::Settings;
use crate::storage::SliceDataStorage;

use super::{extruder_plan_for, polyline_sequence, spaced_line_fill, FeatureGenerator, LayerContext};

///Generates the sparse infill lines of a mesh from its remaining infill
///area, one line every `infill_line_distance`, rotating the direction per
///layer.
pub struct MeshInfillGenerator {
    mesh_index: usize,
}

impl MeshInfillGenerator {
    pub fn new(mesh_index: usize) -> Self {
        Self { mesh_index }
    }
}

impl FeatureGenerator for MeshInfillGenerator {
    fn is_active(&self, _storage: &SliceDataStorage, settings: &Settings) -> bool {
        settings.infill_line_distance > 0.0
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
        let config = configs.config_for(PrintFeatureType::Infill);

        let angles = &mesh.settings.infill_angles;
        let angle = if angles.is_empty() {
            45.0
        } else {
            angles[layer.layer_index % angles.len()]
        };

        for part in &mesh_layer.parts {
            let mut feature = FeatureExtrusion::new(
                PrintFeatureType::Infill,
                config.line_width,
                FeatureKind::Mesh {
                    mesh_index: self.mesh_index,
                },
            );

            for line in
                spaced_line_fill(&part.infill_area, angle, settings.infill_line_distance)
            {
                if let Some(sequence) =
                    polyline_sequence(&line, config.line_width, config.speed_derivatives.speed)
                {
                    feature.append_sequence(sequence);
                }
            }

            if feature.is_empty() {
                continue;
            }
            if let Some(plan) =
                extruder_plan_for(extruder_plans, mesh.settings.infill_extruder_nr)
            {
                plan.append_feature(feature);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MeshSettings;
    use crate::storage::{LayerPart, MeshLayer, MeshStorage};
    use geo::{polygon, MultiPolygon};

    #[test]
    fn sparse_lines_follow_line_distance() {
        let mut part = LayerPart::default();
        part.infill_area = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 20.0, y: 0.0),
            (x: 20.0, y: 20.0),
            (x: 0.0, y: 20.0),
        ]]);

        let mut mesh = MeshStorage::new("cube", MeshSettings::default());
        mesh.settings.infill_angles = vec![0.0];
        mesh.layers.push(MeshLayer { parts: vec![part] });
        let storage = SliceDataStorage {
            meshes: vec![mesh],
            layers: vec![crate::storage::LayerInfo {
                z: 200,
                thickness: 200,
            }],
        };

        let mut settings = Settings::default();
        settings.infill_line_distance = 5.0;

        let generator = MeshInfillGenerator::new(0);
        let mut plans = vec![ExtruderPlan::new(0)];
        generator.generate(
            &storage,
            &settings,
            &LayerContext {
                layer_index: 0,
                z: 200,
                thickness: 200,
            },
            &mut plans,
        );

        let feature = plans[0].features().next().unwrap();
        // Rows every 5 mm across 20 mm.
        assert_eq!(feature.sequences().count(), 4);
    }

    #[test]
    fn zero_line_distance_disables_the_generator() {
        let mut settings = Settings::default();
        settings.infill_line_distance = 0.0;
        let generator = MeshInfillGenerator::new(0);
        assert!(!generator.is_active(&SliceDataStorage::default(), &settings));
    }
}
