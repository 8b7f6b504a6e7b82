use geo::MultiPolygon;

use crate::geometry::micron_to_mm;
use crate::plan::{ExtruderPlan, FeatureExtrusion, FeatureKind, PrintFeatureType};
use crate::settings::Settings;
use crate::storage::SliceDataStorage;

use super::{extruder_plan_for, polyline_sequence, spaced_line_fill, FeatureGenerator, LayerContext};

///Generates the roofing and top/bottom skin lines of a mesh. Each skin
///area is swept with solid lines at the per-layer skin angle; every line
///is its own move sequence so the scheduler can order them monotonically.
pub struct MeshSkinGenerator {
    mesh_index: usize,
}

impl MeshSkinGenerator {
    pub fn new(mesh_index: usize) -> Self {
        Self { mesh_index }
    }

    fn angle_for(angles: &[f64], layer_index: usize) -> f64 {
        if angles.is_empty() {
            45.0
        } else {
            angles[layer_index % angles.len()]
        }
    }

    fn skin_feature(
        &self,
        area: &MultiPolygon<f64>,
        angle: f64,
        feature_type: PrintFeatureType,
        configs: &crate::plan::PathConfigStorage,
    ) -> Option<FeatureExtrusion> {
        let config = configs.config_for(feature_type);
        // Solid skin: lines one line width apart.
        let spacing = micron_to_mm(config.line_width);

        let mut feature = FeatureExtrusion::new(
            feature_type,
            config.line_width,
            FeatureKind::Mesh {
                mesh_index: self.mesh_index,
            },
        );
        for line in spaced_line_fill(area, angle, spacing) {
            if let Some(sequence) =
                polyline_sequence(&line, config.line_width, config.speed_derivatives.speed)
            {
                feature.append_sequence(sequence);
            }
        }

        (!feature.is_empty()).then_some(feature)
    }
}

impl FeatureGenerator for MeshSkinGenerator {
    fn is_active(&self, storage: &SliceDataStorage, _settings: &Settings) -> bool {
        storage.meshes[self.mesh_index]
            .layers
            .iter()
            .any(|layer| layer.parts.iter().any(|part| !part.skin_parts.is_empty()))
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
        let roofing_angle = Self::angle_for(&mesh.settings.roofing_angles, layer.layer_index);
        let skin_angle = Self::angle_for(&mesh.settings.skin_angles, layer.layer_index);

        for part in &mesh_layer.parts {
            for skin_part in &part.skin_parts {
                let mut features = Vec::new();
                if let Some(roofing) = self.skin_feature(
                    &skin_part.roofing_area,
                    roofing_angle,
                    PrintFeatureType::Roof,
                    &configs,
                ) {
                    features.push(roofing);
                }
                if let Some(top_bottom) = self.skin_feature(
                    &skin_part.top_bottom_area,
                    skin_angle,
                    PrintFeatureType::Skin,
                    &configs,
                ) {
                    features.push(top_bottom);
                }

                if let Some(plan) =
                    extruder_plan_for(extruder_plans, mesh.settings.skin_extruder_nr)
                {
                    for feature in features {
                        plan.append_feature(feature);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MeshSettings;
    use crate::storage::{LayerPart, MeshLayer, MeshStorage, SkinPart};
    use geo::polygon;

    fn storage_with_roof() -> SliceDataStorage {
        let roof_area = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ]]);

        let mut part = LayerPart::default();
        part.skin_parts.push(SkinPart {
            roofing_area: roof_area,
            top_bottom_area: MultiPolygon(vec![]),
        });

        let mut mesh = MeshStorage::new("cube", MeshSettings::default());
        mesh.layers.push(MeshLayer { parts: vec![part] });

        SliceDataStorage {
            meshes: vec![mesh],
            layers: vec![crate::storage::LayerInfo {
                z: 200,
                thickness: 200,
            }],
        }
    }

    #[test]
    fn roof_lines_become_open_sequences() {
        let storage = storage_with_roof();
        let settings = Settings::default();
        let generator = MeshSkinGenerator::new(0);
        assert!(generator.is_active(&storage, &settings));

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

        let features: Vec<_> = plans[0].features().collect();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].feature_type(), PrintFeatureType::Roof);
        assert!(features[0].sequences().count() > 10);
        assert!(features[0].sequences().all(|sequence| !sequence.is_closed()));
    }
}
