use geo::{ConvexHull, MultiPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

use crate::geometry::micron_to_mm;
use crate::plan::{ExtruderPlan, FeatureExtrusion, FeatureKind, PrintFeatureType};
use crate::settings::Settings;
use crate::storage::SliceDataStorage;

use super::{extruder_plan_for, ring_from_polygon, ring_sequence, FeatureGenerator, LayerContext};

///Clipper works on scaled integer coordinates.
const CLIPPER_SCALE: f64 = 1_000.0;

///Draws the bed-adhesion loops around the first layer: concentric offsets
///of the convex hull of everything printed on layer 0. Loops are emitted
///innermost first; the outermost loop is always last.
pub struct SkirtBrimGenerator;

impl SkirtBrimGenerator {
    pub fn new() -> Self {
        Self
    }

    fn first_layer_hull(storage: &SliceDataStorage) -> Option<geo::Polygon<f64>> {
        let polygons: Vec<geo::Polygon<f64>> = storage
            .meshes
            .iter()
            .filter_map(|mesh| mesh.layers.first())
            .flat_map(|layer| &layer.parts)
            .flat_map(|part| part.outline.iter().cloned())
            .collect();

        if polygons.is_empty() {
            return None;
        }
        Some(MultiPolygon(polygons).convex_hull())
    }
}

impl Default for SkirtBrimGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureGenerator for SkirtBrimGenerator {
    fn is_active(&self, _storage: &SliceDataStorage, settings: &Settings) -> bool {
        settings.skirt_brim.is_enabled()
    }

    fn generate(
        &self,
        storage: &SliceDataStorage,
        settings: &Settings,
        layer: &LayerContext,
        extruder_plans: &mut [ExtruderPlan],
    ) {
        if layer.layer_index != 0 {
            return;
        }

        let Some(hull) = Self::first_layer_hull(storage) else {
            return;
        };

        let configs = settings.path_configs(layer.layer_index);
        let config = configs.config_for(PrintFeatureType::SkirtBrim);
        let line_width = micron_to_mm(config.line_width);

        let mut feature =
            FeatureExtrusion::new(PrintFeatureType::SkirtBrim, config.line_width, FeatureKind::Plain);

        let mut previous_offset = f64::NEG_INFINITY;
        for loop_index in 0..settings.skirt_brim.line_count {
            let offset =
                settings.skirt_brim.distance + (loop_index as f64 + 0.5) * line_width;
            debug_assert!(offset > previous_offset, "loops must grow outward");
            previous_offset = offset;

            let loops = hull.offset(
                offset,
                JoinType::Round(0.01),
                EndType::ClosedPolygon,
                CLIPPER_SCALE,
            );
            for polygon in &loops {
                let ring = ring_from_polygon(polygon);
                if let Some(sequence) =
                    ring_sequence(&ring, config.line_width, config.speed_derivatives.speed)
                {
                    feature.append_sequence(sequence);
                }
            }
        }

        if feature.is_empty() {
            return;
        }
        if let Some(plan) = extruder_plan_for(extruder_plans, settings.skirt_brim.extruder_nr) {
            plan.append_feature(feature);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MeshSettings;
    use crate::storage::{LayerPart, MeshLayer, MeshStorage};
    use geo::polygon;

    fn storage_with_outline() -> SliceDataStorage {
        let part = LayerPart::new(MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ]]));

        let mut mesh = MeshStorage::new("cube", MeshSettings::default());
        mesh.layers.push(MeshLayer { parts: vec![part] });
        SliceDataStorage {
            meshes: vec![mesh],
            layers: vec![crate::storage::LayerInfo {
                z: 270,
                thickness: 270,
            }],
        }
    }

    #[test]
    fn skirt_loops_grow_outward_with_outermost_last() {
        let storage = storage_with_outline();
        let mut settings = Settings::default();
        settings.skirt_brim.line_count = 3;

        let generator = SkirtBrimGenerator::new();
        let mut plans = vec![ExtruderPlan::new(0)];
        generator.generate(
            &storage,
            &settings,
            &LayerContext {
                layer_index: 0,
                z: 270,
                thickness: 270,
            },
            &mut plans,
        );

        let feature = plans[0].features().next().unwrap();
        assert_eq!(feature.feature_type(), PrintFeatureType::SkirtBrim);

        // Each loop stays inside the next: x-extent must keep growing.
        let extents: Vec<i64> = feature
            .sequences()
            .map(|sequence| {
                sequence
                    .vertices()
                    .iter()
                    .map(|vertex| vertex.x)
                    .max()
                    .unwrap()
            })
            .collect();
        assert_eq!(extents.len(), 3);
        assert!(extents.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn no_loops_on_upper_layers() {
        let storage = storage_with_outline();
        let settings = Settings::default();
        let generator = SkirtBrimGenerator::new();
        let mut plans = vec![ExtruderPlan::new(0)];
        generator.generate(
            &storage,
            &settings,
            &LayerContext {
                layer_index: 1,
                z: 470,
                thickness: 200,
            },
            &mut plans,
        );
        assert!(plans[0].features().next().is_none());
    }
}
