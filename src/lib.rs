//! Toolpath planning core of a slicer: takes already sliced 2D layer
//! geometry and decides which toolpaths to generate, in which order they
//! print, and where each one starts. The result is a print plan tree
//! (print → layer → extruder → feature → move sequence → move) that is
//! emitted through a [`export::PlanExporter`].

pub mod adaptive;
pub mod error;
pub mod export;
pub mod generators;
pub mod geometry;
pub mod order;
pub mod plan;
pub mod schedule;
pub mod scoring;
pub mod seam;
pub mod settings;
pub mod storage;
pub mod texture;
pub mod transform;
pub mod voxel;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use error::PlanError;
use generators::{
    FeatureGenerator, LayerContext, MeshInfillGenerator, MeshInsetsGenerator, MeshSkinGenerator,
    SkirtBrimGenerator,
};
use geometry::Point3;
use plan::{
    ExtruderPlan, LayerPlan, PrintOperationSequence, PrintOperationTransformer, PrintPlan,
};
use schedule::{ExtruderPlanScheduler, ScheduleContext};
use settings::Settings;
use storage::SliceDataStorage;
use transform::{ExtruderChangeAppender, TravelMovesInserter};

///Adapts the extruder-plan scheduler to the recursive transformer walk of
///one layer.
struct LayerSchedulingPass<'a, 'b> {
    scheduler: &'a mut ExtruderPlanScheduler,
    context: ScheduleContext<'b>,
}

impl PrintOperationTransformer<ExtruderPlan> for LayerSchedulingPass<'_, '_> {
    fn process(&mut self, extruder_plan: &mut ExtruderPlan) {
        self.scheduler.process(extruder_plan, &self.context);
    }
}

///Optional knobs of a planning run.
#[derive(Clone, Default)]
pub struct PlanOptions {
    ///Seed for the random seam strategy; runs with the same seed and
    ///inputs produce identical plans.
    pub seam_seed: Option<u64>,
    ///Cooperative cancellation, checked at layer boundaries.
    pub cancel: Option<Arc<AtomicBool>>,
}

///Build the complete print plan for a sliced build: generate the feature
///extrusions of every layer, schedule them under their ordering
///constraints, and stitch in travel moves and extruder changes.
pub fn plan_print(
    storage: &SliceDataStorage,
    settings: &Settings,
) -> Result<PrintPlan, PlanError> {
    plan_print_with(storage, settings, &PlanOptions::default())
}

pub fn plan_print_with(
    storage: &SliceDataStorage,
    settings: &Settings,
    options: &PlanOptions,
) -> Result<PrintPlan, PlanError> {
    settings.validate()?;

    let mut generators = make_generators(storage, settings);
    for generator in &mut generators {
        generator.pre_calculate(storage, settings);
    }

    let used_extruders = storage.used_extruders(settings.skirt_brim.extruder_nr);
    let cancelled = || {
        options
            .cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    };

    // Layers are independent here: fan the feature generation out, one
    // output slot per layer.
    let mut layer_plans: Vec<LayerPlan> = storage
        .layers
        .par_iter()
        .enumerate()
        .filter(|_| !cancelled())
        .map(|(layer_index, layer_info)| {
            let context = LayerContext {
                layer_index,
                z: layer_info.z,
                thickness: layer_info.thickness,
            };

            let mut extruder_plans: Vec<ExtruderPlan> = used_extruders
                .iter()
                .map(|extruder_nr| ExtruderPlan::new(*extruder_nr))
                .collect();

            for generator in &generators {
                generator.generate(storage, settings, &context, &mut extruder_plans);
            }

            let configs = Arc::new(settings.path_configs(layer_index));
            let mut layer_plan =
                LayerPlan::new(layer_index, layer_info.z, layer_info.thickness, configs);
            for extruder_plan in extruder_plans {
                layer_plan.append_extruder_plan(extruder_plan, false);
            }
            layer_plan
        })
        .collect();

    // A cancelled run keeps only the contiguous prefix of generated
    // layers; anything after the first skipped layer is discarded.
    let mut next_expected_layer = 0;
    layer_plans.retain(|layer_plan| {
        let keep = layer_plan.layer_index() == next_expected_layer;
        if keep {
            next_expected_layer += 1;
        }
        keep
    });

    // Scheduling runs on one thread; the nozzle position carries over
    // from layer to layer.
    let mut scheduler = ExtruderPlanScheduler::new(Point3::default());
    let mut print_plan = PrintPlan::new();
    for layer_plan in layer_plans.iter_mut() {
        if cancelled() {
            break;
        }

        let mut context = ScheduleContext::new(&storage.meshes, layer_plan.layer_index());
        context.seam_seed = options.seam_seed;

        let mut scheduling_pass = LayerSchedulingPass {
            scheduler: &mut scheduler,
            context,
        };
        layer_plan.apply_processors_recursively(&mut scheduling_pass);
    }

    for layer_plan in layer_plans {
        if cancelled() {
            break;
        }
        print_plan.append_layer(layer_plan);
    }

    TravelMovesInserter::process(&mut print_plan, settings);
    ExtruderChangeAppender::process(&mut print_plan);

    Ok(print_plan)
}

fn make_generators(
    storage: &SliceDataStorage,
    settings: &Settings,
) -> Vec<Box<dyn FeatureGenerator + Send + Sync>> {
    let mut generators: Vec<Box<dyn FeatureGenerator + Send + Sync>> =
        vec![Box::new(SkirtBrimGenerator::new())];

    for mesh_index in 0..storage.meshes.len() {
        generators.push(Box::new(MeshInsetsGenerator::new(mesh_index)));
        generators.push(Box::new(MeshSkinGenerator::new(mesh_index)));
        generators.push(Box::new(MeshInfillGenerator::new(mesh_index)));
    }

    generators.retain(|generator| generator.is_active(storage, settings));
    generators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::PlanExporter;
    use crate::geometry::{Micron, Velocity};
    use crate::plan::PrintFeatureType;
    use crate::settings::MeshSettings;
    use crate::storage::{ExtrusionJunction, ExtrusionLine, LayerInfo, LayerPart, MeshLayer, MeshStorage};
    use crate::geometry::Point2;
    use geo::{polygon, MultiPolygon};

    ///Records every event, for asserting emission order.
    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
    }

    impl PlanExporter for EventLog {
        fn layer_start(&mut self, layer_index: usize, _start_position: Point3) {
            self.events.push(format!("layer_start {layer_index}"));
        }

        fn layer_end(&mut self, layer_index: usize, _z: Micron, _thickness: Micron) {
            self.events.push(format!("layer_end {layer_index}"));
        }

        fn travel(&mut self, _position: Point3, _speed: Velocity, _feature: PrintFeatureType) {
            self.events.push("travel".to_string());
        }

        fn extrusion(
            &mut self,
            _position: Point3,
            _speed: Velocity,
            _extruder_nr: u8,
            _mm3_per_mm: f64,
            _line_width: Micron,
            _line_thickness: Micron,
            feature_type: PrintFeatureType,
            _update_extrusion_offset: bool,
        ) {
            self.events.push(format!("extrude {feature_type}"));
        }

        fn extruder_change(&mut self, next_extruder: u8) {
            self.events.push(format!("extruder_change {next_extruder}"));
        }
    }

    fn square_outline(side: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: side, y: 0.0),
            (x: side, y: side),
            (x: 0.0, y: side),
        ]])
    }

    fn wall_ring(side: Micron, inset_index: usize) -> ExtrusionLine {
        ExtrusionLine {
            junctions: vec![
                ExtrusionJunction::new(Point2::new(0, 0), 400),
                ExtrusionJunction::new(Point2::new(side, 0), 400),
                ExtrusionJunction::new(Point2::new(side, side), 400),
                ExtrusionJunction::new(Point2::new(0, side), 400),
            ],
            closed: true,
            inset_index,
        }
    }

    fn small_build() -> SliceDataStorage {
        let mut mesh = MeshStorage::new("cube", MeshSettings::default());
        for _ in 0..2 {
            let mut part = LayerPart::new(square_outline(10.0));
            part.wall_toolpaths = vec![wall_ring(10_000, 0), wall_ring(9_200, 1)];
            part.infill_area = square_outline(8.0);
            mesh.layers.push(MeshLayer { parts: vec![part] });
        }

        SliceDataStorage {
            meshes: vec![mesh],
            layers: vec![
                LayerInfo {
                    z: 270,
                    thickness: 270,
                },
                LayerInfo {
                    z: 470,
                    thickness: 200,
                },
            ],
        }
    }

    #[test]
    fn plans_every_layer_and_emits_in_order() {
        let storage = small_build();
        let settings = Settings::default();

        let print_plan = plan_print(&storage, &settings).unwrap();
        assert_eq!(print_plan.layers().len(), 2);
        assert_eq!(
            print_plan.calculate_used_extruders(),
            std::collections::BTreeSet::from([0])
        );

        let mut log = EventLog::default();
        print_plan.write(&mut log);

        // Layers come out in order, each bracketed by its events.
        let starts: Vec<usize> = log
            .events
            .iter()
            .enumerate()
            .filter_map(|(position, event)| {
                event.starts_with("layer_start").then_some(position)
            })
            .collect();
        assert_eq!(starts.len(), 2);
        assert_eq!(log.events[0], "layer_start 0");
        assert_eq!(log.events.last().unwrap(), "layer_end 1");

        // The skirt is the very first extrusion of the print.
        let first_extrusion = log
            .events
            .iter()
            .find(|event| event.starts_with("extrude"))
            .unwrap();
        assert_eq!(first_extrusion, "extrude Skirt/Brim");
    }

    #[test]
    fn walls_print_inside_out_by_default() {
        let storage = small_build();
        let settings = Settings::default();
        let print_plan = plan_print(&storage, &settings).unwrap();

        let first_layer = &print_plan.layers()[0];
        let extruder_plan = first_layer.extruder_plans().next().unwrap();
        let wall_order: Vec<Option<usize>> = extruder_plan
            .features()
            .filter(|feature| {
                matches!(
                    feature.feature_type(),
                    PrintFeatureType::OuterWall | PrintFeatureType::InnerWall
                )
            })
            .map(|feature| feature.kind().inset_index())
            .collect();
        assert_eq!(wall_order, vec![Some(1), Some(0)]);
    }

    #[test]
    fn cancellation_stops_at_a_layer_boundary() {
        let storage = small_build();
        let settings = Settings::default();

        let cancel = Arc::new(AtomicBool::new(true));
        let options = PlanOptions {
            cancel: Some(cancel),
            ..PlanOptions::default()
        };

        let print_plan = plan_print_with(&storage, &settings, &options).unwrap();
        assert!(print_plan.layers().is_empty());
    }
}
