use log::{error, warn};

use crate::geometry::Point3;
use crate::plan::{ExtruderPlan, FeatureExtrusion};

use super::feature_scheduler::FeatureExtrusionScheduler;
use super::{ClosestStartPoint, ScheduleContext};

///Orders the feature extrusions of an extruder plan, and the sequences
///within each feature, by repeatedly picking the start candidate closest
///to the nozzle among all features whose constraints allow them to print
///now.
pub struct ExtruderPlanScheduler {
    current_position: Point3,
}

impl ExtruderPlanScheduler {
    pub fn new(start_position: Point3) -> Self {
        Self {
            current_position: start_position,
        }
    }

    ///Where the nozzle ended after the last scheduled plan.
    pub fn current_position(&self) -> Point3 {
        self.current_position
    }

    pub fn process(&mut self, extruder_plan: &mut ExtruderPlan, context: &ScheduleContext) {
        let dense_features: Vec<FeatureExtrusion> = extruder_plan
            .take_features()
            .into_iter()
            .filter(|feature| {
                if feature.is_empty() {
                    warn!("dropping feature extrusion without any move sequence");
                    return false;
                }
                true
            })
            .collect();

        let mut schedulers: Vec<Option<FeatureExtrusionScheduler>> = (0..dense_features.len())
            .map(|feature_index| {
                Some(FeatureExtrusionScheduler::new(
                    feature_index,
                    &dense_features,
                    context,
                ))
            })
            .collect();

        let mut features: Vec<Option<FeatureExtrusion>> =
            dense_features.into_iter().map(Some).collect();

        let mut ordered: Vec<FeatureExtrusion> = Vec::with_capacity(features.len());

        while features.iter().any(Option::is_some) {
            // A feature may print now if no remaining feature insists on
            // coming before it.
            let processable = |feature_index: usize| -> bool {
                schedulers
                    .iter()
                    .flatten()
                    .all(|scheduler| !scheduler.blocks(feature_index))
            };

            let mut closest: Option<ClosestStartPoint> = None;
            for (feature_index, scheduler) in schedulers.iter().enumerate() {
                let Some(scheduler) = scheduler else { continue };
                if features[feature_index].is_some() && processable(feature_index) {
                    scheduler.evaluate_closest_point(&mut closest, self.current_position);
                }
            }

            match closest {
                Some(closest) => {
                    let feature_index = closest.point.feature_index;
                    let mut feature = features[feature_index]
                        .take()
                        .expect("the best candidate belongs to a remaining feature");
                    let mut scheduler = schedulers[feature_index]
                        .take()
                        .expect("remaining features have a scheduler");

                    scheduler.optimize_sequences_order(
                        &mut feature,
                        closest.point,
                        &mut self.current_position,
                    );
                    ordered.push(feature);
                }
                None => {
                    error!(
                        "no processable start candidate among feature extrusions; \
                         constraints are contradictory, emitting the rest in input order"
                    );
                    for (feature_index, feature) in features.iter_mut().enumerate() {
                        if let Some(feature) = feature.take() {
                            schedulers[feature_index] = None;
                            self.current_position = feature
                                .find_end_position()
                                .unwrap_or(self.current_position);
                            ordered.push(feature);
                        }
                    }
                    break;
                }
            }
        }

        extruder_plan.set_features(ordered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Velocity;
    use crate::plan::{
        ContinuousExtruderMoveSequence, ExtrusionMove, FeatureKind, PrintFeatureType,
    };
    use crate::settings::MeshSettings;
    use crate::storage::MeshStorage;

    fn square_sequence(origin: Point3, side: i64) -> ContinuousExtruderMoveSequence {
        let mut sequence = ContinuousExtruderMoveSequence::closed(origin);
        for offset in [
            Point3::new(side, 0, 0),
            Point3::new(side, side, 0),
            Point3::new(0, side, 0),
            Point3::new(0, 0, 0),
        ] {
            sequence.append_extrusion_move(ExtrusionMove::new(
                origin + offset,
                400,
                Velocity(30.0),
            ));
        }
        sequence
    }

    fn feature(
        feature_type: PrintFeatureType,
        kind: FeatureKind,
        origin: Point3,
    ) -> FeatureExtrusion {
        let mut feature = FeatureExtrusion::new(feature_type, 400, kind);
        feature.append_sequence(square_sequence(origin, 10_000));
        feature
    }

    ///Infill-before-walls with inside-out insets: infill, then the inner
    ///wall, then the outer wall.
    #[test]
    fn schedules_infill_then_inner_then_outer() {
        let mut mesh_settings = MeshSettings::default();
        mesh_settings.infill_before_walls = true;
        let meshes = vec![MeshStorage::new("cube", mesh_settings)];

        let mut plan = ExtruderPlan::new(0);
        plan.append_feature(feature(
            PrintFeatureType::OuterWall,
            FeatureKind::Wall {
                mesh_index: 0,
                inset_index: 0,
            },
            Point3::new(0, 0, 0),
        ));
        plan.append_feature(feature(
            PrintFeatureType::InnerWall,
            FeatureKind::Wall {
                mesh_index: 0,
                inset_index: 1,
            },
            Point3::new(400, 400, 0),
        ));
        plan.append_feature(feature(
            PrintFeatureType::Infill,
            FeatureKind::Mesh { mesh_index: 0 },
            Point3::new(800, 800, 0),
        ));

        let context = ScheduleContext::new(&meshes, 0);
        let mut scheduler = ExtruderPlanScheduler::new(Point3::new(0, 0, 0));
        scheduler.process(&mut plan, &context);

        let order: Vec<PrintFeatureType> = plan
            .features()
            .map(FeatureExtrusion::feature_type)
            .collect();
        assert_eq!(
            order,
            vec![
                PrintFeatureType::Infill,
                PrintFeatureType::InnerWall,
                PrintFeatureType::OuterWall,
            ]
        );
    }

    ///Skirt/brim always goes first, whatever the nozzle is closest to.
    #[test]
    fn skirt_prints_before_mesh_features() {
        let meshes = vec![MeshStorage::new("cube", MeshSettings::default())];

        let mut plan = ExtruderPlan::new(0);
        plan.append_feature(feature(
            PrintFeatureType::OuterWall,
            FeatureKind::Wall {
                mesh_index: 0,
                inset_index: 0,
            },
            Point3::new(0, 0, 0),
        ));
        plan.append_feature(feature(
            PrintFeatureType::SkirtBrim,
            FeatureKind::Plain,
            Point3::new(-5_000, -5_000, 0),
        ));

        let context = ScheduleContext::new(&meshes, 0);
        let mut scheduler = ExtruderPlanScheduler::new(Point3::new(0, 0, 0));
        scheduler.process(&mut plan, &context);

        let order: Vec<PrintFeatureType> = plan
            .features()
            .map(FeatureExtrusion::feature_type)
            .collect();
        assert_eq!(
            order,
            vec![PrintFeatureType::SkirtBrim, PrintFeatureType::OuterWall]
        );
    }

    ///Monotonic roofing: rows print in axial order even when the nozzle
    ///starts next to the last row.
    #[test]
    fn monotonic_roof_rows_print_in_axial_order() {
        let mut mesh_settings = MeshSettings::default();
        mesh_settings.roofing_monotonic = true;
        mesh_settings.roofing_angles = vec![90.0];
        let meshes = vec![MeshStorage::new("cube", mesh_settings)];

        let mut roof =
            FeatureExtrusion::new(PrintFeatureType::Roof, 400, FeatureKind::Mesh { mesh_index: 0 });
        for y in [760, 0, 380] {
            let mut sequence = ContinuousExtruderMoveSequence::open(Point3::new(0, y, 0));
            sequence.append_extrusion_move(ExtrusionMove::new(
                Point3::new(10_000, y, 0),
                400,
                Velocity(30.0),
            ));
            roof.append_sequence(sequence);
        }

        let mut plan = ExtruderPlan::new(0);
        plan.append_feature(roof);

        let context = ScheduleContext::new(&meshes, 0);
        let mut scheduler = ExtruderPlanScheduler::new(Point3::new(0, 760, 0));
        scheduler.process(&mut plan, &context);

        let row_order: Vec<i64> = plan
            .features()
            .next()
            .unwrap()
            .sequences()
            .map(|sequence| sequence.find_start_position().unwrap().y)
            .collect();
        assert_eq!(row_order, vec![0, 380, 760]);

        // The nozzle rests at the end of the last emitted row.
        assert_eq!(scheduler.current_position(), Point3::new(10_000, 760, 0));
    }

    ///After scheduling, no earlier feature may be listed as having to
    ///come after a later one.
    #[test]
    fn scheduled_order_respects_all_constraints() {
        let meshes = vec![MeshStorage::new("cube", MeshSettings::default())];

        let mut plan = ExtruderPlan::new(0);
        for inset_index in 0..3 {
            plan.append_feature(feature(
                if inset_index == 0 {
                    PrintFeatureType::OuterWall
                } else {
                    PrintFeatureType::InnerWall
                },
                FeatureKind::Wall {
                    mesh_index: 0,
                    inset_index,
                },
                Point3::new(inset_index as i64 * 400, 0, 0),
            ));
        }

        let context = ScheduleContext::new(&meshes, 0);
        let mut scheduler = ExtruderPlanScheduler::new(Point3::new(0, 0, 0));
        scheduler.process(&mut plan, &context);

        // Inside-out: inset indices must strictly decrease.
        let insets: Vec<usize> = plan
            .features()
            .map(|feature| feature.kind().inset_index().unwrap())
            .collect();
        assert_eq!(insets, vec![2, 1, 0]);
    }
}
