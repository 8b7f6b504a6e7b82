use std::collections::{BTreeMap, BTreeSet};

use log::error;

use crate::geometry::{Point2, Point3};
use crate::plan::{ContinuousExtruderMoveSequence, FeatureExtrusion, PrintFeatureType};
use crate::scoring::{
    BestElementFinder, CornerScoringCriterion, CriteriaPass, DistanceScoringCriterion,
    DistanceType, ExclusionAreaScoringCriterion, RandomScoringCriterion,
    TextureScoringCriterion, WeighedCriterion,
};
use crate::seam::{SeamConfig, SeamType};
use crate::settings::MeshSettings;

use super::constraints::{
    append_bed_adhesion_constraints, append_mesh_features_constraints,
    append_monotonic_constraints, SequenceConstraints,
};
use super::{ChangeSequenceAction, ClosestStartPoint, ScheduleContext, StartCandidatePoint};

///Schedules the move sequences of a single feature extrusion: knows which
///other features must wait for it, which of its sequences must wait for
///each other, and which start points are worth considering under the seam
///configuration.
pub struct FeatureExtrusionScheduler {
    extrusions_after: BTreeSet<usize>,
    moves_constraints: SequenceConstraints,
    ///Pre-filtered candidates per sequence index.
    start_candidates: BTreeMap<usize, Vec<StartCandidatePoint>>,
    ///The single candidate of a feature that is printed as-is.
    fixed_candidate: Option<StartCandidatePoint>,
    optimize_sequences: bool,
}

impl FeatureExtrusionScheduler {
    pub fn new(
        feature_index: usize,
        all_features: &[FeatureExtrusion],
        context: &ScheduleContext,
    ) -> Self {
        let feature = &all_features[feature_index];
        let mesh_settings = feature
            .kind()
            .mesh_index()
            .map(|mesh_index| &context.meshes[mesh_index].settings);

        let seam_config = seam_config_for(feature, mesh_settings);
        let extrusions_after =
            make_ordering_constraints(feature_index, all_features, mesh_settings);
        let moves_constraints = make_sequence_constraints(feature, mesh_settings, context);

        let mut scheduler = Self {
            extrusions_after,
            moves_constraints,
            start_candidates: BTreeMap::new(),
            fixed_candidate: None,
            optimize_sequences: true,
        };
        scheduler.make_start_candidates(feature_index, feature, seam_config, context);
        scheduler
    }

    ///Whether the given feature is still blocked by this one.
    pub fn blocks(&self, feature_index: usize) -> bool {
        self.extrusions_after.contains(&feature_index)
    }

    ///Challenge `closest` with every candidate of every sequence that is
    ///processable now.
    pub fn evaluate_closest_point(
        &self,
        closest: &mut Option<ClosestStartPoint>,
        last_position: Point3,
    ) {
        if let Some(fixed) = self.fixed_candidate {
            ClosestStartPoint::challenge(
                closest,
                ClosestStartPoint {
                    distance_squared: (fixed.position - last_position).vsize2(),
                    point: fixed,
                },
            );
            return;
        }

        for (sequence_index, candidates) in &self.start_candidates {
            if !self.sequence_processable_now(*sequence_index) {
                continue;
            }
            for candidate in candidates {
                ClosestStartPoint::challenge(
                    closest,
                    ClosestStartPoint {
                        distance_squared: (candidate.position - last_position).vsize2(),
                        point: *candidate,
                    },
                );
            }
        }
    }

    ///Reorder the feature's sequences by repeated nearest-candidate
    ///selection, starting from the chosen candidate and honouring the
    ///intra-feature constraints. Updates `current_position` to the end of
    ///the last emitted sequence.
    pub fn optimize_sequences_order(
        &mut self,
        feature: &mut FeatureExtrusion,
        start_point: StartCandidatePoint,
        current_position: &mut Point3,
    ) {
        if !self.optimize_sequences {
            *current_position = feature.find_end_position().unwrap_or(*current_position);
            return;
        }

        let mut remaining: Vec<Option<ContinuousExtruderMoveSequence>> =
            feature.take_sequences().into_iter().map(Some).collect();
        let mut ordered: Vec<ContinuousExtruderMoveSequence> =
            Vec::with_capacity(remaining.len());

        self.append_next_sequence(start_point, &mut remaining, &mut ordered, current_position);

        while remaining.iter().any(Option::is_some) {
            let mut closest: Option<ClosestStartPoint> = None;
            self.evaluate_closest_point(&mut closest, *current_position);

            match closest {
                Some(closest) => {
                    self.append_next_sequence(
                        closest.point,
                        &mut remaining,
                        &mut ordered,
                        current_position,
                    );
                }
                None => {
                    error!(
                        "no processable start candidate among move sequences; \
                         constraints are contradictory, emitting the rest in input order"
                    );
                    for sequence in remaining.iter_mut().filter_map(Option::take) {
                        ordered.push(sequence);
                    }
                    break;
                }
            }
        }

        feature.set_sequences(ordered);
    }

    fn append_next_sequence(
        &mut self,
        start_point: StartCandidatePoint,
        remaining: &mut [Option<ContinuousExtruderMoveSequence>],
        ordered: &mut Vec<ContinuousExtruderMoveSequence>,
        current_position: &mut Point3,
    ) {
        let sequence_index = start_point
            .sequence_index
            .expect("sequence-less candidates only occur on non-optimized features");

        let mut sequence = remaining[sequence_index]
            .take()
            .expect("candidate points at an unprocessed sequence");

        match start_point.action {
            ChangeSequenceAction::None => {}
            ChangeSequenceAction::Reverse => sequence.reverse(),
            ChangeSequenceAction::Reorder { move_index } => {
                sequence.reorder_to_end_with(move_index);
            }
        }

        *current_position = sequence.find_end_position().unwrap_or(*current_position);

        self.start_candidates.remove(&sequence_index);
        self.moves_constraints.remove(&sequence_index);

        ordered.push(sequence);
    }

    fn sequence_processable_now(&self, sequence_index: usize) -> bool {
        self.moves_constraints
            .values()
            .all(|afters| !afters.contains(&sequence_index))
    }

    fn make_start_candidates(
        &mut self,
        feature_index: usize,
        feature: &FeatureExtrusion,
        seam_config: Option<SeamConfig>,
        context: &ScheduleContext,
    ) {
        match seam_config {
            Some(seam_config) => {
                for (sequence_index, sequence) in feature.sequences().enumerate() {
                    let mut candidates =
                        base_start_candidates(feature_index, sequence_index, sequence);
                    pre_filter_start_candidates(&mut candidates, &seam_config, context);
                    self.start_candidates.insert(sequence_index, candidates);
                }
            }
            None => {
                // Print the feature as-is; only its own start is a candidate.
                self.optimize_sequences = false;
                match feature.find_start_position() {
                    Some(position) => {
                        self.fixed_candidate = Some(StartCandidatePoint {
                            position,
                            feature_index,
                            sequence_index: None,
                            action: ChangeSequenceAction::None,
                        });
                    }
                    None => error!("feature extrusion has no start position, skipping"),
                }
            }
        }
    }
}

fn make_ordering_constraints(
    feature_index: usize,
    all_features: &[FeatureExtrusion],
    mesh_settings: Option<&MeshSettings>,
) -> BTreeSet<usize> {
    let mut extrusions_after = BTreeSet::new();

    match all_features[feature_index].feature_type() {
        PrintFeatureType::SkirtBrim => {
            append_bed_adhesion_constraints(feature_index, all_features, &mut extrusions_after);
        }
        PrintFeatureType::OuterWall
        | PrintFeatureType::InnerWall
        | PrintFeatureType::Skin
        | PrintFeatureType::Roof
        | PrintFeatureType::Infill => {
            if let Some(mesh_settings) = mesh_settings {
                append_mesh_features_constraints(
                    feature_index,
                    all_features,
                    mesh_settings,
                    &mut extrusions_after,
                );
            }
        }
        _ => {}
    }

    extrusions_after
}

fn make_sequence_constraints(
    feature: &FeatureExtrusion,
    mesh_settings: Option<&MeshSettings>,
    context: &ScheduleContext,
) -> SequenceConstraints {
    let mut constraints = SequenceConstraints::new();
    if let Some(mesh_settings) = mesh_settings {
        append_monotonic_constraints(feature, mesh_settings, context.layer_index, &mut constraints);
    }
    constraints
}

///The seam policy of a feature: outer walls follow their mesh's seam
///configuration, the other mesh features take the shortest start, and
///bed-adhesion features keep their input order.
fn seam_config_for(
    feature: &FeatureExtrusion,
    mesh_settings: Option<&MeshSettings>,
) -> Option<SeamConfig> {
    match feature.feature_type() {
        PrintFeatureType::OuterWall => {
            Some(mesh_settings.map_or_else(SeamConfig::default, |settings| settings.seam))
        }
        PrintFeatureType::InnerWall
        | PrintFeatureType::Skin
        | PrintFeatureType::Roof
        | PrintFeatureType::Infill
        | PrintFeatureType::Support
        | PrintFeatureType::SupportInfill
        | PrintFeatureType::SupportInterface => Some(SeamConfig::new(SeamType::Shortest)),
        PrintFeatureType::SkirtBrim
        | PrintFeatureType::PrimeTower
        | PrintFeatureType::MoveCombing
        | PrintFeatureType::MoveRetraction
        | PrintFeatureType::NoneType => None,
    }
}

///Every vertex of a closed sequence is a candidate; an open sequence
///offers its two endpoints, the far one implying a reversal.
fn base_start_candidates(
    feature_index: usize,
    sequence_index: usize,
    sequence: &ContinuousExtruderMoveSequence,
) -> Vec<StartCandidatePoint> {
    let mut candidates = Vec::new();

    if sequence.is_closed() {
        for (move_index, sequence_move) in sequence.moves().iter().enumerate() {
            candidates.push(StartCandidatePoint {
                position: sequence_move.position(),
                feature_index,
                sequence_index: Some(sequence_index),
                action: ChangeSequenceAction::Reorder { move_index },
            });
        }
    } else {
        if let Some(start) = sequence.find_start_position() {
            candidates.push(StartCandidatePoint {
                position: start,
                feature_index,
                sequence_index: Some(sequence_index),
                action: ChangeSequenceAction::None,
            });
        }
        if let Some(end) = sequence.find_end_position() {
            candidates.push(StartCandidatePoint {
                position: end,
                feature_index,
                sequence_index: Some(sequence_index),
                action: ChangeSequenceAction::Reverse,
            });
        }
    }

    candidates
}

///Filter the candidates down to those equally optimal under the seam
///configuration.
fn pre_filter_start_candidates(
    candidates: &mut Vec<StartCandidatePoint>,
    seam_config: &SeamConfig,
    context: &ScheduleContext,
) {
    if candidates.is_empty() {
        return;
    }

    let points: Vec<Point2> = candidates
        .iter()
        .map(|candidate| candidate.position.xy())
        .collect();

    let mut finder = BestElementFinder::new();
    let mut main_pass = CriteriaPass::new(0.05);

    // A unique point is wanted for strategies that pick one specific spot;
    // the others keep a shortlist for the nearest-point stage to choose
    // from.
    let mut unique_selected_point = false;

    match seam_config.seam_type {
        SeamType::Shortest | SeamType::Plugin => {}
        SeamType::Random => {
            unique_selected_point = true;
            let criterion = match context.seam_seed {
                Some(seed) => RandomScoringCriterion::from_seed(seed),
                None => RandomScoringCriterion::new(),
            };
            main_pass.criteria.push(WeighedCriterion::new(criterion));
        }
        SeamType::UserSpecified => {
            // A small divider so candidates around the forced point win
            // by a wide margin.
            main_pass.criteria.push(WeighedCriterion::new(
                DistanceScoringCriterion::with_divider(
                    points.clone(),
                    seam_config.user_point,
                    DistanceType::Euclidean,
                    1.0,
                ),
            ));
        }
        SeamType::SharpestCorner => {
            unique_selected_point = true;
            main_pass.criteria.push(WeighedCriterion::new(
                CornerScoringCriterion::new(points.clone(), seam_config.corner_pref),
            ));
        }
    }

    if let Some(overhang_areas) = context.overhang_areas {
        // Heavier weight, to keep seams out of overhanging areas.
        main_pass.criteria.push(WeighedCriterion::weighted(
            ExclusionAreaScoringCriterion::new(points.clone(), overhang_areas),
            2.0,
        ));
    }

    if let Some((provider, feature_name)) = context.texture {
        main_pass.criteria.push(WeighedCriterion::new(
            TextureScoringCriterion::new(points.clone(), provider, feature_name),
        ));
    }

    finder.append_pass(main_pass);

    if seam_config.seam_type == SeamType::SharpestCorner {
        // Corner scores tie easily (e.g. on a cylinder); fall back to the
        // back-most point, then to the right-most.
        let mut position_max = points[0];
        for point in &points {
            position_max.x = position_max.x.max(point.x);
            position_max.y = position_max.y.max(point.y);
        }

        finder.append_single_criterion_pass(
            DistanceScoringCriterion::new(points.clone(), position_max, DistanceType::YOnly),
            0.01,
        );
        finder.append_single_criterion_pass(
            DistanceScoringCriterion::new(points.clone(), position_max, DistanceType::XOnly),
            0.0,
        );
    }

    if unique_selected_point {
        if let Some(best) = finder.find_best(candidates.len()) {
            let chosen = candidates[best];
            candidates.clear();
            candidates.push(chosen);
        }
    } else {
        let best_elements = finder.find_best_all(candidates.len());
        if !best_elements.is_empty() {
            *candidates = best_elements
                .into_iter()
                .map(|index| candidates[index])
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Velocity;
    use crate::plan::{ExtrusionMove, FeatureKind};
    use crate::seam::CornerPreference;
    use crate::settings::MeshSettings;
    use crate::storage::MeshStorage;

    ///A clockwise 10 mm square wall loop starting at the origin.
    fn square_wall() -> FeatureExtrusion {
        let mut sequence =
            ContinuousExtruderMoveSequence::closed(crate::geometry::Point3::new(0, 0, 0));
        for position in [
            crate::geometry::Point3::new(0, 10_000, 0),
            crate::geometry::Point3::new(10_000, 10_000, 0),
            crate::geometry::Point3::new(10_000, 0, 0),
            crate::geometry::Point3::new(0, 0, 0),
        ] {
            sequence.append_extrusion_move(ExtrusionMove::new(position, 400, Velocity(30.0)));
        }

        let mut feature = FeatureExtrusion::new(
            PrintFeatureType::OuterWall,
            400,
            FeatureKind::Wall {
                mesh_index: 0,
                inset_index: 0,
            },
        );
        feature.append_sequence(sequence);
        feature
    }

    fn meshes_with_seam(seam: SeamConfig) -> Vec<MeshStorage> {
        let mut settings = MeshSettings::default();
        settings.seam = seam;
        vec![MeshStorage::new("cube", settings)]
    }

    fn schedule_square(seam: SeamConfig) -> FeatureExtrusion {
        let meshes = meshes_with_seam(seam);
        let context = ScheduleContext::new(&meshes, 0);
        let features = vec![square_wall()];
        let mut scheduler = FeatureExtrusionScheduler::new(0, &features, &context);

        let mut closest = None;
        scheduler.evaluate_closest_point(&mut closest, crate::geometry::Point3::new(0, 0, 0));
        let closest = closest.expect("the square offers candidates");

        let mut feature = features.into_iter().next().unwrap();
        let mut position = crate::geometry::Point3::new(0, 0, 0);
        scheduler.optimize_sequences_order(&mut feature, closest.point, &mut position);
        feature
    }

    ///On a square all corners tie; the back-most then right-most
    ///fallbacks settle on the top-right corner.
    #[test]
    fn sharpest_corner_on_square_falls_back_to_top_right() {
        let feature = schedule_square(SeamConfig::sharpest_corner(CornerPreference::Inner));
        let start = feature.find_start_position().unwrap();
        assert_eq!(start, crate::geometry::Point3::new(10_000, 10_000, 0));
    }

    #[test]
    fn user_specified_seam_starts_near_the_forced_point() {
        let mut seam = SeamConfig::new(SeamType::UserSpecified);
        seam.user_point = Point2::new(9_000, 9_900);
        let feature = schedule_square(seam);
        let start = feature.find_start_position().unwrap();
        assert_eq!(start, crate::geometry::Point3::new(10_000, 10_000, 0));
    }

    ///The shortest strategy keeps all candidates; the nearest-point stage
    ///then starts at the vertex closest to the nozzle.
    #[test]
    fn shortest_seam_starts_at_the_nearest_vertex() {
        let feature = schedule_square(SeamConfig::new(SeamType::Shortest));
        let start = feature.find_start_position().unwrap();
        assert_eq!(start, crate::geometry::Point3::new(0, 0, 0));
    }

    #[test]
    fn random_seam_is_reproducible_with_a_seed() {
        let meshes = meshes_with_seam(SeamConfig::new(SeamType::Random));
        let mut context = ScheduleContext::new(&meshes, 0);
        context.seam_seed = Some(99);

        let pick_start = |context: &ScheduleContext| {
            let features = vec![square_wall()];
            let scheduler = FeatureExtrusionScheduler::new(0, &features, context);
            let mut closest = None;
            scheduler
                .evaluate_closest_point(&mut closest, crate::geometry::Point3::new(0, 0, 0));
            closest.unwrap().point.position
        };

        assert_eq!(pick_start(&context), pick_start(&context));
    }
}
