use std::collections::{BTreeMap, BTreeSet};

use glam::DVec2;
use log::warn;

use crate::geometry::{AngleDegrees, AngleRadians};
use crate::plan::{FeatureExtrusion, PrintFeatureType};
use crate::settings::{InsetDirection, MeshSettings};

///Ordering constraints between the move sequences of one feature:
///`constraints[before]` holds the sequences that must print after it.
pub type SequenceConstraints = BTreeMap<usize, BTreeSet<usize>>;

///Bed adhesion prints first: everything that is not skirt/brim must come
///after a skirt/brim feature.
pub fn append_bed_adhesion_constraints(
    feature_index: usize,
    all_features: &[FeatureExtrusion],
    extrusions_after: &mut BTreeSet<usize>,
) {
    for (other_index, other) in all_features.iter().enumerate() {
        if other_index != feature_index
            && other.feature_type() != PrintFeatureType::SkirtBrim
        {
            extrusions_after.insert(other_index);
        }
    }
}

///Within one mesh: order infill against walls by the infill-before-walls
///setting, and chain wall insets by the inset direction.
pub fn append_mesh_features_constraints(
    feature_index: usize,
    all_features: &[FeatureExtrusion],
    mesh_settings: &MeshSettings,
    extrusions_after: &mut BTreeSet<usize>,
) {
    let feature = &all_features[feature_index];
    let Some(mesh_index) = feature.kind().mesh_index() else {
        return;
    };

    let inset_index_after: Option<usize> = feature.kind().inset_index().and_then(|inset_index| {
        match mesh_settings.inset_direction {
            InsetDirection::InsideOut => inset_index.checked_sub(1),
            InsetDirection::OutsideIn => Some(inset_index + 1),
        }
    });

    let mut types_after: Vec<PrintFeatureType> = Vec::new();
    if mesh_settings.infill_before_walls {
        if feature.feature_type() == PrintFeatureType::Infill {
            types_after.push(PrintFeatureType::OuterWall);
            types_after.push(PrintFeatureType::InnerWall);
        }
    } else if matches!(
        feature.feature_type(),
        PrintFeatureType::OuterWall | PrintFeatureType::InnerWall
    ) {
        types_after.push(PrintFeatureType::Infill);
    }

    if types_after.is_empty() && inset_index_after.is_none() {
        return;
    }

    for (other_index, other) in all_features.iter().enumerate() {
        if other_index == feature_index || other.kind().mesh_index() != Some(mesh_index) {
            continue;
        }

        let same_inset_after = inset_index_after.is_some()
            && other.kind().inset_index() == inset_index_after;
        if same_inset_after || types_after.contains(&other.feature_type()) {
            extrusions_after.insert(other_index);
        }
    }
}

struct ProjectedSequence {
    sequence_index: usize,
    axial_projection: f64,
    radial_projection_min: f64,
    radial_projection_max: f64,
}

///For a monotonic skin or roofing feature, constrain every pair of
///adjacent lines from consecutive axial rows to print earlier-row first.
///Lines count as the same row when their axial projections are within
///half a line width; as adjacent when their radial spans overlap within
///1.1 line widths.
pub fn append_monotonic_constraints(
    feature: &FeatureExtrusion,
    mesh_settings: &MeshSettings,
    layer_index: usize,
    constraints: &mut SequenceConstraints,
) {
    let angles = match feature.feature_type() {
        PrintFeatureType::Roof if mesh_settings.roofing_monotonic => {
            &mesh_settings.roofing_angles
        }
        PrintFeatureType::Skin if mesh_settings.skin_monotonic => &mesh_settings.skin_angles,
        _ => return,
    };

    let angle = if angles.is_empty() {
        AngleDegrees(45.0)
    } else {
        AngleDegrees(angles[layer_index % angles.len()])
    };

    let same_line_distance = feature.line_width() as f64 * 0.5;
    let max_adjacent_distance = feature.line_width() as f64 * 1.1;

    append_monotonic_constraints_with(
        feature,
        angle,
        same_line_distance,
        max_adjacent_distance,
        constraints,
    );
}

pub fn append_monotonic_constraints_with(
    feature: &FeatureExtrusion,
    angle: AngleDegrees,
    same_line_distance: f64,
    max_adjacent_distance: f64,
    constraints: &mut SequenceConstraints,
) {
    let angle_radians = AngleRadians::from(angle);
    let axial_vector = DVec2::new(-angle_radians.0.cos(), angle_radians.0.sin());
    let radial_vector = axial_vector.perp();

    let mut projected: Vec<ProjectedSequence> = Vec::new();
    for (sequence_index, sequence) in feature.sequences().enumerate() {
        let (Some(start), Some(end)) =
            (sequence.find_start_position(), sequence.find_end_position())
        else {
            continue;
        };

        let start_xy = DVec2::new(start.x as f64, start.y as f64);
        let end_xy = DVec2::new(end.x as f64, end.y as f64);

        let start_projection = axial_vector.dot(start_xy);
        let end_projection = axial_vector.dot(end_xy);

        let radial_start = radial_vector.dot(start_xy);
        let radial_end = radial_vector.dot(end_xy);

        projected.push(ProjectedSequence {
            sequence_index,
            // The projection of a line is its earlier endpoint's.
            axial_projection: start_projection.min(end_projection),
            radial_projection_min: radial_start.min(radial_end),
            radial_projection_max: radial_start.max(radial_end),
        });
    }

    projected.sort_by(|a, b| a.axial_projection.total_cmp(&b.axial_projection));

    // Group into axial rows of lines that are as good as collinear.
    let mut rows: Vec<Vec<&ProjectedSequence>> = Vec::new();
    for sequence in &projected {
        match rows.last_mut() {
            Some(row)
                if sequence.axial_projection
                    - row.last().expect("rows are never empty").axial_projection
                    < same_line_distance =>
            {
                row.push(sequence);
            }
            _ => rows.push(vec![sequence]),
        }
    }

    for row_pair in rows.windows(2) {
        let previous_row = &row_pair[0];
        let next_row = &row_pair[1];
        for previous in previous_row.iter() {
            for next in next_row.iter() {
                let adjacent = previous.radial_projection_min - next.radial_projection_max
                    <= max_adjacent_distance
                    && next.radial_projection_min - previous.radial_projection_max
                        <= max_adjacent_distance;
                if adjacent {
                    insert_constraint(
                        constraints,
                        previous.sequence_index,
                        next.sequence_index,
                    );
                }
            }
        }
    }
}

///Add `before -> after`, unless the edge would close a cycle; a cyclic
///edge is dropped with a warning.
fn insert_constraint(constraints: &mut SequenceConstraints, before: usize, after: usize) {
    if reaches(constraints, after, before) {
        warn!(
            "dropping ordering constraint {before} -> {after}: it would create a cycle"
        );
        return;
    }
    constraints.entry(before).or_default().insert(after);
}

fn reaches(constraints: &SequenceConstraints, from: usize, to: usize) -> bool {
    if from == to {
        return true;
    }
    let mut stack = vec![from];
    let mut seen = BTreeSet::new();
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        if let Some(successors) = constraints.get(&node) {
            for successor in successors {
                if *successor == to {
                    return true;
                }
                stack.push(*successor);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point3, Velocity};
    use crate::plan::{ContinuousExtruderMoveSequence, ExtrusionMove, FeatureKind};

    fn wall(feature_type: PrintFeatureType, inset_index: usize) -> FeatureExtrusion {
        FeatureExtrusion::new(
            feature_type,
            400,
            FeatureKind::Wall {
                mesh_index: 0,
                inset_index,
            },
        )
    }

    fn mesh_feature(feature_type: PrintFeatureType) -> FeatureExtrusion {
        FeatureExtrusion::new(feature_type, 400, FeatureKind::Mesh { mesh_index: 0 })
    }

    fn line_sequence(y: i64) -> ContinuousExtruderMoveSequence {
        let mut sequence = ContinuousExtruderMoveSequence::open(Point3::new(0, y, 0));
        sequence.append_extrusion_move(ExtrusionMove::new(
            Point3::new(10_000, y, 0),
            400,
            Velocity(30.0),
        ));
        sequence
    }

    #[test]
    fn bed_adhesion_forces_everything_after_skirt() {
        let features = vec![
            FeatureExtrusion::new(PrintFeatureType::SkirtBrim, 400, FeatureKind::Plain),
            wall(PrintFeatureType::OuterWall, 0),
            mesh_feature(PrintFeatureType::Infill),
        ];
        let mut after = BTreeSet::new();
        append_bed_adhesion_constraints(0, &features, &mut after);
        assert_eq!(after, BTreeSet::from([1, 2]));
    }

    #[test]
    fn inside_out_walls_chain_outward() {
        let features = vec![
            wall(PrintFeatureType::OuterWall, 0),
            wall(PrintFeatureType::InnerWall, 1),
        ];
        let settings = MeshSettings::default();

        // Inset 1 must print before inset 0: inset 0 comes after it.
        let mut after = BTreeSet::new();
        append_mesh_features_constraints(1, &features, &settings, &mut after);
        assert_eq!(after, BTreeSet::from([0]));

        let mut after = BTreeSet::new();
        append_mesh_features_constraints(0, &features, &settings, &mut after);
        assert!(after.is_empty());
    }

    #[test]
    fn infill_before_walls_reverses_order() {
        let features = vec![
            wall(PrintFeatureType::OuterWall, 0),
            mesh_feature(PrintFeatureType::Infill),
        ];

        let mut settings = MeshSettings::default();
        settings.infill_before_walls = true;
        let mut after = BTreeSet::new();
        append_mesh_features_constraints(1, &features, &settings, &mut after);
        assert_eq!(after, BTreeSet::from([0]));

        settings.infill_before_walls = false;
        let mut after = BTreeSet::new();
        append_mesh_features_constraints(0, &features, &settings, &mut after);
        assert_eq!(after, BTreeSet::from([1]));
    }

    #[test]
    fn monotonic_rows_constrain_adjacent_lines() {
        let mut feature =
            FeatureExtrusion::new(PrintFeatureType::Roof, 400, FeatureKind::Mesh { mesh_index: 0 });
        feature.append_sequence(line_sequence(0));
        feature.append_sequence(line_sequence(380));
        feature.append_sequence(line_sequence(50_000));

        let mut constraints = SequenceConstraints::new();
        // With a 90° direction the y offsets become the axial rows.
        append_monotonic_constraints_with(
            &feature,
            AngleDegrees(90.0),
            200.0,
            440.0,
            &mut constraints,
        );

        // Each row is chained to the next one: 0 -> 1 -> 2.
        assert_eq!(constraints.get(&0), Some(&BTreeSet::from([1])));
        assert_eq!(constraints.get(&1), Some(&BTreeSet::from([2])));
        assert_eq!(constraints.len(), 2);
    }

    #[test]
    fn cyclic_edge_is_dropped() {
        let mut constraints = SequenceConstraints::new();
        insert_constraint(&mut constraints, 0, 1);
        insert_constraint(&mut constraints, 1, 2);
        insert_constraint(&mut constraints, 2, 0);
        assert!(!constraints.contains_key(&2));
    }
}
