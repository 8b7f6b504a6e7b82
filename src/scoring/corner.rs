use crate::geometry::{inverse_lerp, Micron, Point2};
use crate::seam::CornerPreference;

use super::ScoringCriterion;

///How far to walk along the path on each side of a vertex when measuring
///its corner angle.
const ANGLE_QUERY_DISTANCE: Micron = 1_000;

///Scores the vertices of a closed path by how sharp their corner is,
///mapped through a corner preference. The angle at a vertex is measured
///between two neighbour points found by walking a fixed arc distance along
///the path in both directions, which makes corners spread over several
///close vertices register at full strength.
pub struct CornerScoringCriterion {
    points: Vec<Point2>,
    corner_preference: CornerPreference,
    segment_sizes: Vec<Micron>,
    total_length: Micron,
}

impl CornerScoringCriterion {
    pub fn new(points: Vec<Point2>, corner_preference: CornerPreference) -> Self {
        let mut segment_sizes = Vec::with_capacity(points.len());
        let mut total_length = 0;
        for (index, here) in points.iter().enumerate() {
            let next = points[(index + 1) % points.len()];
            let segment_size = (next - *here).vsize();
            segment_sizes.push(segment_size);
            total_length += segment_size;
        }

        Self {
            points,
            corner_preference,
            segment_sizes,
            total_length,
        }
    }

    ///The normalised corner angle at a vertex, in `[-1, 1]`. Negative is
    ///concave (left turning), positive is convex (right turning).
    fn corner_angle(&self, vertex_index: usize) -> f64 {
        let bounded_distance = ANGLE_QUERY_DISTANCE.min(self.total_length / 2);
        let here = self.points[vertex_index];
        let next = self.find_neighbour_point(vertex_index, bounded_distance);
        let previous = self.find_neighbour_point(vertex_index, -bounded_distance);

        let angle = angle_left(previous, here, next) - std::f64::consts::PI;
        angle / std::f64::consts::PI
    }

    ///Walk `distance` along the path from the vertex (negative walks
    ///backwards) and return the point reached, interpolating within the
    ///final segment.
    fn find_neighbour_point(&self, vertex_index: usize, distance: Micron) -> Point2 {
        let size = self.points.len() as i64;
        let direction: i64 = if distance > 0 { 1 } else { -1 };
        let size_delta: i64 = if distance > 0 { -1 } else { 0 };
        let distance = distance.abs();

        let mut actual_delta: i64 = 0;
        let mut travelled_distance: Micron = 0;
        let mut segment_size: Micron = 0;
        while travelled_distance < distance {
            actual_delta += direction;
            segment_size = self.segment_sizes
                [((vertex_index as i64 + actual_delta + size_delta).rem_euclid(size)) as usize];
            travelled_distance += segment_size;
        }

        let next_pos = self.points[((vertex_index as i64 + actual_delta).rem_euclid(size)) as usize];

        if travelled_distance > distance && segment_size > 0 {
            // Overshot: come back along the last segment.
            let prev_pos = self.points
                [((vertex_index as i64 + actual_delta - direction).rem_euclid(size)) as usize];
            let vector = next_pos - prev_pos;
            let factor = (segment_size - (travelled_distance - distance)) as f64 / segment_size as f64;
            prev_pos + vector * factor
        } else {
            next_pos
        }
    }
}

impl ScoringCriterion for CornerScoringCriterion {
    fn score(&self, candidate_index: usize) -> f64 {
        let corner_angle = self.corner_angle(candidate_index);

        match self.corner_preference {
            // Advantage to concave corners, more for sharper ones.
            CornerPreference::Inner => inverse_lerp(1.0, -1.0, corner_angle),
            // Advantage to convex corners, more for sharper ones.
            CornerPreference::Outer => inverse_lerp(-1.0, 1.0, corner_angle),
            CornerPreference::Any => corner_angle.abs(),
            CornerPreference::Weighted => {
                if corner_angle < 0.0 {
                    -corner_angle
                } else {
                    corner_angle / 2.0
                }
            }
            CornerPreference::None => 0.0,
        }
    }
}

///The angle at `b`, measured counter-clockwise from `b->a` to `b->c`, in
///`[0, 2π)`.
fn angle_left(a: Point2, b: Point2, c: Point2) -> f64 {
    let ba = a - b;
    let bc = c - b;
    let dot = ba.dot(bc) as f64;
    let det = ba.cross(bc) as f64;
    let angle = -det.atan2(dot);
    if angle >= 0.0 {
        angle
    } else {
        2.0 * std::f64::consts::PI + angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    ///A clockwise-wound square with one concave notch at (4000, 2500).
    fn notched_square() -> Vec<Point2> {
        vec![
            Point2::new(0, 0),
            Point2::new(0, 5_000),
            Point2::new(5_000, 5_000),
            Point2::new(4_000, 2_500),
            Point2::new(5_000, 0),
        ]
    }

    #[test]
    fn inner_preference_selects_concave_notch() {
        let criterion = CornerScoringCriterion::new(notched_square(), CornerPreference::Inner);
        let best = (0..5)
            .max_by(|a, b| criterion.score(*a).total_cmp(&criterion.score(*b)))
            .unwrap();
        assert_eq!(best, 3);
    }

    #[test]
    fn outer_preference_avoids_concave_notch() {
        let criterion = CornerScoringCriterion::new(notched_square(), CornerPreference::Outer);
        let worst = (0..5)
            .min_by(|a, b| criterion.score(*a).total_cmp(&criterion.score(*b)))
            .unwrap();
        assert_eq!(worst, 3);
    }

    #[test]
    fn square_corners_score_equal() {
        let square = vec![
            Point2::new(0, 0),
            Point2::new(0, 10_000),
            Point2::new(10_000, 10_000),
            Point2::new(10_000, 0),
        ];
        let criterion = CornerScoringCriterion::new(square, CornerPreference::Inner);
        let scores: Vec<f64> = (0..4).map(|index| criterion.score(index)).collect();
        for score in &scores[1..] {
            assert!((score - scores[0]).abs() < 1e-9);
        }
    }

    #[test]
    fn none_preference_scores_zero() {
        let criterion = CornerScoringCriterion::new(notched_square(), CornerPreference::None);
        assert_eq!(criterion.score(0), 0.0);
    }
}
