use crate::geometry::{micron_to_mm, Point2};

use super::ScoringCriterion;

///Which distance is measured against the target position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceType {
    Euclidean,
    XOnly,
    YOnly,
}

///Scores candidates decreasingly by their distance to a target position.
///The divider shapes the distribution: the closest expected distance should
///score near 1.0 and a medium-far one near 0.5.
pub struct DistanceScoringCriterion {
    points: Vec<Point2>,
    target: Point2,
    distance_type: DistanceType,
    distance_divider: f64,
}

impl DistanceScoringCriterion {
    ///Default divider for shortest-distance style selection.
    pub const SHORTEST_DIVIDER: f64 = 20.0;

    pub fn new(points: Vec<Point2>, target: Point2, distance_type: DistanceType) -> Self {
        Self::with_divider(points, target, distance_type, Self::SHORTEST_DIVIDER)
    }

    pub fn with_divider(
        points: Vec<Point2>,
        target: Point2,
        distance_type: DistanceType,
        distance_divider: f64,
    ) -> Self {
        Self {
            points,
            target,
            distance_type,
            distance_divider,
        }
    }
}

impl ScoringCriterion for DistanceScoringCriterion {
    fn score(&self, candidate_index: usize) -> f64 {
        let candidate = self.points[candidate_index];

        let distance = match self.distance_type {
            // Actual distance rather than squared, for a usable distribution.
            DistanceType::Euclidean => micron_to_mm((candidate - self.target).vsize()),
            DistanceType::XOnly => micron_to_mm((candidate.x - self.target.x).abs()),
            DistanceType::YOnly => micron_to_mm((candidate.y - self.target.y).abs()),
        };

        1.0 / (1.0 + distance / self.distance_divider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closer_candidates_score_higher() {
        let criterion = DistanceScoringCriterion::new(
            vec![Point2::new(0, 0), Point2::new(50_000, 0)],
            Point2::new(0, 0),
            DistanceType::Euclidean,
        );
        assert_eq!(criterion.score(0), 1.0);
        assert!(criterion.score(1) < criterion.score(0));
    }

    #[test]
    fn axis_distances_ignore_other_axis() {
        let criterion = DistanceScoringCriterion::new(
            vec![Point2::new(0, 99_000), Point2::new(1_000, 0)],
            Point2::new(0, 0),
            DistanceType::XOnly,
        );
        assert!(criterion.score(0) > criterion.score(1));
    }
}
