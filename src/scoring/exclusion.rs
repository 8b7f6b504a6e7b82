use geo::{Contains, MultiPolygon, Point};

use crate::geometry::Point2;

use super::ScoringCriterion;

///Scores candidates inside an exclusion area (mm) with 0 and the others
///with 1, so the weighted sum steers seams out of the area.
pub struct ExclusionAreaScoringCriterion<'a> {
    points: Vec<Point2>,
    exclusion_area: &'a MultiPolygon<f64>,
}

impl<'a> ExclusionAreaScoringCriterion<'a> {
    pub fn new(points: Vec<Point2>, exclusion_area: &'a MultiPolygon<f64>) -> Self {
        Self {
            points,
            exclusion_area,
        }
    }
}

impl ScoringCriterion for ExclusionAreaScoringCriterion<'_> {
    fn score(&self, candidate_index: usize) -> f64 {
        let position = self.points[candidate_index].to_mm();
        if self
            .exclusion_area
            .contains(&Point::new(position.x, position.y))
        {
            0.0
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn inside_scores_zero_outside_scores_one() {
        let area = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ]]);
        let criterion = ExclusionAreaScoringCriterion::new(
            vec![Point2::new(5_000, 5_000), Point2::new(20_000, 20_000)],
            &area,
        );
        assert_eq!(criterion.score(0), 0.0);
        assert_eq!(criterion.score(1), 1.0);
    }
}
