use crate::geometry::Point2;
use crate::texture::{TextureArea, TextureDataProvider};

use super::ScoringCriterion;

///Scores candidates by the seam preference painted into a texture:
///preferred areas score 1, avoided ones 0, everything else is neutral.
pub struct TextureScoringCriterion<'a> {
    points: Vec<Point2>,
    provider: &'a dyn TextureDataProvider,
    feature_name: &'a str,
}

impl<'a> TextureScoringCriterion<'a> {
    pub fn new(
        points: Vec<Point2>,
        provider: &'a dyn TextureDataProvider,
        feature_name: &'a str,
    ) -> Self {
        Self {
            points,
            provider,
            feature_name,
        }
    }
}

impl ScoringCriterion for TextureScoringCriterion<'_> {
    fn score(&self, candidate_index: usize) -> f64 {
        match self
            .provider
            .area_preference(self.points[candidate_index], self.feature_name)
        {
            Some(TextureArea::Preferred) => 1.0,
            Some(TextureArea::Avoid) => 0.0,
            Some(TextureArea::Normal) | None => 0.5,
        }
    }
}
