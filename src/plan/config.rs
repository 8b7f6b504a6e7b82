use crate::geometry::{Micron, Ratio, SpeedDerivatives};

use super::PrintFeatureType;

///Default printing parameters for one class of feature.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GCodePathConfig {
    pub speed_derivatives: SpeedDerivatives,
    pub line_width: Micron,
    pub flow_ratio: Ratio,
}

impl GCodePathConfig {
    pub fn new(speed_derivatives: SpeedDerivatives, line_width: Micron) -> Self {
        Self {
            speed_derivatives,
            line_width,
            flow_ratio: Ratio(1.0),
        }
    }
}

///The per-feature default configs of a layer, shared read-only between the
///layer plan's children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathConfigStorage {
    pub outer_wall: GCodePathConfig,
    pub inner_wall: GCodePathConfig,
    pub skin: GCodePathConfig,
    pub roof: GCodePathConfig,
    pub infill: GCodePathConfig,
    pub skirt_brim: GCodePathConfig,
    pub support: GCodePathConfig,
    pub travel: SpeedDerivatives,
}

impl PathConfigStorage {
    pub fn config_for(&self, feature_type: PrintFeatureType) -> &GCodePathConfig {
        match feature_type {
            PrintFeatureType::OuterWall => &self.outer_wall,
            PrintFeatureType::InnerWall => &self.inner_wall,
            PrintFeatureType::Skin => &self.skin,
            PrintFeatureType::Roof => &self.roof,
            PrintFeatureType::Infill | PrintFeatureType::SupportInfill => &self.infill,
            PrintFeatureType::SkirtBrim => &self.skirt_brim,
            PrintFeatureType::Support
            | PrintFeatureType::SupportInterface
            | PrintFeatureType::PrimeTower => &self.support,
            PrintFeatureType::NoneType
            | PrintFeatureType::MoveCombing
            | PrintFeatureType::MoveRetraction => &self.infill,
        }
    }
}
