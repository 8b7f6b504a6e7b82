use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::geometry::{mm_to_micron, Acceleration, Jerk, SpeedDerivatives, Velocity};
use crate::plan::{GCodePathConfig, PathConfigStorage, PrintFeatureType};
use crate::seam::SeamConfig;

macro_rules! setting_must_be_positive {
    ($settings:ident, $($field:ident).+) => {{
        if $settings.$($field).+ <= 0.0 {
            return Err(PlanError::SettingNotPositive {
                setting: stringify!($($field).+).to_string(),
                value: $settings.$($field).+,
            });
        }
    }};
}

///A value for every printable feature class. Used for speeds,
///accelerations, jerks and line widths alike.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MovementParameter {
    pub outer_wall: f64,
    pub inner_wall: f64,
    pub skin: f64,
    pub roof: f64,
    pub infill: f64,
    pub skirt_brim: f64,
    pub support: f64,
}

impl MovementParameter {
    pub fn get_for(&self, feature_type: PrintFeatureType) -> f64 {
        match feature_type {
            PrintFeatureType::OuterWall => self.outer_wall,
            PrintFeatureType::InnerWall => self.inner_wall,
            PrintFeatureType::Skin => self.skin,
            PrintFeatureType::Roof => self.roof,
            PrintFeatureType::Infill | PrintFeatureType::SupportInfill => self.infill,
            PrintFeatureType::SkirtBrim => self.skirt_brim,
            _ => self.support,
        }
    }
}

///Travel parameters of one extruder. The layer-0 values apply to the first
///layer and blend into the full values over the slowdown layers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ExtruderSettings {
    pub speed_travel: f64,
    pub speed_travel_layer_0: f64,
    pub acceleration_travel: f64,
    pub acceleration_travel_layer_0: f64,
    pub jerk_travel: f64,
    pub jerk_travel_layer_0: f64,
}

impl ExtruderSettings {
    pub fn travel_speed_full(&self) -> SpeedDerivatives {
        SpeedDerivatives {
            speed: Velocity(self.speed_travel),
            acceleration: Acceleration(self.acceleration_travel),
            jerk: Jerk(self.jerk_travel),
        }
    }

    pub fn travel_speed_initial(&self) -> SpeedDerivatives {
        SpeedDerivatives {
            speed: Velocity(self.speed_travel_layer_0),
            acceleration: Acceleration(self.acceleration_travel_layer_0),
            jerk: Jerk(self.jerk_travel_layer_0),
        }
    }
}

///Skirt/brim configuration. A count of zero disables the feature.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SkirtBrimSettings {
    pub line_count: usize,
    ///Gap between the model and the innermost loop, mm.
    pub distance: f64,
    pub extruder_nr: u8,
}

impl SkirtBrimSettings {
    pub fn is_enabled(&self) -> bool {
        self.line_count > 0
    }
}

///Adaptive layer height configuration, all heights in mm.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveLayerSettings {
    pub enabled: bool,
    ///0 is best quality (smallest steps), 1 is fastest.
    pub quality_factor: f64,
    pub min_layer_height: f64,
    pub max_layer_height: f64,
    ///Allowed deviation from the base height, legacy algorithm.
    pub max_variation: f64,
    ///Quantisation step of the legacy algorithm.
    pub variation_step: f64,
    ///Topography size the legacy algorithm tries to keep.
    pub threshold: f64,
}

///A complete settings profile for a planning run. Profiles loaded from
///HJSON may be partial; unnamed fields keep their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    ///Base layer height in mm.
    pub layer_height: f64,

    ///Height of the very first layer in mm.
    pub initial_layer_height: f64,

    ///Line widths per feature, mm.
    pub line_width: MovementParameter,

    ///Print speeds per feature, mm/s.
    pub speed: MovementParameter,

    ///Accelerations per feature, mm/s².
    pub acceleration: MovementParameter,

    ///Jerks per feature, mm/s.
    pub jerk: MovementParameter,

    ///Centre-to-centre distance between sparse infill lines, mm.
    pub infill_line_distance: f64,

    ///Number of layers over which travel speed ramps from the layer-0
    ///values to the full values.
    pub speed_slowdown_layers: usize,

    pub extruders: Vec<ExtruderSettings>,

    pub skirt_brim: SkirtBrimSettings,

    pub adaptive_layer_height: AdaptiveLayerSettings,

    ///Default seam policy for meshes that do not override it.
    pub seam: SeamConfig,
}

impl Settings {
    ///Parse a settings profile from HJSON text.
    pub fn from_hjson(text: &str) -> Result<Self, PlanError> {
        let settings: Settings =
            deser_hjson::from_str(text).map_err(|error| PlanError::SettingsParse {
                message: error.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.initial_layer_height <= 0.0 {
            return Err(PlanError::InvalidInitialLayerHeight {
                value: self.initial_layer_height,
            });
        }
        if self.layer_height <= 0.0 {
            return Err(PlanError::InvalidLayerHeight {
                value: self.layer_height,
            });
        }
        let settings = self;
        setting_must_be_positive!(settings, line_width.outer_wall);
        setting_must_be_positive!(settings, line_width.inner_wall);
        setting_must_be_positive!(settings, line_width.skin);
        setting_must_be_positive!(settings, line_width.infill);
        setting_must_be_positive!(settings, speed.outer_wall);
        setting_must_be_positive!(settings, speed.infill);
        Ok(())
    }

    pub fn extruder(&self, extruder_nr: u8) -> &ExtruderSettings {
        &self.extruders[extruder_nr as usize % self.extruders.len()]
    }

    fn feature_config(&self, feature_type: PrintFeatureType) -> GCodePathConfig {
        GCodePathConfig::new(
            SpeedDerivatives {
                speed: Velocity(self.speed.get_for(feature_type)),
                acceleration: Acceleration(self.acceleration.get_for(feature_type)),
                jerk: Jerk(self.jerk.get_for(feature_type)),
            },
            mm_to_micron(self.line_width.get_for(feature_type)),
        )
    }

    ///The shared per-feature path configs of a layer.
    pub fn path_configs(&self, layer_index: usize) -> PathConfigStorage {
        let travel_extruder = self.extruder(0);
        let travel = if layer_index == 0 {
            travel_extruder.travel_speed_initial()
        } else {
            travel_extruder.travel_speed_full()
        };

        PathConfigStorage {
            outer_wall: self.feature_config(PrintFeatureType::OuterWall),
            inner_wall: self.feature_config(PrintFeatureType::InnerWall),
            skin: self.feature_config(PrintFeatureType::Skin),
            roof: self.feature_config(PrintFeatureType::Roof),
            infill: self.feature_config(PrintFeatureType::Infill),
            skirt_brim: self.feature_config(PrintFeatureType::SkirtBrim),
            support: self.feature_config(PrintFeatureType::Support),
            travel,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        let widths = MovementParameter {
            outer_wall: 0.4,
            inner_wall: 0.4,
            skin: 0.4,
            roof: 0.4,
            infill: 0.4,
            skirt_brim: 0.4,
            support: 0.4,
        };
        Self {
            layer_height: 0.2,
            initial_layer_height: 0.27,
            line_width: widths,
            speed: MovementParameter {
                outer_wall: 30.0,
                inner_wall: 40.0,
                skin: 30.0,
                roof: 25.0,
                infill: 60.0,
                skirt_brim: 20.0,
                support: 40.0,
            },
            acceleration: MovementParameter {
                outer_wall: 3_000.0,
                inner_wall: 3_000.0,
                skin: 3_000.0,
                roof: 3_000.0,
                infill: 5_000.0,
                skirt_brim: 3_000.0,
                support: 5_000.0,
            },
            jerk: MovementParameter {
                outer_wall: 10.0,
                inner_wall: 10.0,
                skin: 10.0,
                roof: 10.0,
                infill: 15.0,
                skirt_brim: 10.0,
                support: 15.0,
            },
            infill_line_distance: 2.0,
            speed_slowdown_layers: 2,
            extruders: vec![ExtruderSettings {
                speed_travel: 150.0,
                speed_travel_layer_0: 50.0,
                acceleration_travel: 5_000.0,
                acceleration_travel_layer_0: 1_000.0,
                jerk_travel: 20.0,
                jerk_travel_layer_0: 10.0,
            }],
            skirt_brim: SkirtBrimSettings {
                line_count: 1,
                distance: 3.0,
                extruder_nr: 0,
            },
            adaptive_layer_height: AdaptiveLayerSettings {
                enabled: false,
                quality_factor: 0.5,
                min_layer_height: 0.1,
                max_layer_height: 0.3,
                max_variation: 0.1,
                variation_step: 0.02,
                threshold: 0.2,
            },
            seam: SeamConfig::default(),
        }
    }
}

///Per-mesh settings read by the feature generators and schedulers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MeshSettings {
    pub wall_line_count: usize,
    pub wall_0_extruder_nr: u8,
    pub wall_x_extruder_nr: u8,
    pub skin_extruder_nr: u8,
    pub infill_extruder_nr: u8,

    ///Print the infill of this mesh before its walls.
    pub infill_before_walls: bool,

    pub inset_direction: InsetDirection,

    ///Force monotonic ordering of roofing lines.
    pub roofing_monotonic: bool,

    ///Force monotonic ordering of top/bottom skin lines.
    pub skin_monotonic: bool,

    ///Skin line directions in degrees, cycled per layer.
    pub skin_angles: Vec<f64>,

    ///Roofing line directions in degrees, cycled per layer.
    pub roofing_angles: Vec<f64>,

    ///Infill line directions in degrees, cycled per layer.
    pub infill_angles: Vec<f64>,

    pub seam: SeamConfig,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            wall_line_count: 2,
            wall_0_extruder_nr: 0,
            wall_x_extruder_nr: 0,
            skin_extruder_nr: 0,
            infill_extruder_nr: 0,
            infill_before_walls: false,
            inset_direction: InsetDirection::InsideOut,
            roofing_monotonic: true,
            skin_monotonic: false,
            skin_angles: vec![45.0, 135.0],
            roofing_angles: vec![45.0, 135.0],
            infill_angles: vec![45.0],
            seam: SeamConfig::default(),
        }
    }
}

///Whether walls print from the innermost inset towards the outer wall, or
///the other way around.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsetDirection {
    #[default]
    InsideOut,
    OutsideIn,
}
