use thiserror::Error;

///Errors that abort a planning run. Degenerate geometry is never reported
///here, it is skipped and logged where it is encountered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("initial layer height must be positive, got {value} mm")]
    InvalidInitialLayerHeight { value: f64 },

    #[error("layer height must be positive, got {value} mm")]
    InvalidLayerHeight { value: f64 },

    #[error("the bounding box of the model is empty")]
    EmptyBoundingBox,

    #[error("setting {setting} must be greater than zero, got {value}")]
    SettingNotPositive { setting: String, value: f64 },

    #[error("failed to parse settings: {message}")]
    SettingsParse { message: String },

    #[error("layer {layer_index} has no extruder plan for extruder {extruder_nr}")]
    MissingExtruderPlan {
        layer_index: usize,
        extruder_nr: u8,
    },
}
