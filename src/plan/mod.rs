mod config;
mod extruder;
mod feature;
mod layer;
mod moves;
mod operation;
mod print;
mod sequence;

pub use config::{GCodePathConfig, PathConfigStorage};
pub use extruder::{ExtruderOperation, ExtruderPlan};
pub use feature::{FeatureExtrusion, FeatureKind, FeatureOperation};
pub use layer::{LayerOperation, LayerPlan};
pub use moves::{ExtruderChange, ExtrusionMove, TravelMove, TravelRoute};
pub use operation::{
    search_depth, OperationMut, OperationRef, PrintOperation, PrintOperationSequence,
    PrintOperationTransformer,
};
pub use print::PrintPlan;
pub use sequence::{ContinuousExtruderMoveSequence, SequenceMove};

use serde::{Deserialize, Serialize};
use strum_macros::{EnumCount, EnumIter};

///What a set of moves is printing. Travels carry the combing/retraction
///types, everything else is deposited material.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, EnumCount, EnumIter,
)]
pub enum PrintFeatureType {
    #[default]
    NoneType,
    OuterWall,
    InnerWall,
    Skin,
    Roof,
    Infill,
    SkirtBrim,
    Support,
    SupportInfill,
    SupportInterface,
    PrimeTower,
    MoveCombing,
    MoveRetraction,
}

impl std::fmt::Display for PrintFeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrintFeatureType::NoneType => write!(f, "None"),
            PrintFeatureType::OuterWall => write!(f, "Outer Wall"),
            PrintFeatureType::InnerWall => write!(f, "Inner Wall"),
            PrintFeatureType::Skin => write!(f, "Skin"),
            PrintFeatureType::Roof => write!(f, "Roof"),
            PrintFeatureType::Infill => write!(f, "Infill"),
            PrintFeatureType::SkirtBrim => write!(f, "Skirt/Brim"),
            PrintFeatureType::Support => write!(f, "Support"),
            PrintFeatureType::SupportInfill => write!(f, "Support Infill"),
            PrintFeatureType::SupportInterface => write!(f, "Support Interface"),
            PrintFeatureType::PrimeTower => write!(f, "Prime Tower"),
            PrintFeatureType::MoveCombing => write!(f, "Travel"),
            PrintFeatureType::MoveRetraction => write!(f, "Retraction Travel"),
        }
    }
}

///Traversal direction for searches over a plan's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOrder {
    Forward,
    Backward,
}
