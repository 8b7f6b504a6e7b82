use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::geometry::{Micron, Point2};

///Strategy for placing the seam of a closed toolpath.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum SeamType {
    ///Start wherever the travel is shortest.
    #[default]
    Shortest,
    ///Scatter the seam randomly around the loop.
    Random,
    ///Start as close as possible to a user-chosen point.
    UserSpecified,
    ///Start on the sharpest corner, hiding the seam in it.
    SharpestCorner,
    ///Placement is delegated to an external plugin.
    Plugin,
}

///Which kind of corner the sharpest-corner strategy should prefer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
pub enum CornerPreference {
    #[default]
    None,
    ///Concave corners.
    Inner,
    ///Convex corners.
    Outer,
    ///Sharpest corner, concave or convex.
    Any,
    ///Sharp corners, with concave ones weighted double.
    Weighted,
}

///The policy that decides where a closed move sequence is opened. The
///simplification only applies to the temporary polygon corners are
///detected on, never to the printed path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeamConfig {
    pub seam_type: SeamType,
    ///Position the user forced, for `UserSpecified`.
    pub user_point: Point2,
    pub corner_pref: CornerPreference,
    ///Simplification applied before corner detection, so that corners
    ///spread over many close vertices still register as sharp.
    pub simplify_curvature: Micron,
}

impl SeamConfig {
    pub fn new(seam_type: SeamType) -> Self {
        Self {
            seam_type,
            ..Self::default()
        }
    }

    pub fn sharpest_corner(corner_pref: CornerPreference) -> Self {
        Self {
            seam_type: SeamType::SharpestCorner,
            corner_pref,
            ..Self::default()
        }
    }
}
