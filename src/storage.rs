use geo::MultiPolygon;

use crate::geometry::{Micron, Point2};
use crate::settings::MeshSettings;

///A point of a variable-width toolpath, with the line width at that point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtrusionJunction {
    pub position: Point2,
    pub width: Micron,
}

impl ExtrusionJunction {
    pub fn new(position: Point2, width: Micron) -> Self {
        Self { position, width }
    }
}

///One variable-width line produced by the wall generator, closed for
///polygonal walls and open for gap-filling strands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtrusionLine {
    pub junctions: Vec<ExtrusionJunction>,
    pub closed: bool,
    ///Which wall this line belongs to; 0 is the outer wall.
    pub inset_index: usize,
}

impl ExtrusionLine {
    pub fn is_empty(&self) -> bool {
        self.junctions.is_empty()
    }
}

///The skin of one region of a part at one layer, mm coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct SkinPart {
    ///Area covered by roofing (skin with only air above).
    pub roofing_area: MultiPolygon<f64>,
    ///Area covered by regular top/bottom skin.
    pub top_bottom_area: MultiPolygon<f64>,
}

impl Default for SkinPart {
    fn default() -> Self {
        Self {
            roofing_area: MultiPolygon(Vec::new()),
            top_bottom_area: MultiPolygon(Vec::new()),
        }
    }
}

///A connected region of a mesh at one layer, with the toolpath inputs the
///external collaborators computed for it.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerPart {
    ///The region outline in mm, from the geometry library.
    pub outline: MultiPolygon<f64>,
    ///Variable-width wall toolpaths, all insets flattened together.
    pub wall_toolpaths: Vec<ExtrusionLine>,
    pub skin_parts: Vec<SkinPart>,
    ///The area left over for sparse infill, mm.
    pub infill_area: MultiPolygon<f64>,
}

impl Default for LayerPart {
    fn default() -> Self {
        Self {
            outline: MultiPolygon(Vec::new()),
            wall_toolpaths: Vec::new(),
            skin_parts: Vec::new(),
            infill_area: MultiPolygon(Vec::new()),
        }
    }
}

impl LayerPart {
    pub fn new(outline: MultiPolygon<f64>) -> Self {
        Self {
            outline,
            ..Self::default()
        }
    }
}

///One sliced layer of one mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshLayer {
    pub parts: Vec<LayerPart>,
}

///A sliced mesh with its settings.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshStorage {
    pub name: String,
    pub settings: MeshSettings,
    pub layers: Vec<MeshLayer>,
}

impl MeshStorage {
    pub fn new(name: impl Into<String>, settings: MeshSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            layers: Vec::new(),
        }
    }

    pub fn part_count_at(&self, layer_index: usize) -> usize {
        self.layers
            .get(layer_index)
            .map_or(0, |layer| layer.parts.len())
    }
}

///Vertical position of one layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerInfo {
    pub z: Micron,
    pub thickness: Micron,
}

///Everything the slicing stages produced for a build: the meshes with
///their per-layer parts, plus the global layer table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SliceDataStorage {
    pub meshes: Vec<MeshStorage>,
    pub layers: Vec<LayerInfo>,
}

impl SliceDataStorage {
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    ///Extruders referenced by any mesh or by bed adhesion; the planner
    ///creates one extruder plan per entry and layer.
    pub fn used_extruders(&self, adhesion_extruder_nr: u8) -> Vec<u8> {
        let mut extruders = std::collections::BTreeSet::new();
        extruders.insert(adhesion_extruder_nr);
        for mesh in &self.meshes {
            extruders.insert(mesh.settings.wall_0_extruder_nr);
            extruders.insert(mesh.settings.wall_x_extruder_nr);
            extruders.insert(mesh.settings.skin_extruder_nr);
            extruders.insert(mesh.settings.infill_extruder_nr);
        }
        extruders.into_iter().collect()
    }
}
