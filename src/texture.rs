use std::collections::BTreeMap;

use crate::geometry::Point2;

///A bit field inside a texture pixel; several painted features share the
///32 bits of one pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureBitField {
    ///Index of the first bit of the field.
    pub bit_range_start: u32,
    ///Index of the last bit of the field.
    pub bit_range_end: u32,
}

///Bit field description for every feature stored in a painted texture.
pub type TextureDataMapping = BTreeMap<String, TextureBitField>;

///What a painted area means for seam placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureArea {
    Normal,
    Preferred,
    Avoid,
}

impl TextureArea {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Normal),
            1 => Some(Self::Preferred),
            2 => Some(Self::Avoid),
            _ => None,
        }
    }
}

///Extract the bits of a field by shifting the pixel left then right,
///which inserts zeroes on both sides. Out-of-range fields are clamped to
///the pixel width.
pub fn extract_bits(pixel: u32, field: &TextureBitField) -> u32 {
    let end = field.bit_range_end.min(31);
    let start = field.bit_range_start.min(end);
    (pixel << (32 - 1 - end)) >> (32 - 1 - (end - start))
}

///Source of painted per-position texture values. The UV unwrapping and
///image sampling live outside the planning core; the core only asks for
///the value of a named feature at a 2D position.
pub trait TextureDataProvider {
    fn value_at(&self, position: Point2, feature: &str) -> Option<u32>;

    fn area_preference(&self, position: Point2, feature: &str) -> Option<TextureArea> {
        self.value_at(position, feature)
            .and_then(TextureArea::from_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_inner_bit_range() {
        let field = TextureBitField {
            bit_range_start: 2,
            bit_range_end: 4,
        };
        // Bits 2..=4 of 0b10110100 are 0b101.
        assert_eq!(extract_bits(0b1011_0100, &field), 0b101);
    }

    #[test]
    fn extracts_full_width_range() {
        let field = TextureBitField {
            bit_range_start: 0,
            bit_range_end: 31,
        };
        assert_eq!(extract_bits(0xdead_beef, &field), 0xdead_beef);
    }
}
