mod extruder_change;
mod travel;

pub use extruder_change::ExtruderChangeAppender;
pub use travel::TravelMovesInserter;
