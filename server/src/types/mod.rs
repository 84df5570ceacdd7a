mod placement_row;

pub use placement_row::PlacementRow;
