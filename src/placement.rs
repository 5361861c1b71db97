pub mod footprint;
pub mod grid;
pub mod tile_grid;
pub mod verify;
