pub mod backend;
pub mod bases;
pub mod config;
pub mod consts;
pub mod errors;
pub mod geometry;
pub mod logging;
pub mod placement;
pub mod snapshot;

pub use backend::{Action, Command, PathingOracle, PlacementOracle};
pub use bases::manager::BaseManager;
pub use bases::site::Site;
pub use errors::CoreError;
pub use placement::grid::PlacementGrid;
pub use placement::tile_grid::TileGrid;
pub use snapshot::Snapshot;
