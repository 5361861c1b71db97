use crate::geometry::point::Point2;
use crate::snapshot::UnitTag;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq)]
pub enum CoreError {
    #[error("deposits {kept} and {reported} reported within the same tile at {kept_pos:?} / {reported_pos:?}")]
    DepositCollision {
        kept: UnitTag,
        kept_pos: Point2,
        reported: UnitTag,
        reported_pos: Point2,
    },
    #[error("grid of {width}x{height} tiles cannot be built from {tile_count} tiles")]
    GridDimensionMismatch {
        width: i32,
        height: i32,
        tile_count: usize,
    },
}
