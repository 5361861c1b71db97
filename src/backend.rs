use crate::geometry::point::Point2;
use crate::snapshot::UnitTag;
use derive_more::Constructor;

/// Ground pathing distance queries answered by the simulation backend.
///
/// The backend is known to occasionally fail a query or return different
/// results depending on query direction, so callers submit both directions of
/// a pair and resolve the answers conservatively.
pub trait PathingOracle {
    /// One reply per requested `(start, end)` pair, in order. `None` when the
    /// backend could not produce a usable distance for that pair.
    fn pathing_distances(&mut self, pairs: &[(Point2, Point2)]) -> Vec<Option<f32>>;
}

/// Ground-truth placement validity queries. Only used to cross-check the
/// occupancy raster, never on the per-step hot path.
pub trait PlacementOracle {
    /// One reply per probed position, in order. `true` means the backend
    /// would allow a placement there.
    fn placement_allowed(&mut self, probes: &[Point2]) -> Vec<bool>;
}

/// An order to a single unit, produced by the per-step update and submitted
/// to the backend by the surrounding process.
#[derive(Copy, Clone, Debug, PartialEq, Constructor)]
pub struct Command {
    pub unit: UnitTag,
    pub action: Action,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Action {
    /// Harvest the given resource or gas building.
    Gather(UnitTag),
    /// Return carried resources to the nearest town hall.
    ReturnCargo,
    /// Move to a position and idle there.
    MoveTo(Point2),
}
