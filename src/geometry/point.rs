use derive_more::{Add, Sub};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A continuous map position in tile units.
#[derive(Add, Sub, Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Point2 { x, y }
    }

    pub fn distance(self, other: Point2) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Squared distance. Cheaper than `distance` and sufficient for nearest
    /// comparisons.
    pub fn distance_squared(self, other: Point2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Rounds down to the nearest half tile. Repeated queries land on the
    /// same key, which makes position-keyed memoization effective.
    pub fn to_half_tile(self) -> HalfTile {
        HalfTile {
            x: (self.x * 2.0) as i32,
            y: (self.y * 2.0) as i32,
        }
    }
}

impl Display for Point2 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1},{:.1})", self.x, self.y)
    }
}

/// A position quantized to half-tile resolution. Unlike `Point2`, it is
/// hashable and may key caches.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct HalfTile {
    pub x: i32,
    pub y: i32,
}
