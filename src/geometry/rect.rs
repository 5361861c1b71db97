use crate::geometry::point::Point2;
use crate::placement::footprint::FootprintSize;

/// A tile-aligned rectangle with exclusive upper bounds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TileRect {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl TileRect {
    /// The tiles covered by a footprint of the given size centered at `pos`.
    pub fn footprint(pos: Point2, size: FootprintSize) -> Self {
        let x_min = (pos.x - size.x as f32 / 2.0) as i32;
        let y_min = (pos.y - size.y as f32 / 2.0) as i32;
        TileRect {
            x_min,
            y_min,
            x_max: x_min + size.x,
            y_max: y_min + size.y,
        }
    }

    pub fn width(self) -> i32 {
        self.x_max - self.x_min
    }

    pub fn height(self) -> i32 {
        self.y_max - self.y_min
    }

    pub fn iter(self) -> impl Iterator<Item = (i32, i32)> {
        (self.y_min..self.y_max).flat_map(move |y| (self.x_min..self.x_max).map(move |x| (x, y)))
    }
}
