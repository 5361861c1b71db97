use crate::errors::CoreError;
use std::fmt::{Display, Formatter};

/// A map-sized boolean bitmap, one value per tile. `true` means buildable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TileGrid {
    width: i32,
    height: i32,
    tiles: Vec<bool>,
}

impl TileGrid {
    pub fn new(width: i32, height: i32, fill: bool) -> Self {
        TileGrid {
            width,
            height,
            tiles: vec![fill; (width * height).max(0) as usize],
        }
    }

    /// Builds a grid from row-major tile data, e.g. decoded from the
    /// backend's static terrain layer.
    pub fn from_tiles(width: i32, height: i32, tiles: Vec<bool>) -> Result<Self, CoreError> {
        if width < 0 || height < 0 || (width * height) as usize != tiles.len() {
            return Err(CoreError::GridDimensionMismatch {
                width,
                height,
                tile_count: tiles.len(),
            });
        }
        Ok(TileGrid {
            width,
            height,
            tiles,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Out-of-bounds tiles read as not buildable.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.tiles[(y * self.width + x) as usize]
    }

    /// Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        self.tiles[(y * self.width + x) as usize] = value;
    }
}

impl Display for TileGrid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                write!(f, "{}", if self.get(x, y) { '.' } else { '#' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
