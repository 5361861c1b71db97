use crate::snapshot::{Unit, UnitTypeId};
use derive_more::Constructor;
use log::debug;
use rustc_hash::FxHashMap;

/// Tile dimensions of a structure footprint.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Constructor)]
pub struct FootprintSize {
    pub x: i32,
    pub y: i32,
}

/// Per-unit-type memoized footprint inference. Footprints are assumed uniform
/// per type, so the first computed size for a type is definitive.
#[derive(Default, Debug)]
pub struct FootprintCache {
    sizes: FxHashMap<UnitTypeId, FootprintSize>,
}

impl FootprintCache {
    pub fn size_of(&mut self, unit: &Unit) -> FootprintSize {
        if let Some(size) = self.sizes.get(&unit.unit_type) {
            return *size;
        }

        let size = infer_size(unit);
        self.sizes.insert(unit.unit_type, size);
        debug!(
            "Inferred footprint of type {} at {} with radius {}: {}x{}.",
            unit.unit_type, unit.pos, unit.radius, size.x, size.y
        );
        size
    }
}

/// Estimates a structure's footprint from its reported radius. The radius is
/// unreliable and may differ between the four cardinal directions once tile
/// alignment is taken into account, so opposing extents are resolved to the
/// smaller one and a final parity correction keeps the box aligned.
fn infer_size(unit: &Unit) -> FootprintSize {
    // Round the position to the nearest half tile. Not needed except for
    // off-grid objects such as thrown charges.
    let x = ((unit.pos.x * 2.0 + 0.5) as i32) as f32 / 2.0;
    let y = ((unit.pos.y * 2.0 + 0.5) as i32) as f32 / 2.0;
    let x_even = ((unit.pos.x * 2.0 + 0.5) as i32) % 2 == 0;
    let y_even = ((unit.pos.y * 2.0 + 0.5) as i32) % 2 == 0;

    // Bounds based on the raw radius provided by the game.
    let x_min = (x - unit.radius + 0.5) as i32;
    let y_min = (y - unit.radius + 0.5) as i32;
    let x_max = (x + unit.radius + 0.5) as i32;
    let y_max = (y + unit.radius + 0.5) as i32;

    // The real extent in each of the four directions.
    let rx_min = x - x_min as f32;
    let ry_min = y - y_min as f32;
    let rx_max = x_max as f32 - x;
    let ry_max = y_max as f32 - y;

    // If opposing extents disagree, the smaller one is the safer estimate.
    let rx = rx_min.min(rx_max);
    let ry = ry_min.min(ry_max);

    // Recompute the bounds with the resolved extents.
    let mut x_min = (unit.pos.x - rx + 0.5) as i32;
    let mut y_min = (unit.pos.y - ry + 0.5) as i32;
    let mut x_max = (unit.pos.x + rx + 0.5) as i32;
    let mut y_max = (unit.pos.y + ry + 0.5) as i32;

    // Mixed tile parity between the axes would produce a misaligned box for
    // footprints expected to be square. Shrinking the inconsistent axis by
    // one tile is a workaround, not a verified geometric derivation.
    if x_even != y_even {
        if y_even {
            x_min += 1;
            x_max -= 1;
        } else {
            y_min += 1;
            y_max -= 1;
        }
    }

    FootprintSize::new(x_max - x_min, y_max - y_min)
}
