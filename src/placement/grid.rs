use crate::geometry::point::Point2;
use crate::geometry::rect::TileRect;
use crate::placement::footprint::{FootprintCache, FootprintSize};
use crate::placement::tile_grid::TileGrid;
use crate::snapshot::{Snapshot, Unit, UnitTag};
use derive_more::Constructor;
use rustc_hash::FxHashMap;

/// The tile-aligned rectangle a tracked structure occupies.
#[derive(Copy, Clone, Debug, PartialEq, Constructor)]
struct StructureFootprint {
    pos: Point2,
    size: FootprintSize,
}

/// Maintains the live buildable bitmap: the static terrain layer overlaid
/// with the footprints of currently present structures.
#[derive(Debug)]
pub struct PlacementGrid {
    terrain: TileGrid,
    grid: TileGrid,
    structures: FxHashMap<UnitTag, StructureFootprint>,
    sizes: FootprintCache,
}

impl PlacementGrid {
    pub fn new(terrain: TileGrid) -> Self {
        PlacementGrid {
            grid: terrain.clone(),
            terrain,
            structures: FxHashMap::default(),
            sizes: FootprintCache::default(),
        }
    }

    /// The static terrain-derived layer, without structure overlays.
    pub fn terrain(&self) -> &TileGrid {
        &self.terrain
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Reconciles tracked structure footprints with the snapshot. Structures
    /// that disappeared or changed position, type or size have their region
    /// restored to buildable; new ones get their region marked.
    pub fn refresh(&mut self, snapshot: &Snapshot) {
        let present: FxHashMap<UnitTag, &Unit> = snapshot
            .units
            .iter()
            .filter(|u| u.is_structure())
            .map(|u| (u.tag, u))
            .collect();

        let mut dropped = Vec::new();
        for (&tag, &footprint) in self.structures.iter() {
            let unchanged = present.get(&tag).is_some_and(|&u| {
                u.pos == footprint.pos && self.sizes.size_of(u) == footprint.size
            });
            if !unchanged {
                dropped.push((tag, footprint));
            }
        }
        for (tag, footprint) in dropped {
            self.mark(footprint.pos, footprint.size, true);
            self.structures.remove(&tag);
        }

        for (&tag, &unit) in present.iter() {
            if !self.structures.contains_key(&tag) {
                let footprint = StructureFootprint::new(unit.pos, self.sizes.size_of(unit));
                self.mark(footprint.pos, footprint.size, false);
                self.structures.insert(tag, footprint);
            }
        }
    }

    /// Whether a footprint of the given size can currently be placed with its
    /// center at `pos`. Pure read.
    pub fn can_place(&self, size: FootprintSize, pos: Point2) -> bool {
        self.check(pos, size, true)
    }

    fn mark(&mut self, pos: Point2, size: FootprintSize, value: bool) {
        for (x, y) in TileRect::footprint(pos, size).iter() {
            self.grid.set(x, y, value);
        }
    }

    fn check(&self, pos: Point2, size: FootprintSize, value: bool) -> bool {
        TileRect::footprint(pos, size)
            .iter()
            .all(|(x, y)| self.grid.get(x, y) == value)
    }
}
