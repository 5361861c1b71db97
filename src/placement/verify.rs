use crate::backend::PlacementOracle;
use crate::geometry::point::Point2;
use crate::placement::grid::PlacementGrid;
use log::{info, warn};

/// Cross-checks the raster against the backend's placement query over a
/// square region of side `2 * radius` around `pos`. Each disagreeing tile is
/// logged at warn level. Returns the number of mismatches. Informational
/// only; the raster is not corrected.
pub fn verify_against<O>(grid: &PlacementGrid, oracle: &mut O, pos: Point2, radius: i32) -> usize
where
    O: PlacementOracle,
{
    let x_min = ((pos.x - radius as f32) as i32).max(1);
    let y_min = ((pos.y - radius as f32) as i32).max(1);
    let x_max = ((pos.x + radius as f32) as i32).min(grid.grid().width() - 1);
    let y_max = ((pos.y + radius as f32) as i32).min(grid.grid().height() - 1);

    let mut tiles = Vec::new();
    let mut probes = Vec::new();
    for y in y_min..y_max {
        for x in x_min..x_max {
            tiles.push((x, y));
            probes.push(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
        }
    }

    let replies = oracle.placement_allowed(&probes);
    if replies.len() != probes.len() {
        warn!(
            "Placement oracle returned {} replies for {} probes.",
            replies.len(),
            probes.len()
        );
    }

    let mut mismatches = 0;
    for (&(x, y), &allowed) in tiles.iter().zip(replies.iter()) {
        if allowed != grid.grid().get(x, y) {
            warn!(
                "Raster disagrees with the placement oracle at ({},{}): raster says {}, oracle says {}.",
                x,
                y,
                grid.grid().get(x, y),
                allowed
            );
            mismatches += 1;
        }
    }

    if mismatches == 0 {
        info!(
            "Raster matches the placement oracle on {} tiles around {}.",
            tiles.len(),
            pos
        );
    }
    mismatches
}
