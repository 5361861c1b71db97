/// Workers per mineral patch before the patch counts as saturated.
pub const MINERAL_SATURATION: usize = 2;

/// Workers per mineral patch once a site is explicitly oversaturated.
pub const MINERAL_OVERSATURATION: usize = 3;

/// Workers per harvestable geyser.
pub const GEYSER_SATURATION: usize = 3;

/// Deposits closer than this belong to the same resource cluster.
pub const RESOURCE_CLUSTER_RADIUS: f32 = 15.0;

/// Weight of a geyser relative to a mineral patch when computing the resource
/// center of a site. Compensates for clusters with unbalanced gas.
pub const GEYSER_CENTER_WEIGHT: usize = 4;

/// A town hall center may not be placed closer than this to a mineral patch.
pub const MINERAL_EXCLUSION_RADIUS: f32 = 6.0;

/// A town hall center may not be placed closer than this to a geyser.
pub const GEYSER_EXCLUSION_RADIUS: f32 = 7.0;

/// Side length of a town hall footprint, in tiles.
pub const TOWN_HALL_SIZE: i32 = 5;

/// Radius of the search for a town hall anchor around a cluster's resource
/// center.
pub const ANCHOR_SEARCH_RADIUS: f32 = 10.0;

/// Steps a worker needs per unit of distance divided by its movement speed.
pub const TRAVEL_STEPS_PER_SPEED_UNIT: f32 = 16.0;

/// Flat step cost added to every travel estimate to account for acceleration.
pub const TRAVEL_ACCELERATION_STEPS: f32 = 16.0;

/// The first closest mineral patches of a site that are filled before the
/// rest, to spread workers geographically.
pub const PRIORITY_PATCH_COUNT: usize = 4;
