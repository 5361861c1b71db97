use crate::bases::site::Site;
use crate::consts::{
    ANCHOR_SEARCH_RADIUS, GEYSER_CENTER_WEIGHT, GEYSER_EXCLUSION_RADIUS, MINERAL_EXCLUSION_RADIUS,
    RESOURCE_CLUSTER_RADIUS, TOWN_HALL_SIZE,
};
use crate::geometry::point::Point2;
use crate::geometry::rect::TileRect;
use crate::placement::footprint::FootprintSize;
use crate::placement::tile_grid::TileGrid;
use crate::snapshot::ResourceDeposit;
use log::{info, warn};

/// A group of deposits close enough to be harvested from one town hall.
#[derive(Clone, Debug)]
pub struct ResourceCluster {
    pub deposits: Vec<ResourceDeposit>,
}

impl ResourceCluster {
    /// Plain centroid of the mineral patches.
    pub fn mineral_center(&self) -> Point2 {
        centroid(self.deposits.iter().filter(|d| d.is_mineral()).map(|d| (d.pos, 1)))
    }

    /// Centroid with geysers weighted `GEYSER_CENTER_WEIGHT` times a mineral
    /// patch, so clusters with unbalanced gas do not skew toward minerals.
    pub fn resource_center(&self) -> Point2 {
        centroid(self.deposits.iter().map(|d| {
            let weight = if d.is_vespene() { GEYSER_CENTER_WEIGHT } else { 1 };
            (d.pos, weight)
        }))
    }
}

fn centroid<I>(weighted: I) -> Point2
where
    I: Iterator<Item = (Point2, usize)>,
{
    let mut sum = Point2::default();
    let mut count = 0usize;
    for (pos, weight) in weighted {
        for _ in 0..weight {
            sum = sum + pos;
        }
        count += weight;
    }
    if count == 0 {
        return Point2::default();
    }
    Point2::new(sum.x / count as f32, sum.y / count as f32)
}

/// One-time clustering of all resource deposits into candidate economic
/// sites. An empty input produces an empty catalog.
pub fn derive_sites(resources: &[ResourceDeposit], terrain: &TileGrid) -> Vec<Site> {
    let clusters = cluster_deposits(resources);
    info!(
        "Derived {} resource clusters from {} deposits.",
        clusters.len(),
        resources.len()
    );

    clusters
        .into_iter()
        .enumerate()
        .map(|(index, cluster)| {
            let anchor = town_hall_anchor(&cluster, terrain);
            Site::from_cluster(index, anchor, cluster)
        })
        .collect()
}

/// Groups deposits by the transitive closure of "closer than
/// `RESOURCE_CLUSTER_RADIUS`".
fn cluster_deposits(resources: &[ResourceDeposit]) -> Vec<ResourceCluster> {
    let threshold = RESOURCE_CLUSTER_RADIUS * RESOURCE_CLUSTER_RADIUS;
    let mut assigned = vec![false; resources.len()];
    let mut clusters = Vec::new();

    for seed in 0..resources.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut members = vec![seed];
        let mut frontier = vec![seed];

        while let Some(current) = frontier.pop() {
            for other in 0..resources.len() {
                if !assigned[other]
                    && resources[current].pos.distance_squared(resources[other].pos) < threshold
                {
                    assigned[other] = true;
                    members.push(other);
                    frontier.push(other);
                }
            }
        }

        clusters.push(ResourceCluster {
            deposits: members.into_iter().map(|i| resources[i].clone()).collect(),
        });
    }

    clusters
}

/// Finds the town hall anchor for a cluster: the half-tile-aligned position
/// closest to the cluster's resources that respects the resource exclusion
/// distances and whose footprint is buildable on the static terrain.
fn town_hall_anchor(cluster: &ResourceCluster, terrain: &TileGrid) -> Point2 {
    let center = cluster.resource_center();
    let size = FootprintSize::new(TOWN_HALL_SIZE, TOWN_HALL_SIZE);
    let radius = ANCHOR_SEARCH_RADIUS as i32;

    let mut best: Option<(Point2, f32)> = None;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let candidate = Point2::new(
                center.x.floor() + dx as f32 + 0.5,
                center.y.floor() + dy as f32 + 0.5,
            );
            if candidate.distance_squared(center) > ANCHOR_SEARCH_RADIUS * ANCHOR_SEARCH_RADIUS {
                continue;
            }
            if !clears_resources(candidate, cluster) {
                continue;
            }
            if !TileRect::footprint(candidate, size)
                .iter()
                .all(|(x, y)| terrain.get(x, y))
            {
                continue;
            }

            let score: f32 = cluster
                .deposits
                .iter()
                .map(|d| candidate.distance_squared(d.pos))
                .sum();
            if best.is_none_or(|(_, best_score)| score < best_score) {
                best = Some((candidate, score));
            }
        }
    }

    match best {
        Some((anchor, _)) => anchor,
        None => {
            warn!(
                "No valid town hall anchor near {}; falling back to the resource center.",
                center
            );
            center
        }
    }
}

fn clears_resources(candidate: Point2, cluster: &ResourceCluster) -> bool {
    cluster.deposits.iter().all(|d| {
        let exclusion = if d.is_vespene() {
            GEYSER_EXCLUSION_RADIUS
        } else {
            MINERAL_EXCLUSION_RADIUS
        };
        candidate.distance_squared(d.pos) >= exclusion * exclusion
    })
}

#[cfg(test)]
mod tests {
    use crate::bases::catalog::{cluster_deposits, derive_sites, ResourceCluster};
    use crate::consts::{GEYSER_EXCLUSION_RADIUS, MINERAL_EXCLUSION_RADIUS};
    use crate::geometry::point::Point2;
    use crate::placement::tile_grid::TileGrid;
    use crate::snapshot::{ResourceDeposit, ResourceKind, UnitTag};

    fn mineral(tag: u64, x: f32, y: f32) -> ResourceDeposit {
        ResourceDeposit::new(
            UnitTag(tag),
            ResourceKind::Mineral { small: false },
            Point2::new(x, y),
            1800,
            true,
        )
    }

    fn geyser(tag: u64, x: f32, y: f32) -> ResourceDeposit {
        ResourceDeposit::new(
            UnitTag(tag),
            ResourceKind::Vespene,
            Point2::new(x, y),
            2250,
            true,
        )
    }

    fn mineral_line(first_tag: u64, x0: f32, y: f32) -> Vec<ResourceDeposit> {
        (0..8).map(|i| mineral(first_tag + i, x0 + i as f32, y)).collect()
    }

    #[test]
    fn test_two_distant_groups_become_two_clusters() {
        let mut deposits = mineral_line(1, 20.0, 20.0);
        deposits.extend(mineral_line(100, 60.0, 20.0));

        let clusters = cluster_deposits(&deposits);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].deposits.len(), 8);
        assert_eq!(clusters[1].deposits.len(), 8);
    }

    #[test]
    fn test_chained_deposits_merge_transitively() {
        // Consecutive deposits are within the cluster radius of each other
        // but the endpoints are not.
        let deposits = vec![mineral(1, 10.0, 10.0), mineral(2, 22.0, 10.0), mineral(3, 34.0, 10.0)];
        let clusters = cluster_deposits(&deposits);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].deposits.len(), 3);
    }

    #[test]
    fn test_geysers_weigh_four_times_into_the_resource_center() {
        let cluster = ResourceCluster {
            deposits: vec![mineral(1, 0.0, 0.0), geyser(2, 10.0, 0.0)],
        };
        assert_eq!(cluster.resource_center(), Point2::new(8.0, 0.0));
        assert_eq!(cluster.mineral_center(), Point2::new(0.0, 0.0));
    }

    #[test]
    fn test_derived_anchor_clears_all_resources() {
        let terrain = TileGrid::new(64, 64, true);
        let mut deposits = mineral_line(1, 26.0, 24.0);
        deposits.push(geyser(50, 24.0, 30.0));

        let sites = derive_sites(&deposits, &terrain);
        assert_eq!(sites.len(), 1);

        let anchor = sites[0].anchor;
        for d in &deposits {
            let exclusion = if d.is_vespene() {
                GEYSER_EXCLUSION_RADIUS
            } else {
                MINERAL_EXCLUSION_RADIUS
            };
            assert!(anchor.distance(d.pos) >= exclusion);
        }
    }

    #[test]
    fn test_empty_input_yields_empty_catalog() {
        let terrain = TileGrid::new(16, 16, true);
        assert!(derive_sites(&[], &terrain).is_empty());
    }
}
