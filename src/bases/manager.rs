use crate::backend::{Command, PathingOracle};
use crate::bases::catalog::derive_sites;
use crate::bases::distances::DistanceMatrix;
use crate::bases::site::Site;
use crate::consts::{TRAVEL_ACCELERATION_STEPS, TRAVEL_STEPS_PER_SPEED_UNIT};
use crate::errors::CoreError;
use crate::geometry::point::{HalfTile, Point2};
use crate::placement::tile_grid::TileGrid;
use crate::snapshot::{Alliance, ResourceDeposit, Snapshot, Unit, UnitClass, WorkerActivity};
use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

/// The stateful economic core, stepped once per simulation tick.
///
/// Owns the site catalog and the inter-site distance matrix, both computed
/// once at startup, plus a nearest-site cache keyed by half-tile position.
/// Repeated nearest-site queries at the same rounded position are very common
/// within a tick and the site set never changes, so entries are never
/// invalidated.
pub struct BaseManager {
    sites: Vec<Site>,
    distances: DistanceMatrix,
    nearest_cache: FxHashMap<HalfTile, usize>,
}

impl BaseManager {
    /// Derives the site catalog from the initial resource snapshot and builds
    /// the distance matrix. The one place where the pathing oracle is queried.
    pub fn new<O>(resources: &[ResourceDeposit], terrain: &TileGrid, oracle: &mut O) -> Self
    where
        O: PathingOracle,
    {
        let sites = derive_sites(resources, terrain);
        let distances = DistanceMatrix::build(&sites, oracle);
        BaseManager {
            sites,
            distances,
            nearest_cache: FxHashMap::default(),
        }
    }

    /// Ingests one observation, refreshes all per-site state, assigns and
    /// rebalances workers, and returns the harvest-class orders for this
    /// step. A deposit collision aborts the step, since the spatial model
    /// would be corrupt.
    pub fn step(&mut self, snapshot: &Snapshot) -> Result<Vec<Command>, CoreError> {
        self.route_resources(snapshot)?;
        self.refresh_sites(snapshot);
        self.route_units(snapshot);
        self.assign_idle_workers(snapshot);
        self.rebalance_workers();

        let mut commands = Vec::new();
        for site in &self.sites {
            site.append_commands(&mut commands);
        }
        Ok(commands)
    }

    fn route_resources(&mut self, snapshot: &Snapshot) -> Result<(), CoreError> {
        for deposit in &snapshot.resources {
            if let Some(i) = self.nearest_site_index(deposit.pos) {
                self.sites[i].update_resource(deposit)?;
            }
        }
        Ok(())
    }

    fn refresh_sites(&mut self, snapshot: &Snapshot) {
        let reported: FxHashSet<_> = snapshot.resources.iter().map(|d| d.tag).collect();
        for site in &mut self.sites {
            site.refresh(&reported);
        }
    }

    fn route_units(&mut self, snapshot: &Snapshot) {
        for unit in &snapshot.units {
            match unit.class {
                UnitClass::TownHall => {
                    if let Some(i) = self.nearest_site_index(unit.pos) {
                        self.sites[i].offer_town_hall(unit);
                    }
                }
                UnitClass::GasBuilding
                    if unit.alliance == Alliance::Own && unit.build_progress == 1.0 =>
                {
                    if let Some(i) = self.nearest_site_index(unit.pos) {
                        self.sites[i].add_gas_building(unit);
                    }
                }
                UnitClass::Worker if unit.alliance == Alliance::Own => {
                    if let Some(site) =
                        self.sites.iter_mut().find(|site| site.has_worker(unit.tag))
                    {
                        site.mark_worker_alive(unit);
                    }
                }
                _ => {}
            }
        }

        for site in &mut self.sites {
            site.prune_dead_resources();
            site.prune_dead_workers();
        }
    }

    /// Assigns every own worker that is not mining anywhere and is idle or
    /// already on a harvest-class order. Saturation is filled across all
    /// sites before any site is oversaturated.
    fn assign_idle_workers(&mut self, snapshot: &Snapshot) {
        for unit in &snapshot.units {
            if unit.class != UnitClass::Worker
                || unit.alliance != Alliance::Own
                || unit.activity == WorkerActivity::Other
            {
                continue;
            }
            if self.sites.iter().any(|site| site.has_worker(unit.tag)) {
                continue;
            }

            let target = self
                .nearest_index_where(unit.pos, |site| site.needs_worker(false))
                .or_else(|| {
                    self.nearest_index_where(unit.pos, |site| {
                        site.needs_oversaturated_worker(false)
                    })
                });
            match target {
                Some(i) => self.sites[i].add_worker(unit.clone()),
                None => debug!("No site has room for worker {}.", unit.tag),
            }
        }
    }

    /// Moves workers from finished, oversaturated sites to under-construction
    /// ones when the worker would arrive before the town hall finishes.
    fn rebalance_workers(&mut self) {
        for dst in 0..self.sites.len() {
            if !self.sites[dst].is_under_construction() {
                continue;
            }
            for src in 0..self.sites.len() {
                if src == dst || !self.sites[src].is_finished() {
                    continue;
                }
                while self.sites[dst].needs_worker(true) && self.sites[src].is_oversaturated() {
                    let Some(worker) = self.sites[src].peek_worker() else {
                        break;
                    };
                    if worker.movement_speed <= 0.0 {
                        break;
                    }
                    let travel = self.distances.get(src, dst) / worker.movement_speed
                        * TRAVEL_STEPS_PER_SPEED_UNIT
                        + TRAVEL_ACCELERATION_STEPS;
                    if travel >= self.sites[dst].steps_until_finished() as f32 {
                        break;
                    }

                    let (from, to) = self.two_sites_mut(src, dst);
                    let Some(worker) = from.take_worker() else {
                        break;
                    };
                    info!(
                        "Rebalancing worker {} from site {} to site {}.",
                        worker.tag, src, dst
                    );
                    to.add_worker(worker);
                }
            }
        }
    }

    fn two_sites_mut(&mut self, a: usize, b: usize) -> (&mut Site, &mut Site) {
        debug_assert_ne!(a, b);
        if a < b {
            let (left, right) = self.sites.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.sites.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn site(&self, index: usize) -> Option<&Site> {
        self.sites.get(index)
    }

    pub fn site_mut(&mut self, index: usize) -> Option<&mut Site> {
        self.sites.get_mut(index)
    }

    /// Ground-travel distance between two sites. Symmetric, zero on the
    /// diagonal.
    pub fn distance(&self, i: usize, j: usize) -> f32 {
        self.distances.get(i, j)
    }

    /// The closest other site by ground travel distance: the natural
    /// expansion when asked of a starting location.
    pub fn natural(&self, index: usize) -> Option<&Site> {
        if index >= self.sites.len() {
            return None;
        }
        (0..self.sites.len())
            .filter(|&j| j != index)
            .min_by(|&a, &b| {
                self.distances
                    .get(index, a)
                    .total_cmp(&self.distances.get(index, b))
            })
            .map(|j| &self.sites[j])
    }

    /// The site whose town hall anchor is closest to the given position,
    /// memoized by half-tile.
    pub fn nearest_site(&mut self, pos: Point2) -> Option<&Site> {
        let i = self.nearest_site_index(pos)?;
        Some(&self.sites[i])
    }

    fn nearest_site_index(&mut self, pos: Point2) -> Option<usize> {
        let key = pos.to_half_tile();
        if let Some(&i) = self.nearest_cache.get(&key) {
            return Some(i);
        }
        let i = self.nearest_index_where(pos, |_| true)?;
        self.nearest_cache.insert(key, i);
        Some(i)
    }

    /// The site closest to the given position among those satisfying the
    /// predicate. Not memoized.
    pub fn nearest_site_where<P>(&self, pos: Point2, predicate: P) -> Option<&Site>
    where
        P: Fn(&Site) -> bool,
    {
        let i = self.nearest_index_where(pos, predicate)?;
        Some(&self.sites[i])
    }

    pub fn nearest_self_site(&self, pos: Point2) -> Option<&Site> {
        self.nearest_site_where(pos, Site::is_self_owned)
    }

    pub fn nearest_enemy_site(&self, pos: Point2) -> Option<&Site> {
        self.nearest_site_where(pos, Site::is_enemy_owned)
    }

    /// The finished, resource-bearing own site farthest from the reference
    /// point. Used to aim temporary worker-boost effects away from contested
    /// areas.
    pub fn mule_target_site(&self, pos: Point2) -> Option<&Site> {
        self.sites
            .iter()
            .filter(|site| site.is_finished() && !site.minerals().is_empty())
            .max_by(|a, b| {
                a.anchor
                    .distance_squared(pos)
                    .total_cmp(&b.anchor.distance_squared(pos))
            })
    }

    /// Pops one assigned worker from the own site closest to the given
    /// position, freeing it for building tasks.
    pub fn take_worker_near(&mut self, pos: Point2) -> Option<Unit> {
        let i = self.nearest_index_where(pos, |site| {
            site.is_self_owned() && site.worker_count() > 0
        })?;
        self.sites[i].take_worker()
    }

    fn nearest_index_where<P>(&self, pos: Point2, predicate: P) -> Option<usize>
    where
        P: Fn(&Site) -> bool,
    {
        self.sites
            .iter()
            .enumerate()
            .filter(|(_, site)| predicate(site))
            .min_by(|(_, a), (_, b)| {
                a.anchor
                    .distance_squared(pos)
                    .total_cmp(&b.anchor.distance_squared(pos))
            })
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::{Action, PathingOracle};
    use crate::bases::manager::BaseManager;
    use crate::geometry::point::Point2;
    use crate::placement::tile_grid::TileGrid;
    use crate::snapshot::{
        Alliance, ResourceDeposit, ResourceKind, Snapshot, Unit, UnitClass, UnitTag, UnitTypeId,
        WorkerActivity,
    };
    use more_asserts::assert_lt;

    /// Fails every pathing query so that distances fall back to straight
    /// lines.
    struct NoPathOracle;

    impl PathingOracle for NoPathOracle {
        fn pathing_distances(&mut self, pairs: &[(Point2, Point2)]) -> Vec<Option<f32>> {
            vec![None; pairs.len()]
        }
    }

    fn mineral(tag: u64, x: f32, y: f32) -> ResourceDeposit {
        ResourceDeposit::new(
            UnitTag(tag),
            ResourceKind::Mineral { small: false },
            Point2::new(x, y),
            1800,
            true,
        )
    }

    fn worker(tag: u64, x: f32, y: f32) -> Unit {
        Unit::new(
            UnitTag(tag),
            UnitTypeId(45),
            UnitClass::Worker,
            Alliance::Own,
            Point2::new(x, y),
            0.375,
            1.0,
            0.0,
            2.8125,
            false,
            WorkerActivity::Idle,
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

    fn gas_building(tag: u64, pos: Point2) -> Unit {
        Unit::new(
            UnitTag(tag),
            UnitTypeId(20),
            UnitClass::GasBuilding,
            Alliance::Own,
            pos,
            1.25,
            1.0,
            0.0,
            0.0,
            false,
            WorkerActivity::Other,
        )
    }

    fn town_hall(tag: u64, alliance: Alliance, pos: Point2, progress: f32) -> Unit {
        Unit::new(
            UnitTag(tag),
            UnitTypeId(18),
            UnitClass::TownHall,
            alliance,
            pos,
            2.75,
            progress,
            1200.0,
            0.0,
            false,
            WorkerActivity::Other,
        )
    }

    /// Two two-patch mineral lines far enough apart to form separate sites.
    fn two_site_deposits() -> Vec<ResourceDeposit> {
        vec![
            mineral(1, 20.0, 20.0),
            mineral(2, 21.0, 20.0),
            mineral(3, 60.0, 20.0),
            mineral(4, 61.0, 20.0),
        ]
    }

    fn two_site_manager() -> BaseManager {
        let terrain = TileGrid::new(96, 96, true);
        BaseManager::new(&two_site_deposits(), &terrain, &mut NoPathOracle)
    }

    #[test]
    fn test_catalog_and_distances_from_initial_snapshot() {
        let manager = two_site_manager();
        assert_eq!(manager.sites().len(), 2);
        assert_eq!(manager.distance(0, 0), 0.0);
        assert!((manager.distance(0, 1) - 40.0).abs() < 1e-3);
        assert_eq!(manager.distance(0, 1), manager.distance(1, 0));
    }

    #[test]
    fn test_workers_are_assigned_and_ordered_to_gather() {
        let mut manager = two_site_manager();
        let anchor = manager.sites()[0].anchor;

        let mut snapshot = Snapshot::new(1);
        snapshot.resources = two_site_deposits();
        snapshot.units.push(town_hall(10, Alliance::Own, anchor, 1.0));
        for w in 0..4 {
            snapshot.units.push(worker(100 + w, 20.0, 22.0));
        }

        let commands = manager.step(&snapshot).unwrap();
        assert_eq!(manager.sites()[0].worker_count(), 4);
        assert_eq!(manager.sites()[1].worker_count(), 0);
        assert_eq!(commands.len(), 4);
        assert!(commands.iter().all(|c| matches!(c.action, Action::Gather(_))));
    }

    #[test]
    fn test_oversaturated_site_feeds_an_under_construction_one() {
        let mut manager = two_site_manager();
        let anchor_a = manager.sites()[0].anchor;
        let anchor_b = manager.sites()[1].anchor;

        let mut snapshot = Snapshot::new(1);
        snapshot.resources = two_site_deposits();
        snapshot.units.push(town_hall(10, Alliance::Own, anchor_a, 1.0));
        snapshot.units.push(town_hall(11, Alliance::Own, anchor_b, 0.5));
        // Five workers next to site 0, which only saturates four.
        for w in 0..5 {
            snapshot.units.push(worker(100 + w, 20.0, 22.0));
        }

        let commands = manager.step(&snapshot).unwrap();
        // The fifth worker oversaturates site 0 and is pulled to site 1 in
        // the same step, because it arrives well before the town hall
        // finishes.
        assert_eq!(manager.sites()[0].worker_count(), 4);
        assert_eq!(manager.sites()[1].worker_count(), 1);
        assert!(!manager.sites()[0].is_oversaturated());

        // Site 1 cannot harvest yet, so its worker only pre-positions.
        let moves = commands
            .iter()
            .filter(|c| matches!(c.action, Action::MoveTo(_)))
            .count();
        assert_eq!(moves, 1);
        assert_eq!(commands.len(), 5);
    }

    #[test]
    fn test_rebalancing_respects_remaining_construction_time() {
        let mut manager = two_site_manager();
        let anchor_a = manager.sites()[0].anchor;
        let anchor_b = manager.sites()[1].anchor;

        let mut snapshot = Snapshot::new(1);
        snapshot.resources = two_site_deposits();
        snapshot.units.push(town_hall(10, Alliance::Own, anchor_a, 1.0));
        // Nearly finished: the worker could not arrive in time.
        snapshot.units.push(town_hall(11, Alliance::Own, anchor_b, 0.99));
        for w in 0..5 {
            snapshot.units.push(worker(100 + w, 20.0, 22.0));
        }

        manager.step(&snapshot).unwrap();
        assert_lt!(
            manager.sites()[1].steps_until_finished() as f32,
            manager.distance(0, 1) / 2.8125 * 16.0 + 16.0
        );
        assert_eq!(manager.sites()[0].worker_count(), 5);
        assert_eq!(manager.sites()[1].worker_count(), 0);
    }

    #[test]
    fn test_dropped_deposit_frees_workers_for_reassignment() {
        let mut manager = two_site_manager();
        let anchor = manager.sites()[0].anchor;

        let mut snapshot = Snapshot::new(1);
        snapshot.resources = two_site_deposits();
        snapshot.units.push(town_hall(10, Alliance::Own, anchor, 1.0));
        for w in 0..4 {
            snapshot.units.push(worker(100 + w, 20.0, 22.0));
        }
        manager.step(&snapshot).unwrap();
        assert_eq!(manager.sites()[0].worker_count(), 4);

        // The second patch of site 0 mines out.
        let mut snapshot = snapshot.clone();
        snapshot.step = 2;
        snapshot.resources.retain(|d| d.tag != UnitTag(2));

        manager.step(&snapshot).unwrap();
        // One freed worker fits back in under oversaturation, the other
        // finds no room anywhere.
        assert_eq!(manager.sites()[0].minerals().len(), 1);
        assert_eq!(manager.sites()[0].worker_count(), 3);
        assert_eq!(manager.sites()[0].workers_on(UnitTag(1)), 3);
    }

    #[test]
    fn test_destroyed_gas_building_frees_its_worker() {
        let terrain = TileGrid::new(96, 96, true);
        let deposits = vec![mineral(1, 20.0, 20.0), geyser(2, 26.0, 20.0)];
        let mut manager = BaseManager::new(&deposits, &terrain, &mut NoPathOracle);
        assert_eq!(manager.sites().len(), 1);
        let anchor = manager.sites()[0].anchor;

        let mut snapshot = Snapshot::new(1);
        snapshot.resources = deposits.clone();
        snapshot.units.push(town_hall(10, Alliance::Own, anchor, 1.0));
        snapshot.units.push(gas_building(30, Point2::new(26.0, 20.0)));
        for w in 0..3 {
            snapshot.units.push(worker(100 + w, 20.0, 22.0));
        }
        manager.step(&snapshot).unwrap();
        assert_eq!(manager.sites()[0].workers_on(UnitTag(1)), 2);
        assert_eq!(manager.sites()[0].workers_on(UnitTag(30)), 1);

        // The refinery is destroyed.
        let mut snapshot = snapshot.clone();
        snapshot.step = 2;
        snapshot.units.retain(|u| u.tag != UnitTag(30));

        let commands = manager.step(&snapshot).unwrap();
        // The freed worker squeezes back onto the patch under oversaturation
        // and keeps receiving orders.
        assert_eq!(manager.sites()[0].worker_count(), 3);
        assert_eq!(manager.sites()[0].workers_on(UnitTag(1)), 3);
        assert_eq!(commands.len(), 3);
        assert!(commands.iter().all(|c| matches!(c.action, Action::Gather(_))));
    }

    #[test]
    fn test_natural_is_the_closest_other_site() {
        let terrain = TileGrid::new(128, 128, true);
        let deposits = vec![
            mineral(1, 20.0, 20.0),
            mineral(2, 21.0, 20.0),
            mineral(3, 60.0, 20.0),
            mineral(4, 61.0, 20.0),
            mineral(5, 20.0, 80.0),
            mineral(6, 21.0, 80.0),
        ];
        let manager = BaseManager::new(&deposits, &terrain, &mut NoPathOracle);
        assert_eq!(manager.sites().len(), 3);

        assert_eq!(manager.natural(0).unwrap().index(), 1);
        assert_eq!(manager.natural(1).unwrap().index(), 0);
        assert_eq!(manager.natural(2).unwrap().index(), 0);
        assert!(manager.natural(3).is_none());

        let lone = BaseManager::new(&deposits[..2], &terrain, &mut NoPathOracle);
        assert!(lone.natural(0).is_none());
    }

    #[test]
    fn test_nearest_site_queries() {
        let mut manager = two_site_manager();
        let anchor_a = manager.sites()[0].anchor;
        let anchor_b = manager.sites()[1].anchor;

        let mut snapshot = Snapshot::new(1);
        snapshot.resources = two_site_deposits();
        snapshot.units.push(town_hall(10, Alliance::Own, anchor_a, 1.0));
        snapshot.units.push(town_hall(11, Alliance::Enemy, anchor_b, 1.0));
        manager.step(&snapshot).unwrap();

        let origin = Point2::new(0.0, 0.0);
        assert_eq!(manager.nearest_site(origin).unwrap().index(), 0);
        // Memoized lookups at the same half-tile stay stable.
        assert_eq!(manager.nearest_site(Point2::new(0.2, 0.2)).unwrap().index(), 0);

        // Proximity is measured to the town hall anchor.
        let lean_a = Point2::new(
            anchor_a.x * 0.55 + anchor_b.x * 0.45,
            anchor_a.y * 0.55 + anchor_b.y * 0.45,
        );
        assert_eq!(manager.nearest_site(lean_a).unwrap().index(), 0);

        assert_eq!(manager.nearest_self_site(anchor_b).unwrap().index(), 0);
        assert_eq!(manager.nearest_enemy_site(anchor_a).unwrap().index(), 1);
        assert!(manager
            .nearest_site_where(origin, |site| site.is_unowned())
            .is_none());

        // The only finished own site is the mule target from anywhere.
        assert_eq!(manager.mule_target_site(anchor_b).unwrap().index(), 0);
    }

    #[test]
    fn test_take_worker_near_frees_one_for_building() {
        let mut manager = two_site_manager();
        let anchor = manager.sites()[0].anchor;

        let mut snapshot = Snapshot::new(1);
        snapshot.resources = two_site_deposits();
        snapshot.units.push(town_hall(10, Alliance::Own, anchor, 1.0));
        for w in 0..4 {
            snapshot.units.push(worker(100 + w, 20.0, 22.0));
        }
        manager.step(&snapshot).unwrap();

        let taken = manager.take_worker_near(anchor).unwrap();
        assert_eq!(manager.sites()[0].worker_count(), 3);
        assert!(!manager.sites()[0].has_worker(taken.tag));
    }
}
