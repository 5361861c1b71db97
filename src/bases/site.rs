use crate::backend::{Action, Command};
use crate::bases::assignment::AssignmentGraph;
use crate::bases::catalog::ResourceCluster;
use crate::consts::{
    GEYSER_SATURATION, MINERAL_OVERSATURATION, MINERAL_SATURATION, PRIORITY_PATCH_COUNT,
};
use crate::errors::CoreError;
use crate::geometry::point::{HalfTile, Point2};
use crate::snapshot::{Alliance, ResourceDeposit, Unit, UnitTag};
use log::info;
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::Range;

/// A fixed economic location derived from resource clustering. Created once
/// at startup, mutated every step, never destroyed or relocated.
#[derive(Debug)]
pub struct Site {
    index: usize,
    /// Where a town hall belongs at this site.
    pub anchor: Point2,
    /// Resource-weighted center, used for inter-site distance queries.
    pub resource_center: Point2,
    pub mineral_center: Point2,
    /// Sorted: full patches before depleted-variant ones, then by distance to
    /// the anchor. The order drives assignment priority.
    minerals: Vec<ResourceDeposit>,
    geysers: Vec<ResourceDeposit>,
    town_hall: Option<Unit>,
    gas_buildings: FxHashMap<HalfTile, Unit>,
    /// Own workers confirmed alive this step.
    workers: FxHashMap<UnitTag, Unit>,
    assignments: AssignmentGraph,
}

impl Site {
    pub(crate) fn from_cluster(index: usize, anchor: Point2, cluster: ResourceCluster) -> Self {
        Site {
            index,
            anchor,
            resource_center: cluster.resource_center(),
            mineral_center: cluster.mineral_center(),
            minerals: Vec::new(),
            geysers: Vec::new(),
            town_hall: None,
            gas_buildings: FxHashMap::default(),
            workers: FxHashMap::default(),
            assignments: AssignmentGraph::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(index: usize, center: Point2) -> Self {
        Site {
            index,
            anchor: center,
            resource_center: center,
            mineral_center: center,
            minerals: Vec::new(),
            geysers: Vec::new(),
            town_hall: None,
            gas_buildings: FxHashMap::default(),
            workers: FxHashMap::default(),
            assignments: AssignmentGraph::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn minerals(&self) -> &[ResourceDeposit] {
        &self.minerals
    }

    pub fn geysers(&self) -> &[ResourceDeposit] {
        &self.geysers
    }

    pub fn gas_building_count(&self) -> usize {
        self.gas_buildings.len()
    }

    pub fn town_hall(&self) -> Option<&Unit> {
        self.town_hall.as_ref()
    }

    /// Reconciles a reported deposit with this site's inventory. Two distinct
    /// identities within the same tile mean the spatial model is corrupt.
    pub(crate) fn update_resource(&mut self, deposit: &ResourceDeposit) -> Result<(), CoreError> {
        if deposit.is_mineral() {
            Self::update_or_add(&mut self.minerals, self.anchor, deposit)
        } else {
            Self::update_or_add(&mut self.geysers, self.anchor, deposit)
        }
    }

    fn update_or_add(
        deposits: &mut Vec<ResourceDeposit>,
        anchor: Point2,
        reported: &ResourceDeposit,
    ) -> Result<(), CoreError> {
        for existing in deposits.iter_mut() {
            if existing.pos.distance_squared(reported.pos) < 1.0 {
                if existing.pos != reported.pos {
                    return Err(CoreError::DepositCollision {
                        kept: existing.tag,
                        kept_pos: existing.pos,
                        reported: reported.tag,
                        reported_pos: reported.pos,
                    });
                }

                let mut updated = reported.clone();
                if !reported.observed {
                    // A remembered deposit reports a stale amount; the last
                    // confirmed one is better.
                    updated.remaining = existing.remaining;
                }
                *existing = updated;
                return Ok(());
            }
        }

        // Insertion sort keyed on (depleted variant, distance to anchor).
        let key = (reported.is_small(), reported.pos.distance_squared(anchor));
        let at = deposits
            .iter()
            .position(|d| {
                let other = (d.is_small(), d.pos.distance_squared(anchor));
                (!key.0 && other.0) || (key.0 == other.0 && key.1 < other.1)
            })
            .unwrap_or(deposits.len());
        deposits.insert(at, reported.clone());
        Ok(())
    }

    /// Per-step refresh: drops mineral patches that are no longer reported,
    /// releasing their workers, and clears all state that is re-derived from
    /// the snapshot.
    pub(crate) fn refresh(&mut self, reported: &FxHashSet<UnitTag>) {
        let mut i = 0;
        while i < self.minerals.len() {
            if reported.contains(&self.minerals[i].tag) {
                i += 1;
                continue;
            }
            let exhausted = self.minerals.remove(i);
            let freed = self.assignments.release_resource(exhausted.tag);
            if !freed.is_empty() {
                info!(
                    "Mineral {} at site {} is exhausted; released {} workers.",
                    exhausted.tag,
                    self.index,
                    freed.len()
                );
            }
        }

        self.town_hall = None;
        self.gas_buildings.clear();
        self.workers.clear();
    }

    /// Considers a town-hall-class structure for this site. The one closest
    /// to the anchor wins.
    pub(crate) fn offer_town_hall(&mut self, unit: &Unit) {
        let closer = self.town_hall.as_ref().is_none_or(|current| {
            unit.pos.distance_squared(self.anchor) < current.pos.distance_squared(self.anchor)
        });
        if closer {
            self.town_hall = Some(unit.clone());
        }
    }

    pub(crate) fn add_gas_building(&mut self, unit: &Unit) {
        self.gas_buildings.insert(unit.pos.to_half_tile(), unit.clone());
    }

    pub(crate) fn mark_worker_alive(&mut self, unit: &Unit) {
        self.workers.insert(unit.tag, unit.clone());
    }

    /// Releases assignments to resources that no longer exist, e.g. a
    /// destroyed gas building.
    pub(crate) fn prune_dead_resources(&mut self) {
        let live: FxHashSet<UnitTag> = self
            .minerals
            .iter()
            .map(|m| m.tag)
            .chain(self.gas_buildings.values().map(|g| g.tag))
            .collect();
        let dead: Vec<UnitTag> = self
            .assignments
            .iter()
            .map(|(_, resource)| resource)
            .filter(|resource| !live.contains(resource))
            .collect();
        for resource in dead {
            let freed = self.assignments.release_resource(resource);
            if !freed.is_empty() {
                info!(
                    "Resource {} at site {} is gone; released {} workers.",
                    resource,
                    self.index,
                    freed.len()
                );
            }
        }
    }

    /// Releases assignments whose worker did not appear in this step's
    /// snapshot.
    pub(crate) fn prune_dead_workers(&mut self) {
        let dead: Vec<UnitTag> = self
            .assignments
            .workers()
            .filter(|tag| !self.workers.contains_key(tag))
            .collect();
        for tag in dead {
            self.assignments.release_worker(tag);
        }
    }

    pub fn has_worker(&self, tag: UnitTag) -> bool {
        self.assignments.contains_worker(tag)
    }

    pub fn worker_count(&self) -> usize {
        self.assignments.len()
    }

    pub(crate) fn worker(&self, tag: UnitTag) -> Option<&Unit> {
        self.workers.get(&tag)
    }

    /// Adds a worker to this site and assigns it a resource by priority:
    /// the closest priority patches up to normal saturation first, then the
    /// remaining patches, then gas, and only then oversaturation.
    pub(crate) fn add_worker(&mut self, unit: Unit) {
        let tag = unit.tag;
        let pos = unit.pos;
        self.workers.insert(tag, unit);

        let near = 0..PRIORITY_PATCH_COUNT.min(self.minerals.len());
        let far = near.end..self.minerals.len();

        if self.assign_to_minerals(tag, pos, near.clone(), MINERAL_SATURATION)
            || self.assign_to_minerals(tag, pos, far.clone(), MINERAL_SATURATION)
            || self.assign_to_gas(tag)
            || self.assign_to_minerals(tag, pos, far, MINERAL_OVERSATURATION)
            || self.assign_to_minerals(tag, pos, near, MINERAL_OVERSATURATION)
        {
            info!("Assigned worker {} at site {}.", tag, self.index);
        }
    }

    /// Assigns to the closest patch within the given range of the sorted
    /// mineral list that still has a free slot under `cap`.
    fn assign_to_minerals(
        &mut self,
        worker: UnitTag,
        worker_pos: Point2,
        range: Range<usize>,
        cap: usize,
    ) -> bool {
        let mut candidates: Vec<(f32, UnitTag)> = self.minerals[range]
            .iter()
            .map(|m| (m.pos.distance_squared(worker_pos), m.tag))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (_, patch) in candidates {
            if self.assignments.workers_on(patch) < cap {
                self.assignments.assign(worker, patch);
                return true;
            }
        }
        false
    }

    fn assign_to_gas(&mut self, worker: UnitTag) -> bool {
        for gas in self.gas_buildings.values() {
            if self.assignments.workers_on(gas.tag) < GEYSER_SATURATION {
                self.assignments.assign(worker, gas.tag);
                return true;
            }
        }
        false
    }

    /// The worker that would be peeled off first for other duties: one mining
    /// a patch as far down the priority order as possible.
    pub fn peek_worker(&self) -> Option<&Unit> {
        for mineral in self.minerals.iter().rev() {
            if let Some(tag) = self.assignments.any_worker_on(mineral.tag) {
                return self.workers.get(&tag);
            }
        }
        None
    }

    /// Pops one assigned worker, releasing it from this site entirely so it
    /// can be used for building or rebalancing.
    pub fn take_worker(&mut self) -> Option<Unit> {
        let tag = self.peek_worker()?.tag;
        self.remove_worker(tag)
    }

    pub fn remove_worker(&mut self, tag: UnitTag) -> Option<Unit> {
        self.assignments.release_worker(tag);
        self.workers.remove(&tag)
    }

    pub fn is_self_owned(&self) -> bool {
        self.town_hall
            .as_ref()
            .is_some_and(|th| th.alliance == Alliance::Own)
    }

    pub fn is_under_construction(&self) -> bool {
        self.town_hall
            .as_ref()
            .is_some_and(|th| th.alliance == Alliance::Own && th.build_progress != 1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.town_hall
            .as_ref()
            .is_some_and(|th| th.alliance == Alliance::Own && th.build_progress == 1.0)
    }

    pub fn is_enemy_owned(&self) -> bool {
        self.town_hall
            .as_ref()
            .is_some_and(|th| th.alliance == Alliance::Enemy)
    }

    pub fn is_unowned(&self) -> bool {
        self.town_hall.is_none()
    }

    /// Estimated steps until the town hall finishes construction.
    pub fn steps_until_finished(&self) -> u32 {
        match self.town_hall.as_ref() {
            Some(th) => ((1.0 - th.build_progress) * th.build_time + 0.5) as u32,
            None => 0,
        }
    }

    fn saturated_capacity(&self) -> usize {
        self.minerals.len() * MINERAL_SATURATION + self.gas_buildings.len() * GEYSER_SATURATION
    }

    fn oversaturated_capacity(&self) -> usize {
        self.minerals.len() * MINERAL_OVERSATURATION + self.gas_buildings.len() * GEYSER_SATURATION
    }

    pub fn needs_worker(&self, ok_under_construction: bool) -> bool {
        if !self.is_self_owned() {
            return false;
        }
        if !ok_under_construction && self.is_under_construction() {
            return false;
        }
        self.saturated_capacity() > self.assignments.len()
    }

    pub fn needs_oversaturated_worker(&self, ok_under_construction: bool) -> bool {
        if !self.is_self_owned() {
            return false;
        }
        if !ok_under_construction && self.is_under_construction() {
            return false;
        }
        self.oversaturated_capacity() > self.assignments.len()
    }

    pub fn is_oversaturated(&self) -> bool {
        if !self.is_self_owned() || self.is_under_construction() {
            return false;
        }
        self.saturated_capacity() < self.assignments.len()
    }

    fn resource_pos(&self, tag: UnitTag) -> Option<Point2> {
        self.minerals
            .iter()
            .chain(self.geysers.iter())
            .find(|d| d.tag == tag)
            .map(|d| d.pos)
            .or_else(|| {
                self.gas_buildings
                    .values()
                    .find(|u| u.tag == tag)
                    .map(|u| u.pos)
            })
    }

    /// Emits one harvest-class order per assigned worker. While the town hall
    /// is under construction, workers pre-position near their resource
    /// instead, since harvesting cannot start yet.
    pub(crate) fn append_commands(&self, out: &mut Vec<Command>) {
        let under_construction = self.is_under_construction();
        for (worker_tag, resource_tag) in self.assignments.iter() {
            let Some(worker) = self.workers.get(&worker_tag) else {
                continue;
            };
            let Some(resource_pos) = self.resource_pos(resource_tag) else {
                continue;
            };

            let action = if under_construction {
                Action::MoveTo(resource_pos)
            } else if worker.is_carrying_resources {
                Action::ReturnCargo
            } else {
                Action::Gather(resource_tag)
            };
            out.push(Command::new(worker_tag, action));
        }
    }

    #[cfg(test)]
    pub(crate) fn workers_on(&self, resource: UnitTag) -> usize {
        self.assignments.workers_on(resource)
    }
}
