use crate::snapshot::UnitTag;
use rustc_hash::{FxHashMap, FxHashSet};

/// The worker-to-resource assignment graph of a single site.
///
/// Keeps a forward map (worker to the one resource it mines) and a reverse
/// index (resource to the set of assigned workers) that are only ever mutated
/// together, so the two can never drift apart.
#[derive(Default, Debug)]
pub struct AssignmentGraph {
    mining: FxHashMap<UnitTag, UnitTag>,
    mined_by: FxHashMap<UnitTag, FxHashSet<UnitTag>>,
}

impl AssignmentGraph {
    /// Assigns a worker to a resource, releasing any previous assignment of
    /// that worker first.
    pub fn assign(&mut self, worker: UnitTag, resource: UnitTag) {
        self.release_worker(worker);
        self.mining.insert(worker, resource);
        self.mined_by.entry(resource).or_default().insert(worker);
    }

    /// Removes a worker's assignment. Returns the resource it was mining.
    pub fn release_worker(&mut self, worker: UnitTag) -> Option<UnitTag> {
        let resource = self.mining.remove(&worker)?;
        if let Some(workers) = self.mined_by.get_mut(&resource) {
            workers.remove(&worker);
            if workers.is_empty() {
                self.mined_by.remove(&resource);
            }
        }
        Some(resource)
    }

    /// Removes a resource and all assignments to it. Returns the freed
    /// workers.
    pub fn release_resource(&mut self, resource: UnitTag) -> Vec<UnitTag> {
        let workers: Vec<UnitTag> = self
            .mined_by
            .remove(&resource)
            .map(|workers| workers.into_iter().collect())
            .unwrap_or_default();
        for &worker in workers.iter() {
            self.mining.remove(&worker);
        }
        workers
    }

    pub fn resource_of(&self, worker: UnitTag) -> Option<UnitTag> {
        self.mining.get(&worker).copied()
    }

    pub fn contains_worker(&self, worker: UnitTag) -> bool {
        self.mining.contains_key(&worker)
    }

    /// Number of workers assigned to the given resource.
    pub fn workers_on(&self, resource: UnitTag) -> usize {
        self.mined_by.get(&resource).map_or(0, |workers| workers.len())
    }

    /// An arbitrary worker currently assigned to the given resource.
    pub fn any_worker_on(&self, resource: UnitTag) -> Option<UnitTag> {
        self.mined_by
            .get(&resource)
            .and_then(|workers| workers.iter().next().copied())
    }

    /// Total number of assigned workers.
    pub fn len(&self) -> usize {
        self.mining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mining.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitTag, UnitTag)> + '_ {
        self.mining.iter().map(|(&worker, &resource)| (worker, resource))
    }

    pub fn workers(&self) -> impl Iterator<Item = UnitTag> + '_ {
        self.mining.keys().copied()
    }

    #[cfg(test)]
    fn check_mirror_invariant(&self) {
        for (&worker, &resource) in self.mining.iter() {
            assert!(self.mined_by[&resource].contains(&worker));
        }
        let reverse_count: usize = self.mined_by.values().map(|workers| workers.len()).sum();
        assert_eq!(reverse_count, self.mining.len());
    }
}
