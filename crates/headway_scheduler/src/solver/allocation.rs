use std::hash::{Hash, Hasher};

use fxhash::{FxHashSet, FxHasher64};
use headway_transit::catalog::TripCatalog;
use headway_transit::define_index_newtype;
use headway_transit::trip::TripIdx;
use jiff::SignedDuration;

define_index_newtype!(ResourceIdx);

/// Overlap summary for one allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConflictSummary {
    pub overlaps: usize,
    pub resources_with_overlaps: usize,
}

/// One candidate solution: an ordered trip list per resource slot.
///
/// The stored order is incidental; whenever timing matters the per-resource
/// list is re-sorted by trip start. Individuals are copy-on-write by
/// convention: genetic operators clone before touching, so a generation
/// being evaluated in parallel only ever sees immutable allocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    assignments: Vec<Vec<TripIdx>>,
}

impl Allocation {
    pub fn new(fleet_size: usize) -> Self {
        Allocation {
            assignments: vec![Vec::new(); fleet_size],
        }
    }

    pub fn from_assignments(assignments: Vec<Vec<TripIdx>>) -> Self {
        Allocation { assignments }
    }

    pub fn resource_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn used_resources(&self) -> usize {
        self.assignments.iter().filter(|t| !t.is_empty()).count()
    }

    pub fn assigned_trips(&self) -> usize {
        self.assignments.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.iter().all(Vec::is_empty)
    }

    pub fn trips(&self, resource: ResourceIdx) -> &[TripIdx] {
        &self.assignments[resource.get()]
    }

    pub fn trips_mut(&mut self, resource: ResourceIdx) -> &mut Vec<TripIdx> {
        &mut self.assignments[resource.get()]
    }

    pub fn push(&mut self, resource: ResourceIdx, trip: TripIdx) {
        self.assignments[resource.get()].push(trip);
    }

    pub fn add_resource(&mut self) -> ResourceIdx {
        self.assignments.push(Vec::new());
        ResourceIdx::new(self.assignments.len() - 1)
    }

    pub fn resources(&self) -> impl Iterator<Item = ResourceIdx> {
        (0..self.assignments.len()).map(ResourceIdx::new)
    }

    /// Sorts every resource's trip list into time order.
    pub fn normalize(&mut self, catalog: &TripCatalog) {
        for trips in &mut self.assignments {
            trips.sort_by_key(|&t| (catalog.trip(t).start(), t));
        }
    }

    /// One resource's trips in time order, without mutating the allocation.
    pub fn sorted_trips(&self, resource: ResourceIdx, catalog: &TripCatalog) -> Vec<TripIdx> {
        let mut trips = self.assignments[resource.get()].clone();
        trips.sort_by_key(|&t| (catalog.trip(t).start(), t));
        trips
    }

    /// Counts buffered overlaps: adjacent time-ordered trips on one resource
    /// with `prev.end + buffer > next.start`.
    pub fn conflicts(&self, catalog: &TripCatalog, buffer: SignedDuration) -> ConflictSummary {
        let mut summary = ConflictSummary::default();

        for resource in self.resources() {
            let trips = self.sorted_trips(resource, catalog);
            let overlaps = trips
                .windows(2)
                .filter(|pair| {
                    let end = catalog.trip(pair[0]).end() + buffer;
                    end > catalog.trip(pair[1]).start()
                })
                .count();

            if overlaps > 0 {
                summary.overlaps += overlaps;
                summary.resources_with_overlaps += 1;
            }
        }

        summary
    }

    pub fn assigned_set(&self) -> FxHashSet<TripIdx> {
        self.assignments.iter().flatten().copied().collect()
    }

    /// Catalog trips not present in any resource's list.
    pub fn unassigned(&self, catalog: &TripCatalog) -> Vec<TripIdx> {
        let assigned = self.assigned_set();
        catalog.indices().filter(|t| !assigned.contains(t)).collect()
    }

    /// Structural cache key: identical trip sets per resource hash equal,
    /// regardless of within-resource order.
    pub fn structural_key(&self) -> u64 {
        let mut hasher = FxHasher64::default();
        self.assignments.len().hash(&mut hasher);

        for trips in &self.assignments {
            let mut sorted = trips.clone();
            sorted.sort_unstable();
            sorted.len().hash(&mut hasher);
            for trip in sorted {
                trip.get().hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}
