use headway_transit::catalog::TripCatalog;
use headway_transit::trip::TripIdx;
use jiff::SignedDuration;
use serde::Serialize;
use tracing::{info, warn};

use crate::problem::SchedulingProblem;
use crate::solver::allocation::{Allocation, ResourceIdx};

/// What the repair pass did to one allocation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RepairReport {
    pub original_resources: usize,
    pub repaired_resources: usize,
    pub initial_overlaps: usize,
    pub reassignments: usize,
    /// Nonzero means the pass bound was hit with conflicts left. That is a
    /// reportable infeasibility, not a panic.
    pub remaining_overlaps: usize,
    pub resources_with_overlaps: usize,
}

/// Deterministic overlap elimination.
///
/// Unlike the search this uses no randomness at all: same input, same output.
/// Each pass walks every resource's time-sorted list; the later trip of every
/// conflicting adjacent pair is moved to the lowest-indexed resource that can
/// take it without any conflict, or to a brand-new resource when none can.
/// Bounded passes guarantee termination; leftover conflicts are reported.
pub fn repair(problem: &SchedulingProblem, allocation: &Allocation) -> (Allocation, RepairReport) {
    let catalog = problem.catalog();
    let buffer = problem.config().turnaround;
    let max_passes = problem.config().max_repair_passes;

    let mut repaired = allocation.clone();
    repaired.normalize(catalog);

    let initial = repaired.conflicts(catalog, buffer);
    let original_resources = repaired.used_resources();
    let mut reassignments = 0usize;

    for pass in 0..max_passes {
        let conflicting = later_trips_of_conflicts(&repaired, catalog, buffer);
        if conflicting.is_empty() {
            break;
        }

        let mut progressed = false;
        for (source, trip) in conflicting {
            detach(&mut repaired, source, trip);

            let target = match find_slot(&repaired, catalog, buffer, trip) {
                Some(resource) => resource,
                None if problem.config().allow_new_resources => repaired.add_resource(),
                None => {
                    // Fleet is capped: leave the conflict in place and report
                    // it when the pass bound runs out.
                    insert_sorted(&mut repaired, source, trip, catalog);
                    continue;
                }
            };

            insert_sorted(&mut repaired, target, trip, catalog);
            reassignments += 1;
            progressed = true;
        }

        info!(pass, reassignments, "repair pass complete");

        if !progressed {
            break;
        }
    }

    let remaining = repaired.conflicts(catalog, buffer);
    if remaining.overlaps > 0 {
        warn!(
            remaining = remaining.overlaps,
            max_passes, "conflicts left after bounded repair"
        );
    }

    let report = RepairReport {
        original_resources,
        repaired_resources: repaired.used_resources(),
        initial_overlaps: initial.overlaps,
        reassignments,
        remaining_overlaps: remaining.overlaps,
        resources_with_overlaps: remaining.resources_with_overlaps,
    };

    (repaired, report)
}

/// The later trip of every conflicting adjacent pair, per resource.
fn later_trips_of_conflicts(
    allocation: &Allocation,
    catalog: &TripCatalog,
    buffer: SignedDuration,
) -> Vec<(ResourceIdx, TripIdx)> {
    let mut conflicting = Vec::new();

    for resource in allocation.resources() {
        let trips = allocation.sorted_trips(resource, catalog);
        for pair in trips.windows(2) {
            if catalog.trip(pair[0]).end() + buffer > catalog.trip(pair[1]).start() {
                conflicting.push((resource, pair[1]));
            }
        }
    }

    conflicting
}

/// Lowest-indexed resource that can take `trip` without any conflict.
fn find_slot(
    allocation: &Allocation,
    catalog: &TripCatalog,
    buffer: SignedDuration,
    trip: TripIdx,
) -> Option<ResourceIdx> {
    let start = catalog.trip(trip).start();
    let end = catalog.trip(trip).end();

    allocation.resources().find(|&resource| {
        allocation.trips(resource).iter().all(|&other| {
            let other_trip = catalog.trip(other);
            end + buffer <= other_trip.start()
                || other_trip.end() + buffer <= start
        })
    })
}

fn detach(allocation: &mut Allocation, resource: ResourceIdx, trip: TripIdx) {
    allocation.trips_mut(resource).retain(|&t| t != trip);
}

fn insert_sorted(
    allocation: &mut Allocation,
    resource: ResourceIdx,
    trip: TripIdx,
    catalog: &TripCatalog,
) {
    allocation.push(resource, trip);
    allocation
        .trips_mut(resource)
        .sort_by_key(|&t| (catalog.trip(t).start(), t));
}
