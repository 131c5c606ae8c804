use fxhash::FxHashSet;
use headway_transit::trip::TripIdx;
use rand::Rng;

use crate::problem::SchedulingProblem;
use crate::solver::allocation::{Allocation, ResourceIdx};

/// Single-point crossover over the resource-index space.
///
/// Each child takes resource slots `[0, split)` from one parent and
/// `[split, n)` from the other. The slice boundary can drop or duplicate
/// trips, so each child is repaired afterwards: duplicates removed, missing
/// trips re-inserted into the cheapest conflict-free slot.
pub fn crossover(
    problem: &SchedulingProblem,
    parent1: &Allocation,
    parent2: &Allocation,
    rng: &mut impl Rng,
) -> (Allocation, Allocation) {
    let resources = parent1.resource_count().min(parent2.resource_count());
    let split = if resources > 1 {
        rng.random_range(1..resources)
    } else {
        0
    };

    let child_a = splice(parent1, parent2, split, resources);
    let child_b = splice(parent2, parent1, split, resources);

    let parent_coverage: FxHashSet<TripIdx> = parent1
        .assigned_set()
        .union(&parent2.assigned_set())
        .copied()
        .collect();

    (
        repair_coverage(problem, child_a, &parent_coverage),
        repair_coverage(problem, child_b, &parent_coverage),
    )
}

fn splice(head: &Allocation, tail: &Allocation, split: usize, resources: usize) -> Allocation {
    let assignments = (0..resources)
        .map(|i| {
            let source = if i < split { head } else { tail };
            source.trips(ResourceIdx::new(i)).to_vec()
        })
        .collect();

    Allocation::from_assignments(assignments)
}

/// Restores the exact-coverage invariant relative to what the parents carried.
fn repair_coverage(
    problem: &SchedulingProblem,
    mut child: Allocation,
    parent_coverage: &FxHashSet<TripIdx>,
) -> Allocation {
    let mut seen = FxHashSet::default();
    for resource in child.resources().collect::<Vec<_>>() {
        child.trips_mut(resource).retain(|&trip| seen.insert(trip));
    }

    let mut missing: Vec<TripIdx> = parent_coverage.difference(&seen).copied().collect();
    missing.sort_by_key(|&t| (problem.catalog().trip(t).start(), t));

    for trip in missing {
        let slot = cheapest_slot(problem, &child, trip).unwrap_or_else(|| emptiest_slot(&child));
        child.push(slot, trip);
    }

    child
}

/// The conflict-free slot creating the least idle time before the trip, if
/// any slot can take it at all.
fn cheapest_slot(
    problem: &SchedulingProblem,
    child: &Allocation,
    trip: TripIdx,
) -> Option<ResourceIdx> {
    let catalog = problem.catalog();
    let buffer = problem.config().turnaround;
    let start = catalog.trip(trip).start();
    let end = catalog.trip(trip).end();

    let mut best: Option<(i64, ResourceIdx)> = None;

    for resource in child.resources() {
        let existing = child.trips(resource);

        let fits = existing.iter().all(|&other| {
            let other_trip = catalog.trip(other);
            end + buffer <= other_trip.start()
                || other_trip.end() + buffer <= start
        });
        if !fits {
            continue;
        }

        let idle_before = existing
            .iter()
            .map(|&other| catalog.trip(other).end())
            .filter(|&other_end| other_end + buffer <= start)
            .map(|other_end| start.seconds() - other_end.seconds())
            .min()
            .unwrap_or(0);

        if best.is_none_or(|(cost, _)| idle_before < cost) {
            best = Some((idle_before, resource));
        }
    }

    best.map(|(_, resource)| resource)
}

fn emptiest_slot(child: &Allocation) -> ResourceIdx {
    child
        .resources()
        .min_by_key(|&r| child.trips(r).len())
        .expect("allocations always have at least one resource")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::solver::initialize::greedy_allocation;
    use crate::test_utils;

    #[test]
    fn test_children_cover_every_trip_exactly_once() {
        let trips = (0..10)
            .map(|i| {
                test_utils::trip(
                    &format!("t{i}"),
                    &format!("{:02}:00:00", 6 + i),
                    &format!("{:02}:40:00", 6 + i),
                )
            })
            .collect();
        let problem = test_utils::problem(trips, 4, 0);
        let mut rng = SmallRng::seed_from_u64(11);

        let parent1 = greedy_allocation(&problem, &mut rng);
        let parent2 = greedy_allocation(&problem, &mut rng);

        for _ in 0..20 {
            let (child_a, child_b) = crossover(&problem, &parent1, &parent2, &mut rng);

            for child in [&child_a, &child_b] {
                assert_eq!(child.assigned_trips(), 10, "trip duplicated or dropped");
                assert_eq!(child.assigned_set().len(), 10);
            }
        }
    }

    #[test]
    fn test_reinsertion_prefers_conflict_free_slot() {
        // One busy slot and one free slot; the missing trip conflicts with
        // the busy slot, so repair must put it on the free one.
        let problem = test_utils::problem(
            vec![
                test_utils::trip("a", "09:00:00", "09:30:00"),
                test_utils::trip("b", "09:10:00", "09:40:00"),
            ],
            2,
            0,
        );

        let mut parent1 = Allocation::new(2);
        parent1.push(ResourceIdx::new(0), TripIdx::new(0));
        parent1.push(ResourceIdx::new(1), TripIdx::new(1));

        let mut parent2 = Allocation::new(2);
        parent2.push(ResourceIdx::new(0), TripIdx::new(1));
        parent2.push(ResourceIdx::new(1), TripIdx::new(0));

        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..10 {
            let (child_a, child_b) = crossover(&problem, &parent1, &parent2, &mut rng);
            for child in [&child_a, &child_b] {
                assert_eq!(child.assigned_set().len(), 2);
                assert_eq!(
                    child
                        .conflicts(problem.catalog(), jiff::SignedDuration::ZERO)
                        .overlaps,
                    0
                );
            }
        }
    }
}
