use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rand::Rng;
use tracing::debug;

use crate::problem::SchedulingProblem;
use crate::solver::allocation::{Allocation, ResourceIdx};

// Sentinel "free since forever" for resources with no trips yet; far enough
// from i64::MIN that adding a buffer cannot overflow.
const NEVER_BUSY: i64 = i64::MIN / 4;

/// Builds one greedy candidate: trips in start order, each assigned to a
/// resource drawn at random from all resources free at its start time.
///
/// The priority queue is keyed on `(free_at, resource)`; every resource whose
/// `free_at + turnaround <= trip.start` is an equally valid candidate and the
/// random draw among them is what diversifies the initial population. Trips
/// with no free resource stay unassigned: a diagnostic, not an error.
pub fn greedy_allocation(problem: &SchedulingProblem, rng: &mut impl Rng) -> Allocation {
    let catalog = problem.catalog();
    let buffer = problem.config().turnaround_seconds();

    let mut allocation = Allocation::new(problem.fleet_size());
    let mut heap: BinaryHeap<Reverse<(i64, usize)>> = (0..problem.fleet_size())
        .map(|resource| Reverse((NEVER_BUSY, resource)))
        .collect();

    let mut unassigned = 0usize;

    // The catalog is already start-time ordered.
    for trip_index in catalog.indices() {
        let trip = catalog.trip(trip_index);

        let mut free = Vec::new();
        while let Some(&Reverse((free_at, resource))) = heap.peek() {
            if free_at + buffer <= trip.start().seconds() {
                heap.pop();
                free.push((free_at, resource));
            } else {
                break;
            }
        }

        if free.is_empty() {
            unassigned += 1;
            continue;
        }

        let chosen = rng.random_range(0..free.len());
        for (i, (free_at, resource)) in free.into_iter().enumerate() {
            if i == chosen {
                allocation.push(ResourceIdx::new(resource), trip_index);
                heap.push(Reverse((trip.end().seconds(), resource)));
            } else {
                heap.push(Reverse((free_at, resource)));
            }
        }
    }

    if unassigned > 0 {
        debug!(unassigned, "greedy seed left trips without a free resource");
    }

    allocation
}

pub fn greedy_population(
    problem: &SchedulingProblem,
    population_size: usize,
    rng: &mut impl Rng,
) -> Vec<Allocation> {
    (0..population_size)
        .map(|_| greedy_allocation(problem, rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::test_utils;

    #[test]
    fn test_greedy_seed_is_overlap_free() {
        let problem = test_utils::problem(
            vec![
                test_utils::trip("a", "09:00:00", "09:30:00"),
                test_utils::trip("b", "09:15:00", "09:45:00"),
                test_utils::trip("c", "09:45:00", "10:15:00"),
                test_utils::trip("d", "10:00:00", "10:30:00"),
            ],
            4,
            0,
        );
        let mut rng = SmallRng::seed_from_u64(7);

        for allocation in greedy_population(&problem, 20, &mut rng) {
            let summary = allocation.conflicts(problem.catalog(), SignedDuration::ZERO);
            assert_eq!(summary.overlaps, 0);
        }
    }

    #[test]
    fn test_greedy_seed_covers_all_trips_with_enough_fleet() {
        let problem = test_utils::problem(
            vec![
                test_utils::trip("a", "09:00:00", "09:30:00"),
                test_utils::trip("b", "09:15:00", "09:45:00"),
                test_utils::trip("c", "09:45:00", "10:15:00"),
            ],
            3,
            10,
        );
        let mut rng = SmallRng::seed_from_u64(7);

        let allocation = greedy_allocation(&problem, &mut rng);
        assert_eq!(allocation.assigned_trips(), 3);
        assert!(allocation.unassigned(problem.catalog()).is_empty());
    }

    #[test]
    fn test_greedy_seed_reports_unassigned_when_fleet_too_small() {
        // Two fully overlapping trips cannot share one resource.
        let problem = test_utils::problem(
            vec![
                test_utils::trip("a", "09:00:00", "10:00:00"),
                test_utils::trip("b", "09:00:00", "10:00:00"),
            ],
            1,
            0,
        );
        let mut rng = SmallRng::seed_from_u64(7);

        let allocation = greedy_allocation(&problem, &mut rng);
        assert_eq!(allocation.assigned_trips(), 1);
        assert_eq!(allocation.unassigned(problem.catalog()).len(), 1);
    }

    #[test]
    fn test_population_is_diverse() {
        let trips = (0..12)
            .map(|i| {
                test_utils::trip(
                    &format!("t{i}"),
                    &format!("{:02}:00:00", 6 + i),
                    &format!("{:02}:30:00", 6 + i),
                )
            })
            .collect();
        let problem = test_utils::problem(trips, 6, 0);
        let mut rng = SmallRng::seed_from_u64(7);

        let population = greedy_population(&problem, 10, &mut rng);
        let keys: std::collections::HashSet<u64> =
            population.iter().map(Allocation::structural_key).collect();
        assert!(keys.len() > 1, "all greedy seeds were identical");
    }
}
