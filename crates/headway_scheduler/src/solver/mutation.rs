use rand::Rng;
use rand::seq::SliceRandom;

use crate::solver::allocation::{Allocation, ResourceIdx};
use crate::solver::params::GaParams;

/// Applies 1..=`max_mutation_ops` random operators with probability
/// `mutation_probability`.
///
/// Operators may introduce overlaps; fitness penalizes them and the repair
/// pass removes whatever survives the search. Forbidding them here would
/// just shrink the search space.
pub fn mutate(allocation: &mut Allocation, params: &GaParams, rng: &mut impl Rng) {
    if !rng.random_bool(params.mutation_probability) {
        return;
    }

    let ops = rng.random_range(1..=params.max_mutation_ops.max(1));
    for _ in 0..ops {
        match rng.random_range(0..3) {
            0 => swap_between_resources(allocation, rng),
            1 => move_trip(allocation, rng),
            _ => shuffle_resource(allocation, rng),
        }
    }
}

/// Exchanges one random trip between two random resources.
fn swap_between_resources(allocation: &mut Allocation, rng: &mut impl Rng) {
    let resources = allocation.resource_count();
    if resources < 2 {
        return;
    }

    let a = rng.random_range(0..resources);
    let b = rng.random_range(0..resources);
    if a == b || allocation.trips(ResourceIdx::new(a)).is_empty()
        || allocation.trips(ResourceIdx::new(b)).is_empty()
    {
        return;
    }

    let i = rng.random_range(0..allocation.trips(ResourceIdx::new(a)).len());
    let j = rng.random_range(0..allocation.trips(ResourceIdx::new(b)).len());

    let trip_a = allocation.trips(ResourceIdx::new(a))[i];
    let trip_b = allocation.trips(ResourceIdx::new(b))[j];
    allocation.trips_mut(ResourceIdx::new(a))[i] = trip_b;
    allocation.trips_mut(ResourceIdx::new(b))[j] = trip_a;
}

/// Moves one random trip from one resource to another.
fn move_trip(allocation: &mut Allocation, rng: &mut impl Rng) {
    let resources = allocation.resource_count();
    if resources < 2 {
        return;
    }

    let from = rng.random_range(0..resources);
    let to = rng.random_range(0..resources);
    if from == to || allocation.trips(ResourceIdx::new(from)).is_empty() {
        return;
    }

    let i = rng.random_range(0..allocation.trips(ResourceIdx::new(from)).len());
    let trip = allocation.trips_mut(ResourceIdx::new(from)).remove(i);
    allocation.push(ResourceIdx::new(to), trip);
}

/// Shuffles the stored order of one resource's list. Timing always re-sorts,
/// so this only perturbs order-sensitive operators like the crossover splice.
fn shuffle_resource(allocation: &mut Allocation, rng: &mut impl Rng) {
    let resources = allocation.resource_count();
    if resources == 0 {
        return;
    }

    let resource = rng.random_range(0..resources);
    allocation.trips_mut(ResourceIdx::new(resource)).shuffle(rng);
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::solver::initialize::greedy_allocation;
    use crate::test_utils;

    fn params_always_mutate() -> GaParams {
        GaParams {
            mutation_probability: 1.0,
            max_mutation_ops: 5,
            ..GaParams::default()
        }
    }

    #[test]
    fn test_mutation_conserves_trips() {
        let trips = (0..8)
            .map(|i| {
                test_utils::trip(
                    &format!("t{i}"),
                    &format!("{:02}:00:00", 6 + i),
                    &format!("{:02}:30:00", 6 + i),
                )
            })
            .collect();
        let problem = test_utils::problem(trips, 4, 0);
        let mut rng = SmallRng::seed_from_u64(5);
        let params = params_always_mutate();

        let mut allocation = greedy_allocation(&problem, &mut rng);
        let before = allocation.assigned_set();

        for _ in 0..100 {
            mutate(&mut allocation, &params, &mut rng);
        }

        assert_eq!(allocation.assigned_set(), before);
        assert_eq!(allocation.assigned_trips(), before.len());
    }

    #[test]
    fn test_mutation_eventually_changes_structure() {
        let trips = (0..8)
            .map(|i| {
                test_utils::trip(
                    &format!("t{i}"),
                    &format!("{:02}:00:00", 6 + i),
                    &format!("{:02}:30:00", 6 + i),
                )
            })
            .collect();
        let problem = test_utils::problem(trips, 4, 0);
        let mut rng = SmallRng::seed_from_u64(5);
        let params = params_always_mutate();

        let original = greedy_allocation(&problem, &mut rng);
        let mut mutated = original.clone();

        let mut changed = false;
        for _ in 0..50 {
            mutate(&mut mutated, &params, &mut rng);
            if mutated.structural_key() != original.structural_key() {
                changed = true;
                break;
            }
        }

        assert!(changed, "mutation never moved a trip between resources");
    }

    #[test]
    fn test_mutation_on_empty_allocation_is_a_noop() {
        let mut allocation = Allocation::new(3);
        let mut rng = SmallRng::seed_from_u64(5);

        mutate(&mut allocation, &params_always_mutate(), &mut rng);
        assert!(allocation.is_empty());
    }
}
