use std::sync::Arc;

use fxhash::FxHashMap;
use parking_lot::RwLock;
use rayon::prelude::*;

use crate::problem::SchedulingProblem;
use crate::solver::allocation::Allocation;

/// Raw accumulated fitness terms, before weighting. Useful for logging and
/// for asserting on individual terms in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitnessBreakdown {
    pub used_resources: usize,
    pub idle_minutes: f64,
    pub deadhead_km: f64,
    pub infeasible_turnarounds: usize,
    pub overlaps: usize,
}

/// Evaluates allocations into a single minimized cost.
///
/// Evaluation is pure: it reads only the shared problem and the allocation,
/// so a whole generation can be scored in parallel. Scores are cached in a
/// concurrent map keyed by the allocation's structural hash, so elitist
/// carry-overs are re-scored for free. Writes are idempotent (same key, same
/// value), so a lost race costs one recomputation at most.
pub struct FitnessEvaluator {
    problem: Arc<SchedulingProblem>,
    cache: RwLock<FxHashMap<u64, f64>>,
}

impl FitnessEvaluator {
    pub fn new(problem: Arc<SchedulingProblem>) -> Self {
        FitnessEvaluator {
            problem,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn evaluate(&self, allocation: &Allocation) -> f64 {
        let key = allocation.structural_key();
        if let Some(&cached) = self.cache.read().get(&key) {
            return cached;
        }

        let cost = self.cost(&self.breakdown(allocation));
        self.cache.write().insert(key, cost);
        cost
    }

    pub fn evaluate_population(&self, population: &[Allocation]) -> Vec<f64> {
        population
            .par_iter()
            .map(|allocation| self.evaluate(allocation))
            .collect()
    }

    /// Accumulates the raw terms over every consecutive trip pair.
    pub fn breakdown(&self, allocation: &Allocation) -> FitnessBreakdown {
        let catalog = self.problem.catalog();
        let buffer = self.problem.config().turnaround;

        let mut breakdown = FitnessBreakdown {
            used_resources: allocation.used_resources(),
            ..FitnessBreakdown::default()
        };

        for resource in allocation.resources() {
            let trips = allocation.sorted_trips(resource, catalog);

            for pair in trips.windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                let gap_minutes = self.problem.gap(prev, next).as_secs_f64() / 60.0;

                breakdown.idle_minutes += gap_minutes.max(0.0);

                if catalog.trip(prev).end() + buffer > catalog.trip(next).start() {
                    breakdown.overlaps += 1;
                }

                // Unknown stops contribute nothing rather than failing the
                // evaluation.
                if let Some(km) = self.problem.deadhead_km(prev, next) {
                    breakdown.deadhead_km += km;
                }
                if let Some(travel) = self.problem.deadhead_travel_time(prev, next) {
                    if travel.as_secs_f64() / 60.0 > gap_minutes {
                        breakdown.infeasible_turnarounds += 1;
                    }
                }
            }
        }

        breakdown
    }

    /// Weighted cost. Every term is a cost; the overlap term applies to the
    /// raw count so that one overlap outweighs all normalized terms combined.
    pub fn cost(&self, breakdown: &FitnessBreakdown) -> f64 {
        let config = self.problem.config();
        let weights = &config.weights;
        let norms = &config.norms;

        let used_fraction = breakdown.used_resources as f64 / config.fleet_size as f64;
        let idle = (breakdown.idle_minutes / norms.max_idle_minutes).min(1.0);
        let deadhead = (breakdown.deadhead_km / norms.max_deadhead_km).min(1.0);
        let infeasible = (breakdown.infeasible_turnarounds as f64
            / norms.max_infeasible_turnarounds)
            .min(1.0);

        weights.resource_usage * used_fraction
            + weights.idle * idle
            + weights.deadhead * deadhead
            + weights.infeasible_turnaround * infeasible
            + weights.overlap * breakdown.overlaps as f64
    }
}

#[cfg(test)]
mod tests {
    use headway_transit::trip::TripIdx;

    use super::*;
    use crate::solver::allocation::ResourceIdx;
    use crate::test_utils;

    #[test]
    fn test_overlap_dominates_everything_else() {
        let problem = test_utils::problem(
            vec![
                test_utils::trip("a", "09:00:00", "09:30:00"),
                test_utils::trip("b", "09:15:00", "09:45:00"),
            ],
            2,
            0,
        );
        let evaluator = FitnessEvaluator::new(problem);

        // Both trips on one resource: one overlap.
        let mut overlapping = Allocation::new(2);
        overlapping.push(ResourceIdx::new(0), TripIdx::new(0));
        overlapping.push(ResourceIdx::new(0), TripIdx::new(1));

        // Spread across both resources: full fleet used, no overlap.
        let mut spread = Allocation::new(2);
        spread.push(ResourceIdx::new(0), TripIdx::new(0));
        spread.push(ResourceIdx::new(1), TripIdx::new(1));

        assert!(evaluator.evaluate(&spread) < evaluator.evaluate(&overlapping));
    }

    #[test]
    fn test_empty_allocation_has_finite_fitness() {
        let problem = test_utils::problem(Vec::new(), 3, 10);
        let evaluator = FitnessEvaluator::new(problem);

        let cost = evaluator.evaluate(&Allocation::new(3));
        assert!(cost.is_finite());
        assert!(!cost.is_nan());
    }

    #[test]
    fn test_unknown_stops_do_not_fail_evaluation() {
        let problem = test_utils::problem(
            vec![
                test_utils::trip_between("a", "09:00:00", "09:30:00", "nowhere", "elsewhere"),
                test_utils::trip_between("b", "10:00:00", "10:30:00", "elsewhere", "nowhere"),
            ],
            1,
            0,
        );
        let evaluator = FitnessEvaluator::new(problem);

        let mut allocation = Allocation::new(1);
        allocation.push(ResourceIdx::new(0), TripIdx::new(0));
        allocation.push(ResourceIdx::new(0), TripIdx::new(1));

        let breakdown = evaluator.breakdown(&allocation);
        assert_eq!(breakdown.deadhead_km, 0.0);
        assert!(evaluator.evaluate(&allocation).is_finite());
    }

    #[test]
    fn test_idle_time_is_accumulated() {
        let problem = test_utils::problem(
            vec![
                test_utils::trip("a", "09:00:00", "09:30:00"),
                test_utils::trip("b", "10:00:00", "10:30:00"),
            ],
            1,
            0,
        );
        let evaluator = FitnessEvaluator::new(problem);

        let mut allocation = Allocation::new(1);
        allocation.push(ResourceIdx::new(0), TripIdx::new(0));
        allocation.push(ResourceIdx::new(0), TripIdx::new(1));

        let breakdown = evaluator.breakdown(&allocation);
        assert!((breakdown.idle_minutes - 30.0).abs() < 1e-9);
        assert_eq!(breakdown.overlaps, 0);
    }

    #[test]
    fn test_cache_hit_matches_fresh_evaluation() {
        let problem = test_utils::problem(
            vec![
                test_utils::trip("a", "09:00:00", "09:30:00"),
                test_utils::trip("b", "10:00:00", "10:30:00"),
            ],
            2,
            10,
        );
        let evaluator = FitnessEvaluator::new(problem);

        let mut allocation = Allocation::new(2);
        allocation.push(ResourceIdx::new(0), TripIdx::new(0));
        allocation.push(ResourceIdx::new(1), TripIdx::new(1));

        let first = evaluator.evaluate(&allocation);
        let second = evaluator.evaluate(&allocation);
        assert_eq!(first, second);
    }
}
