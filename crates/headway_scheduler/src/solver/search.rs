use std::sync::Arc;

use headway_transit::trip::TripIdx;
use jiff::Timestamp;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info};

use crate::problem::SchedulingProblem;
use crate::solver::allocation::Allocation;
use crate::solver::crossover::crossover;
use crate::solver::fitness::FitnessEvaluator;
use crate::solver::initialize::greedy_population;
use crate::solver::mutation::mutate;
use crate::solver::params::{GaParams, Termination};
use crate::solver::select::tournament;

/// One scored member of the population.
#[derive(Clone)]
pub struct Individual {
    pub allocation: Allocation,
    pub fitness: f64,
}

/// Snapshot handed to the best-solution callback.
pub struct GenerationBest<'a> {
    pub generation: usize,
    pub fitness: f64,
    pub allocation: &'a Allocation,
}

pub struct SearchOutcome {
    pub best: Allocation,
    pub best_fitness: f64,
    pub generations: usize,
    pub unassigned: Vec<TripIdx>,
}

type BestCallback = Box<dyn FnMut(&GenerationBest<'_>) + Send>;

/// Generational genetic search over trip-to-resource allocations.
///
/// Generations run strictly in sequence (each depends on the previous
/// selection), but each generation's fitness evaluation fans out across the
/// population. The best individual is reported through `on_best` on every
/// improvement and every `checkpoint_interval` generations, so long runs are
/// auditable and recoverable mid-flight.
pub struct GaSearch {
    problem: Arc<SchedulingProblem>,
    params: GaParams,
    evaluator: FitnessEvaluator,
    on_best: Option<BestCallback>,
}

impl GaSearch {
    pub fn new(problem: Arc<SchedulingProblem>, params: GaParams) -> Self {
        let evaluator = FitnessEvaluator::new(Arc::clone(&problem));

        GaSearch {
            problem,
            params,
            evaluator,
            on_best: None,
        }
    }

    pub fn on_best<F>(&mut self, callback: F)
    where
        F: FnMut(&GenerationBest<'_>) + Send + 'static,
    {
        self.on_best = Some(Box::new(callback));
    }

    pub fn run(&mut self) -> SearchOutcome {
        let started = Timestamp::now();
        let mut rng = match self.params.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let population_size = self.params.population_size.max(1);
        let elite_count = self.params.elite_count.min(population_size);

        let population = greedy_population(&self.problem, population_size, &mut rng);
        let mut individuals = self.evaluate(population);

        let mut best = individuals[0].clone();
        let mut without_improvement = 0usize;
        let mut generation = 0usize;

        self.report(&GenerationBest {
            generation,
            fitness: best.fitness,
            allocation: &best.allocation,
        });

        loop {
            if let Some(reason) = self.should_stop(generation, without_improvement, started) {
                info!(generation, reason, best_fitness = best.fitness, "search finished");
                break;
            }

            let mut next: Vec<Allocation> = individuals
                .iter()
                .take(elite_count)
                .map(|individual| individual.allocation.clone())
                .collect();

            while next.len() < population_size {
                let parent1 = tournament(&individuals, self.params.tournament_size, &mut rng);
                let parent2 = tournament(&individuals, self.params.tournament_size, &mut rng);

                let (mut child_a, mut child_b) = crossover(
                    &self.problem,
                    &parent1.allocation,
                    &parent2.allocation,
                    &mut rng,
                );
                mutate(&mut child_a, &self.params, &mut rng);
                mutate(&mut child_b, &self.params, &mut rng);

                next.push(child_a);
                if next.len() < population_size {
                    next.push(child_b);
                }
            }

            individuals = self.evaluate(next);
            generation += 1;

            let improved = individuals[0].fitness < best.fitness;
            if improved {
                best = individuals[0].clone();
                without_improvement = 0;
            } else {
                without_improvement += 1;
            }

            debug!(
                generation,
                generation_best = individuals[0].fitness,
                best_ever = best.fitness,
                "generation complete"
            );

            if improved || generation % self.params.checkpoint_interval.max(1) == 0 {
                self.report(&GenerationBest {
                    generation,
                    fitness: best.fitness,
                    allocation: &best.allocation,
                });
            }
        }

        let unassigned = best.allocation.unassigned(self.problem.catalog());
        if !unassigned.is_empty() {
            info!(
                count = unassigned.len(),
                "best allocation leaves trips unassigned"
            );
        }

        SearchOutcome {
            best_fitness: best.fitness,
            best: best.allocation,
            generations: generation,
            unassigned,
        }
    }

    /// Scores a population in parallel and orders it best-first.
    fn evaluate(&self, population: Vec<Allocation>) -> Vec<Individual> {
        let fitnesses = self.evaluator.evaluate_population(&population);

        let mut individuals: Vec<Individual> = population
            .into_iter()
            .zip(fitnesses)
            .map(|(allocation, fitness)| Individual {
                allocation,
                fitness,
            })
            .collect();

        individuals.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
        individuals
    }

    fn should_stop(
        &self,
        generation: usize,
        without_improvement: usize,
        started: Timestamp,
    ) -> Option<&'static str> {
        for termination in &self.params.terminations {
            match termination {
                Termination::Generations(max) if generation >= *max => {
                    return Some("generation limit");
                }
                Termination::GenerationsWithoutImprovement(max)
                    if without_improvement >= *max =>
                {
                    return Some("no improvement");
                }
                Termination::Duration(max)
                    if Timestamp::now().duration_since(started) >= *max =>
                {
                    return Some("time limit");
                }
                _ => {}
            }
        }

        None
    }

    fn report(&mut self, best: &GenerationBest<'_>) {
        if let Some(callback) = self.on_best.as_mut() {
            callback(best);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::test_utils;

    fn fast_params(seed: u64) -> GaParams {
        GaParams {
            population_size: 12,
            elite_count: 2,
            tournament_size: 3,
            mutation_probability: 0.5,
            terminations: vec![Termination::Generations(15)],
            checkpoint_interval: 1,
            seed: Some(seed),
            ..GaParams::default()
        }
    }

    #[test]
    fn test_best_fitness_is_non_increasing_under_elitism() {
        let trips = (0..10)
            .map(|i| {
                test_utils::trip(
                    &format!("t{i}"),
                    &format!("{:02}:00:00", 6 + i),
                    &format!("{:02}:45:00", 6 + i),
                )
            })
            .collect();
        let problem = test_utils::problem(trips, 5, 0);

        let history = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&history);

        let mut search = GaSearch::new(problem, fast_params(42));
        search.on_best(move |best| sink.lock().unwrap().push(best.fitness));

        let outcome = search.run();

        let history = history.lock().unwrap();
        assert!(!history.is_empty());
        for pair in history.windows(2) {
            assert!(
                pair[1] <= pair[0],
                "best fitness increased: {} -> {}",
                pair[0],
                pair[1]
            );
        }
        assert_eq!(outcome.best_fitness, *history.last().unwrap());
    }

    #[test]
    fn test_search_covers_all_trips_with_enough_fleet() {
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

        let outcome = GaSearch::new(problem, fast_params(1)).run();
        assert!(outcome.unassigned.is_empty());
        assert_eq!(outcome.best.assigned_trips(), 8);
    }

    #[test]
    fn test_empty_catalog_yields_empty_allocation_and_finite_fitness() {
        let problem = test_utils::problem(Vec::new(), 3, 10);

        let outcome = GaSearch::new(problem, fast_params(1)).run();
        assert!(outcome.best.is_empty());
        assert!(outcome.best_fitness.is_finite());
        assert!(outcome.unassigned.is_empty());
    }

    #[test]
    fn test_no_improvement_stops_early() {
        let problem = test_utils::problem(
            vec![test_utils::trip("only", "09:00:00", "09:30:00")],
            1,
            0,
        );

        let params = GaParams {
            terminations: vec![
                Termination::Generations(10_000),
                Termination::GenerationsWithoutImprovement(3),
            ],
            ..fast_params(9)
        };

        let outcome = GaSearch::new(problem, params).run();
        assert!(outcome.generations < 10_000);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let trips = (0..6)
            .map(|i| {
                test_utils::trip(
                    &format!("t{i}"),
                    &format!("{:02}:15:00", 7 + i),
                    &format!("{:02}:50:00", 7 + i),
                )
            })
            .collect::<Vec<_>>();

        let first = GaSearch::new(test_utils::problem(trips.clone(), 3, 5), fast_params(77)).run();
        let second = GaSearch::new(test_utils::problem(trips, 3, 5), fast_params(77)).run();

        assert_eq!(first.best_fitness, second.best_fitness);
        assert_eq!(
            first.best.structural_key(),
            second.best.structural_key()
        );
    }
}
