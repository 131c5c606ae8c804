use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use headway_scheduler::config::SchedulerConfig;
use headway_scheduler::pipeline::artifacts;
use headway_scheduler::problem::SchedulingProblem;
use headway_scheduler::solver::params::{GaParams, Termination};
use headway_scheduler::solver::search::GaSearch;
use headway_transit::oracle::DistanceOracle;
use headway_transit::tables;
use tracing::info;

use crate::parsers;

#[derive(Args, Clone)]
pub struct GaArgs {
    /// Generations to run
    #[arg(long, default_value_t = 100)]
    pub generations: usize,

    #[arg(long, default_value_t = 50)]
    pub population: usize,

    /// Individuals carried over unchanged each generation
    #[arg(long, default_value_t = 2)]
    pub elites: usize,

    #[arg(long, default_value_t = 3)]
    pub tournament: usize,

    #[arg(long, default_value_t = 0.3)]
    pub mutation_rate: f64,

    /// Stop early after this many generations without improvement
    #[arg(long, default_value_t = 15)]
    pub stall: usize,

    /// Wall-clock limit for the search (e.g. "5m")
    #[arg(long, value_parser = parsers::parse_duration)]
    pub max_duration: Option<jiff::SignedDuration>,

    /// Generations between checkpoint exports
    #[arg(long, default_value_t = 10)]
    pub checkpoint_interval: usize,

    /// Fixed seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

impl GaArgs {
    pub fn to_params(&self) -> GaParams {
        let mut terminations = vec![
            Termination::Generations(self.generations),
            Termination::GenerationsWithoutImprovement(self.stall),
        ];
        if let Some(duration) = self.max_duration {
            terminations.push(Termination::Duration(duration));
        }

        GaParams {
            population_size: self.population,
            elite_count: self.elites,
            tournament_size: self.tournament,
            mutation_probability: self.mutation_rate,
            terminations,
            checkpoint_interval: self.checkpoint_interval,
            seed: self.seed,
            ..GaParams::default()
        }
    }
}

#[derive(Args, Clone)]
pub struct SchedulingArgs {
    /// Minimum turnaround between consecutive trips on one resource
    #[arg(long, value_parser = parsers::parse_duration, default_value = "10m")]
    pub turnaround: jiff::SignedDuration,

    /// Assumed deadhead speed in km/h
    #[arg(long, default_value_t = 50.0)]
    pub speed: f64,
}

impl SchedulingArgs {
    pub fn to_config(&self, fleet_size: usize) -> SchedulerConfig {
        let mut config = SchedulerConfig::new(fleet_size, self.turnaround);
        config.average_speed_kmh = self.speed;
        config
    }
}

#[derive(Args)]
pub struct OptimizeArgs {
    /// Resolved trips table (catalog stage output)
    #[arg(short = 'i', long)]
    trips: PathBuf,

    /// Stops reference table
    #[arg(short = 's', long)]
    stops: PathBuf,

    #[arg(short = 'f', long)]
    fleet_size: usize,

    /// Output path for the best allocation
    #[arg(short = 'o', long)]
    out: PathBuf,

    #[command(flatten)]
    scheduling: SchedulingArgs,

    #[command(flatten)]
    ga: GaArgs,
}

pub fn run(args: OptimizeArgs) -> anyhow::Result<()> {
    let catalog = tables::read_trips(&args.trips)?;
    let stops = tables::read_stops(&args.stops)?;
    info!(trips = catalog.len(), stops = stops.len(), "inputs loaded");

    let config = args.scheduling.to_config(args.fleet_size);
    let oracle = Arc::new(DistanceOracle::new(stops, config.average_speed_kmh));
    let problem = Arc::new(SchedulingProblem::new(catalog, oracle, config)?);

    let mut search = GaSearch::new(Arc::clone(&problem), args.ga.to_params());
    search.on_best(|best| {
        info!(
            generation = best.generation,
            fitness = best.fitness,
            used = best.allocation.used_resources(),
            "new best allocation"
        );
    });

    let outcome = search.run();
    artifacts::write_allocation_to_path(&args.out, problem.catalog(), &outcome.best)?;

    info!(
        fitness = outcome.best_fitness,
        generations = outcome.generations,
        used = outcome.best.used_resources(),
        unassigned = outcome.unassigned.len(),
        out = %args.out.display(),
        "optimization finished"
    );

    Ok(())
}
