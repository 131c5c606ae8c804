use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use headway_scheduler::pipeline::{self, PipelineParams};
use headway_transit::oracle::DistanceOracle;
use headway_transit::tables;
use tracing::info;

use crate::optimize::{GaArgs, SchedulingArgs};

#[derive(Args)]
pub struct RunArgs {
    /// Resolved trips table (catalog stage output)
    #[arg(short = 'i', long)]
    trips: PathBuf,

    /// Stops reference table
    #[arg(short = 's', long)]
    stops: PathBuf,

    /// Fleet sizes to try as independent configurations
    #[arg(short = 'f', long, num_args = 1.., required = true)]
    fleet_sizes: Vec<usize>,

    /// Driver pool for the second assignment pass
    #[arg(long)]
    drivers: Option<usize>,

    /// Output directory for all stage artifacts
    #[arg(short = 'o', long)]
    out: PathBuf,

    #[command(flatten)]
    scheduling: SchedulingArgs,

    #[command(flatten)]
    ga: GaArgs,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let catalog = tables::read_trips(&args.trips)?;
    let stops = tables::read_stops(&args.stops)?;
    info!(trips = catalog.len(), stops = stops.len(), "inputs loaded");

    let base_config = args.scheduling.to_config(1);
    let oracle = Arc::new(DistanceOracle::new(stops, base_config.average_speed_kmh));

    let params = PipelineParams {
        fleet_sizes: args.fleet_sizes,
        drivers: args.drivers,
        ga: args.ga.to_params(),
        output_dir: args.out,
    };

    let outcome = pipeline::run(&catalog, &oracle, &base_config, &params)?;

    let winner = &outcome.winner;
    info!(
        winner = %winner.label,
        used_resources = winner.statistics.used_resources,
        total_distance_km = winner.statistics.distance_km.total,
        fuel_cost = winner.statistics.fuel_cost.total,
        emissions_kg = winner.statistics.emissions_kg.total,
        remaining_overlaps = winner.report.remaining_overlaps,
        unassigned = winner.unassigned,
        "pipeline finished"
    );

    if let Some(driver) = &outcome.driver {
        info!(
            drivers_used = driver.statistics.used_resources,
            remaining_overlaps = driver.report.remaining_overlaps,
            "driver assignment finished"
        );
    }

    Ok(())
}
