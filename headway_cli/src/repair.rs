use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use headway_scheduler::pipeline::artifacts::{self, RepairReportRow};
use headway_scheduler::problem::SchedulingProblem;
use headway_scheduler::repair::repair;
use headway_transit::oracle::DistanceOracle;
use headway_transit::tables;
use tracing::{info, warn};

use crate::parsers;

#[derive(Args)]
pub struct RepairArgs {
    /// Allocation artifact to repair
    #[arg(short = 'i', long)]
    allocation: PathBuf,

    /// Resolved trips table the allocation refers to
    #[arg(short = 't', long)]
    trips: PathBuf,

    /// Output path for the repaired allocation
    #[arg(short = 'o', long)]
    out: PathBuf,

    /// Where to write the repair report row
    #[arg(long)]
    report: Option<PathBuf>,

    #[arg(long, value_parser = parsers::parse_duration, default_value = "10m")]
    turnaround: jiff::SignedDuration,

    #[arg(long, default_value_t = 10)]
    max_passes: usize,

    /// Forbid allocating resources beyond those already used
    #[arg(long)]
    cap_fleet: bool,
}

pub fn run(args: RepairArgs) -> anyhow::Result<()> {
    let catalog = tables::read_trips(&args.trips)?;
    let allocation = artifacts::read_allocation(&args.allocation, &catalog)?;

    let mut config = headway_scheduler::config::SchedulerConfig::new(
        allocation.resource_count().max(1),
        args.turnaround,
    );
    config.max_repair_passes = args.max_passes;
    config.allow_new_resources = !args.cap_fleet;

    // Repair never consults distances, so an empty oracle is enough here.
    let oracle = Arc::new(DistanceOracle::new(Vec::new(), config.average_speed_kmh));
    let problem = Arc::new(SchedulingProblem::new(catalog, oracle, config)?);

    let (repaired, report) = repair(&problem, &allocation);

    artifacts::write_allocation_to_path(&args.out, problem.catalog(), &repaired)?;

    let filename = args
        .allocation
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.allocation.display().to_string());

    info!(
        initial_overlaps = report.initial_overlaps,
        reassignments = report.reassignments,
        remaining_overlaps = report.remaining_overlaps,
        original_resources = report.original_resources,
        repaired_resources = report.repaired_resources,
        "repair finished"
    );
    if report.remaining_overlaps > 0 {
        warn!("some overlaps could not be fixed");
    }

    if let Some(report_path) = args.report {
        artifacts::write_rows_to_path(&report_path, &[RepairReportRow::new(filename, &report)])?;
    }

    Ok(())
}
