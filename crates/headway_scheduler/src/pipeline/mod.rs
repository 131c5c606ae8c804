pub mod artifacts;
pub mod checkpoint;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use headway_transit::catalog::TripCatalog;
use headway_transit::oracle::DistanceOracle;
use rayon::prelude::*;
use tracing::info;

use crate::analysis::selector::{Candidate, select_best};
use crate::analysis::statistics::{self, ScheduleStatistics};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::pipeline::artifacts::{
    RepairReportRow, allocation_rows, derive_shifts, shift_rows, write_allocation_to_path,
    write_rows_to_path, write_statistics_to_path,
};
use crate::pipeline::checkpoint::{CheckpointSink, CheckpointWriter};
use crate::problem::SchedulingProblem;
use crate::repair::{RepairReport, repair};
use crate::solver::allocation::Allocation;
use crate::solver::params::GaParams;
use crate::solver::search::GaSearch;

#[derive(Clone)]
pub struct PipelineParams {
    /// Fleet sizes to try as independent configurations.
    pub fleet_sizes: Vec<usize>,
    /// Driver pool for the second assignment pass; `None` skips it.
    pub drivers: Option<usize>,
    pub ga: GaParams,
    pub output_dir: PathBuf,
}

/// One optimized-repaired-analyzed configuration.
pub struct StageResult {
    pub label: String,
    pub fleet_size: usize,
    pub allocation: Allocation,
    pub report: RepairReport,
    pub statistics: ScheduleStatistics,
    pub unassigned: usize,
}

pub struct PipelineOutcome {
    pub winner: StageResult,
    pub driver: Option<StageResult>,
}

/// Runs the whole batch: per-fleet-size optimize → repair → analyze, then
/// selection, then the driver pass over the winner's vehicle shifts.
///
/// Configurations share nothing mutable but the oracle's memo cache and the
/// checkpoint writer queue, so they run concurrently. Every stage leaves an
/// independently-loadable CSV artifact in `output_dir`; stage completion is
/// the function returning, never a file appearing.
pub fn run(
    catalog: &TripCatalog,
    oracle: &Arc<DistanceOracle>,
    base_config: &SchedulerConfig,
    params: &PipelineParams,
) -> Result<PipelineOutcome, SchedulerError> {
    std::fs::create_dir_all(&params.output_dir).map_err(|source| SchedulerError::Io {
        path: params.output_dir.clone(),
        source,
    })?;

    let writer = CheckpointWriter::spawn();

    let mut runs: Vec<StageResult> = params
        .fleet_sizes
        .par_iter()
        .map(|&fleet_size| {
            run_configuration(catalog, oracle, base_config, params, fleet_size, writer.sink())
        })
        .collect::<Result<_, _>>()?;

    let report_rows: Vec<RepairReportRow> = runs
        .iter()
        .map(|run| RepairReportRow::new(format!("allocation_{}.csv", run.label), &run.report))
        .collect();
    write_rows_to_path(&params.output_dir.join("repair_report.csv"), &report_rows)?;

    let candidates: Vec<Candidate> = runs
        .iter()
        .map(|run| Candidate {
            label: run.label.clone(),
            fleet_size: run.fleet_size,
            statistics: run.statistics.clone(),
            repair: run.report.clone(),
        })
        .collect();

    let best = select_best(&candidates).ok_or(SchedulerError::NoViableCandidate)?;
    write_selection(&params.output_dir.join("selection.json"), best)?;
    info!(
        winner = %best.label,
        used_resources = best.statistics.used_resources,
        remaining_overlaps = best.repair.remaining_overlaps,
        "configuration selected"
    );

    let winner_label = best.label.clone();
    let winner_position = runs
        .iter()
        .position(|run| run.label == winner_label)
        .expect("selected candidate came from the runs");
    let winner = runs.swap_remove(winner_position);

    let driver = match params.drivers {
        Some(drivers) => Some(run_driver_pass(
            catalog, oracle, base_config, params, &winner, drivers,
        )?),
        None => None,
    };

    writer.finish();

    Ok(PipelineOutcome { winner, driver })
}

fn run_configuration(
    catalog: &TripCatalog,
    oracle: &Arc<DistanceOracle>,
    base_config: &SchedulerConfig,
    params: &PipelineParams,
    fleet_size: usize,
    sink: CheckpointSink,
) -> Result<StageResult, SchedulerError> {
    let label = format!("bus{fleet_size}");
    info!(%label, "starting configuration");

    let config = base_config.clone().with_fleet_size(fleet_size);
    let problem = Arc::new(SchedulingProblem::new(
        catalog.clone(),
        Arc::clone(oracle),
        config,
    )?);

    // Decorrelate the concurrent searches while keeping runs reproducible.
    let ga = GaParams {
        seed: params.ga.seed.map(|seed| seed ^ fleet_size as u64),
        ..params.ga.clone()
    };

    let mut search = GaSearch::new(Arc::clone(&problem), ga);

    let checkpoint_problem = Arc::clone(&problem);
    let checkpoint_dir = params.output_dir.clone();
    let checkpoint_label = label.clone();
    search.on_best(move |best| {
        sink.submit(
            checkpoint_dir.join(format!(
                "checkpoint_{checkpoint_label}_gen{}.csv",
                best.generation
            )),
            allocation_rows(checkpoint_problem.catalog(), best.allocation),
        );
    });

    let outcome = search.run();
    let (repaired, report) = repair(&problem, &outcome.best);
    let statistics = statistics::compute(&problem, &repaired);

    write_allocation_to_path(
        &params.output_dir.join(format!("allocation_{label}.csv")),
        problem.catalog(),
        &repaired,
    )?;
    write_statistics_to_path(
        &params.output_dir.join(format!("statistics_{label}.csv")),
        &statistics,
    )?;

    Ok(StageResult {
        label,
        fleet_size,
        allocation: repaired,
        report,
        statistics,
        unassigned: outcome.unassigned.len(),
    })
}

/// Assigns the winner's vehicle duty spans to a driver pool with the same
/// optimize → repair → analyze machinery.
fn run_driver_pass(
    catalog: &TripCatalog,
    oracle: &Arc<DistanceOracle>,
    base_config: &SchedulerConfig,
    params: &PipelineParams,
    winner: &StageResult,
    drivers: usize,
) -> Result<StageResult, SchedulerError> {
    let shifts = derive_shifts(catalog, &winner.allocation)?;
    write_rows_to_path(&params.output_dir.join("shifts.csv"), &shift_rows(&shifts))?;
    info!(shifts = shifts.len(), drivers, "starting driver pass");

    let shift_catalog =
        TripCatalog::new(shifts.into_iter().map(|(_, shift)| shift).collect());

    let config = base_config.clone().with_fleet_size(drivers);
    let problem = Arc::new(SchedulingProblem::new(
        shift_catalog,
        Arc::clone(oracle),
        config,
    )?);

    let ga = GaParams {
        seed: params.ga.seed.map(|seed| seed.wrapping_add(1)),
        ..params.ga.clone()
    };

    let mut search = GaSearch::new(Arc::clone(&problem), ga);
    let outcome = search.run();
    let (repaired, report) = repair(&problem, &outcome.best);
    let statistics = statistics::compute(&problem, &repaired);

    write_allocation_to_path(
        &params.output_dir.join("driver_allocation.csv"),
        problem.catalog(),
        &repaired,
    )?;
    write_statistics_to_path(
        &params.output_dir.join("driver_statistics.csv"),
        &statistics,
    )?;
    write_rows_to_path(
        &params.output_dir.join("driver_repair_report.csv"),
        &[RepairReportRow::new("driver_allocation.csv", &report)],
    )?;

    Ok(StageResult {
        label: format!("driver{drivers}"),
        fleet_size: drivers,
        allocation: repaired,
        report,
        statistics,
        unassigned: outcome.unassigned.len(),
    })
}

fn write_selection(path: &Path, candidate: &Candidate) -> Result<(), SchedulerError> {
    let file = File::create(path).map_err(|source| SchedulerError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), candidate)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;
    use crate::solver::params::Termination;
    use crate::test_utils;

    fn pipeline_params(output_dir: PathBuf) -> PipelineParams {
        PipelineParams {
            fleet_sizes: vec![2, 4],
            drivers: Some(3),
            ga: GaParams {
                population_size: 10,
                terminations: vec![Termination::Generations(8)],
                seed: Some(42),
                ..GaParams::default()
            },
            output_dir,
        }
    }

    #[test]
    fn test_full_pipeline_produces_artifacts_and_a_clean_winner() {
        let trips = (0..8)
            .map(|i| {
                test_utils::trip(
                    &format!("t{i}"),
                    &format!("{:02}:00:00", 6 + i),
                    &format!("{:02}:40:00", 6 + i),
                )
            })
            .collect();
        let catalog = test_utils::catalog(trips);
        let oracle = Arc::new(headway_transit::oracle::DistanceOracle::new(
            test_utils::stops(),
            50.0,
        ));
        let config = SchedulerConfig::new(1, SignedDuration::ZERO);

        let output_dir = std::env::temp_dir().join("headway_pipeline_test");
        let _ = std::fs::remove_dir_all(&output_dir);
        let params = pipeline_params(output_dir.clone());

        let outcome = run(&catalog, &oracle, &config, &params).unwrap();

        assert_eq!(outcome.winner.report.remaining_overlaps, 0);
        assert_eq!(outcome.winner.statistics.total_trips, 8);

        let driver = outcome.driver.expect("driver pass requested");
        assert_eq!(driver.report.remaining_overlaps, 0);

        for artifact in [
            "repair_report.csv",
            "selection.json",
            "shifts.csv",
            "driver_allocation.csv",
            "driver_statistics.csv",
            "driver_repair_report.csv",
        ] {
            assert!(
                output_dir.join(artifact).is_file(),
                "missing artifact {artifact}"
            );
        }
        for fleet in [2, 4] {
            assert!(output_dir.join(format!("allocation_bus{fleet}.csv")).is_file());
            assert!(output_dir.join(format!("statistics_bus{fleet}.csv")).is_file());
        }
    }
}
