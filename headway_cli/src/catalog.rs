use std::path::PathBuf;

use clap::Args;
use headway_transit::catalog::TripCatalog;
use headway_transit::tables;
use tracing::info;

#[derive(Args)]
pub struct CatalogArgs {
    /// Raw timetable rows (stop_times-style CSV)
    #[arg(short = 'i', long)]
    stop_times: PathBuf,

    /// Output path for the resolved trips table
    #[arg(short = 'o', long)]
    out: PathBuf,

    /// Treat cumulative distances as meters instead of kilometres
    #[arg(long)]
    meters: bool,
}

pub fn run(args: CatalogArgs) -> anyhow::Result<()> {
    let rows = tables::read_timetable(&args.stop_times)?;
    info!(rows = rows.len(), "timetable loaded");

    let catalog = TripCatalog::from_timetable(rows, args.meters)?;
    tables::write_trips_to_path(&args.out, &catalog)?;

    info!(trips = catalog.len(), out = %args.out.display(), "trip catalog written");
    Ok(())
}
