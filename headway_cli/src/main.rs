use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

mod analyze;
mod catalog;
mod optimize;
mod parsers;
mod repair;
mod run;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the normalized trip catalog from raw timetable rows
    Catalog {
        #[command(flatten)]
        args: catalog::CatalogArgs,
    },
    /// Search for a trip-to-vehicle allocation with the genetic algorithm
    Optimize {
        #[command(flatten)]
        args: optimize::OptimizeArgs,
    },
    /// Eliminate temporal overlaps in an exported allocation
    Repair {
        #[command(flatten)]
        args: repair::RepairArgs,
    },
    /// Compute per-resource statistics and pick the best allocation
    Analyze {
        #[command(flatten)]
        args: analyze::AnalyzeArgs,
    },
    /// Run the whole pipeline, driver assignment included
    Run {
        #[command(flatten)]
        args: run::RunArgs,
    },
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Commands::Catalog { args } => catalog::run(args),
        Commands::Optimize { args } => optimize::run(args),
        Commands::Repair { args } => repair::run(args),
        Commands::Analyze { args } => analyze::run(args),
        Commands::Run { args } => run::run(args),
    }
}
