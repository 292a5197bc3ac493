//! Cerrojo CLI - lock contention sweep benchmark harness
//!
//! Drives the external `spinlock_test` executable across a
//! (workload × threads) parameter grid and compares the custom hybrid
//! spinlock against the POSIX mutex baseline.
//!
//! # Commands
//!
//! - `run` - Execute the full contention sweep
//! - `probe` - Show the detected hardware profile
//! - `viz` - Re-render the chart from saved JSON results

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cerrojo::cli::{handle_probe, handle_run, handle_viz, RunConfig};
use cerrojo::error::Result;
use cerrojo::runner::DEFAULT_REPEATS;

/// Cerrojo - hybrid spinlock vs POSIX mutex sweep benchmark
///
/// Measures two mutual-exclusion primitives under varying contention and
/// critical-section length, producing a comparison report and a two-panel
/// chart.
#[derive(Parser)]
#[command(name = "cerrojo")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full contention sweep
    ///
    /// Examples:
    ///   cerrojo run
    ///   cerrojo run --bin ./bin/spinlock_test --workloads 0,1000,4000
    ///   cerrojo run --repeats 7 --output results.json
    Run {
        /// Path to the pre-built spinlock_test executable
        #[arg(long, default_value = "./bin/spinlock_test")]
        bin: PathBuf,

        /// Workload axis: busy-work nop counts inside the critical section
        #[arg(long, value_delimiter = ',', default_value = "0,500,2000,5000")]
        workloads: Vec<u64>,

        /// Repeated invocations per sweep cell
        #[arg(long, default_value_t = DEFAULT_REPEATS)]
        repeats: usize,

        /// Chart output path
        #[arg(long, default_value = "bench_result.png")]
        plot: PathBuf,

        /// Skip chart rendering entirely
        #[arg(long)]
        no_plot: bool,

        /// Save the full sweep outcome as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Forward a minimum spin backoff (-m) to the executable
        #[arg(long)]
        spin_min: Option<u32>,

        /// Forward a maximum spin backoff (-M) to the executable
        #[arg(long)]
        spin_max: Option<u32>,
    },
    /// Show the detected hardware profile and derived thread axis
    Probe,
    /// Re-render the chart from a saved JSON outcome
    ///
    /// Examples:
    ///   cerrojo viz results.json
    ///   cerrojo viz results.json --plot rerun.png
    Viz {
        /// JSON outcome produced by `cerrojo run --output`
        #[arg(value_name = "RESULTS")]
        input: PathBuf,

        /// Chart output path
        #[arg(long, default_value = "bench_result.png")]
        plot: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            bin,
            workloads,
            repeats,
            plot,
            no_plot,
            output,
            spin_min,
            spin_max,
        } => handle_run(RunConfig {
            bin,
            workloads,
            repeats,
            plot: if no_plot { None } else { Some(plot) },
            output,
            spin_min,
            spin_max,
        }),
        Commands::Probe => {
            handle_probe();
            Ok(())
        },
        Commands::Viz { input, plot } => handle_viz(&input, &plot),
    }
}
