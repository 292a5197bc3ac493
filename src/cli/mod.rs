//! CLI command implementations
//!
//! The business logic behind the `cerrojo` subcommands, extracted from
//! main.rs for testability. Handlers wire the probe, axes, controller,
//! report, and chart together; they own all console output so the sweep
//! engine itself stays silent.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use crate::error::{CerrojoError, Result};
use crate::probe::SystemProfile;
use crate::report::render_report;
use crate::runner::SpinlockTestBin;
use crate::sweep::{SweepAxes, SweepController, SweepOutcome, SweepProgress};
use crate::viz::render_chart;

/// Everything the `run` subcommand needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Path to the pre-built `spinlock_test` executable
    pub bin: PathBuf,
    /// Workload axis in busy-work units
    pub workloads: Vec<u64>,
    /// Repeated invocations per sweep cell
    pub repeats: usize,
    /// Chart output path, `None` to skip plotting
    pub plot: Option<PathBuf>,
    /// Optional JSON dump of the full outcome
    pub output: Option<PathBuf>,
    /// Optional `-m` spin backoff pass-through
    pub spin_min: Option<u32>,
    /// Optional `-M` spin backoff pass-through
    pub spin_max: Option<u32>,
}

/// Run the full sweep: probe, measure, report, plot
pub fn handle_run(config: RunConfig) -> Result<()> {
    validate(&config)?;

    let profile = SystemProfile::detect();

    // The axes are an ordered set: normalize caller-supplied workloads the
    // same way the derived thread axis is normalized.
    let mut workloads = config.workloads.clone();
    workloads.sort_unstable();
    workloads.dedup();
    let axes = SweepAxes::from_cores(profile.cores).with_workloads(workloads);

    let mut bench = SpinlockTestBin::new(&config.bin);
    if let Some(min) = config.spin_min {
        bench = bench.with_spin_min(min);
    }
    if let Some(max) = config.spin_max {
        bench = bench.with_spin_max(max);
    }

    println!("Executing Benchmarks on {}...", profile.cpu_model);

    let controller = SweepController::new(&bench, axes).with_repeats(config.repeats);
    let outcome = controller.run(profile, print_progress);

    clear_progress_line();
    print!("{}", render_report(&outcome));

    if let Some(ref path) = config.output {
        std::fs::write(path, outcome.to_json()?)
            .map_err(|e| CerrojoError::io(path.display().to_string(), e))?;
        println!("[Done] Sweep results saved as '{}'", path.display());
    }

    if let Some(ref path) = config.plot {
        render_chart(&outcome, path)?;
        println!(
            "[Done] Research-grade report and plots saved as '{}'",
            path.display()
        );
    }

    Ok(())
}

/// Print the detected hardware profile
pub fn handle_probe() {
    let profile = SystemProfile::detect();
    println!("Detected system profile:");
    println!("  CPU Model     : {}", profile.cpu_model);
    println!("  CPU Cores     : {} Online", profile.cores);
    println!("  L1 Cache Line : {} bytes", profile.l1_line_bytes);
    println!(
        "  Thread Axis   : {:?}",
        SweepAxes::from_cores(profile.cores).threads
    );
}

/// Re-render the chart from a saved JSON outcome
pub fn handle_viz(input: &Path, plot: &Path) -> Result<()> {
    let json = std::fs::read_to_string(input)
        .map_err(|e| CerrojoError::io(input.display().to_string(), e))?;
    let outcome = SweepOutcome::from_json(&json)?;

    render_chart(&outcome, plot)?;
    println!("[Done] Chart re-rendered as '{}'", plot.display());
    Ok(())
}

/// Reject configurations that would produce a meaningless sweep
fn validate(config: &RunConfig) -> Result<()> {
    if config.repeats == 0 {
        return Err(CerrojoError::invalid_config(
            "repeats",
            "must be at least 1",
        ));
    }
    if config.workloads.is_empty() {
        return Err(CerrojoError::invalid_config(
            "workloads",
            "at least one workload intensity is required",
        ));
    }
    if let (Some(min), Some(max)) = (config.spin_min, config.spin_max) {
        if min > max {
            return Err(CerrojoError::invalid_config(
                "spin-min",
                "must not exceed spin-max",
            ));
        }
    }
    Ok(())
}

/// `\r`-rewritten progress bar reflecting the current sweep position
fn print_progress(progress: &SweepProgress) {
    let pct = progress.completed as f64 / progress.total as f64 * 100.0;
    let filled = (pct / 2.0) as usize;
    let bar = "=".repeat(filled.min(50));
    print!(
        "\rProgress: [{bar:<50}] {pct:.1}% ({} NOPs, {} Threads)",
        progress.workload, progress.threads
    );
    let _ = std::io::stdout().flush();
}

/// Blank out the progress line before the report prints
fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(130));
    let _ = std::io::stdout().flush();
}
