//! Trial execution against the external `spinlock_test` binary
//!
//! The external benchmark is a black box reached through the narrow
//! [`LockBench`] seam: hand it `(threads, workload, iterations)` and get the
//! raw stdout text back. Everything downstream of the seam (label parsing,
//! per-million normalization, outlier reduction) is pure and unit-testable
//! against canned fixtures without spawning a process.

#![allow(clippy::cast_precision_loss)]

use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::error::{CerrojoError, Result};
use crate::stats::reduce;

/// Section header printed by the benchmark for the hybrid spin lock
pub const SPIN_LABEL: &str = "Custom Hybrid Spinlock";

/// Section header printed by the benchmark for the baseline mutex
pub const MUTEX_LABEL: &str = "POSIX Mutex";

/// Common basis all samples are normalized to: time per 1M lock/unlock cycles
pub const NORMALIZATION_BASIS: u64 = 1_000_000;

/// Iteration count for light critical sections (`workload < 1000`)
pub const LIGHT_TIER_ITERATIONS: u64 = 1_000_000;

/// Iteration count for heavy critical sections, keeping wall clock bounded
pub const HEAVY_TIER_ITERATIONS: u64 = 400_000;

/// Workload intensity at which the iteration tier drops
pub const WORKLOAD_TIER_THRESHOLD: u64 = 1000;

/// Repeated invocations per sweep cell
pub const DEFAULT_REPEATS: usize = 5;

/// Iteration count for a given workload tier
#[must_use]
pub fn iterations_for(workload: u64) -> u64 {
    if workload < WORKLOAD_TIER_THRESHOLD {
        LIGHT_TIER_ITERATIONS
    } else {
        HEAVY_TIER_ITERATIONS
    }
}

// ============================================================================
// Invocation seam
// ============================================================================

/// Abstract handle on the external lock benchmark
///
/// Implementations return the invocation's stdout text; the caller parses it.
/// An `Err` means the invocation itself failed (missing binary, nonzero
/// exit) and the trial is dropped without retry.
pub trait LockBench {
    /// Run the benchmark once and capture its stdout
    ///
    /// # Errors
    ///
    /// Returns `CerrojoError::Io` if the process cannot be spawned or exits
    /// nonzero.
    fn invoke(&self, threads: usize, workload: u64, iterations: u64) -> Result<String>;
}

/// The real pre-built `spinlock_test` executable
#[derive(Debug, Clone)]
pub struct SpinlockTestBin {
    path: PathBuf,
    spin_min: Option<u32>,
    spin_max: Option<u32>,
}

impl SpinlockTestBin {
    /// Point at the benchmark executable
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            spin_min: None,
            spin_max: None,
        }
    }

    /// Forward `-m <min>` spin backoff tuning to the executable
    #[must_use]
    pub fn with_spin_min(mut self, min: u32) -> Self {
        self.spin_min = Some(min);
        self
    }

    /// Forward `-M <max>` spin backoff tuning to the executable
    #[must_use]
    pub fn with_spin_max(mut self, max: u32) -> Self {
        self.spin_max = Some(max);
        self
    }

    /// Argument vector for one invocation
    #[must_use]
    pub fn build_args(&self, threads: usize, workload: u64, iterations: u64) -> Vec<String> {
        let mut args = vec![
            "-t".to_string(),
            threads.to_string(),
            "-l".to_string(),
            workload.to_string(),
            "-i".to_string(),
            iterations.to_string(),
        ];
        if let Some(min) = self.spin_min {
            args.push("-m".to_string());
            args.push(min.to_string());
        }
        if let Some(max) = self.spin_max {
            args.push("-M".to_string());
            args.push(max.to_string());
        }
        args
    }
}

impl LockBench for SpinlockTestBin {
    fn invoke(&self, threads: usize, workload: u64, iterations: u64) -> Result<String> {
        let path = self.path.display().to_string();
        let output = Command::new(&self.path)
            .args(self.build_args(threads, workload, iterations))
            .stderr(Stdio::null())
            .output()
            .map_err(|e| CerrojoError::io(path.clone(), e))?;

        if !output.status.success() {
            return Err(CerrojoError::io(
                path,
                std::io::Error::other(format!("exited with {}", output.status)),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ============================================================================
// Output parsing
// ============================================================================

/// Both raw timings extracted from one successful invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSample {
    /// Hybrid spin lock elapsed time (ms, raw)
    pub spin_ms: f64,
    /// Baseline mutex elapsed time (ms, raw)
    pub mutex_ms: f64,
    /// Whether the executable's own atomic-count self-checks both passed
    pub counts_ok: bool,
}

/// Scan the lines of one benchmark section for a labelled value
///
/// The executable prints a bracketed section header (`[ <label>    ]`)
/// followed by indented detail lines. The scan starts after the header line
/// and stops at the next header, so a section missing its detail line never
/// borrows one from the section below.
fn section_line<'a>(output: &'a str, section: &str, detail: &str) -> Option<&'a str> {
    let mut in_section = false;
    for line in output.lines() {
        if line.trim_start().starts_with('[') {
            in_section = line.contains(section);
            continue;
        }
        if in_section && line.contains(detail) {
            return Some(line);
        }
    }
    None
}

/// Extract the elapsed milliseconds for one lock section
///
/// Matches `  - Elapsed Time :   <float> ms` beneath the section header.
/// A missing label or an unparseable token is `None`, not an error.
#[must_use]
pub fn parse_elapsed_ms(output: &str, section: &str) -> Option<f64> {
    let line = section_line(output, section, "Elapsed Time")?;
    let value = line.split(':').nth(1)?.trim();
    let value = value.strip_suffix("ms").map_or(value, str::trim_end).trim();
    value.parse::<f64>().ok()
}

/// Extract the atomic-count verdict for one lock section, if printed
///
/// Matches `  - Atomic Count : <got> / <want> (OK|FAIL)`.
#[must_use]
pub fn parse_count_check(output: &str, section: &str) -> Option<bool> {
    let line = section_line(output, section, "Atomic Count")?;
    if line.contains("(OK)") {
        Some(true)
    } else if line.contains("(FAIL)") {
        Some(false)
    } else {
        None
    }
}

/// Parse one invocation's stdout into a trial sample
///
/// A trial is usable only if *both* elapsed times are present; anything less
/// yields `None` and the repeat is silently dropped. Count-check verdicts are
/// informational: an absent count line counts as passing.
#[must_use]
pub fn parse_trial(output: &str) -> Option<TrialSample> {
    let spin_ms = parse_elapsed_ms(output, SPIN_LABEL)?;
    let mutex_ms = parse_elapsed_ms(output, MUTEX_LABEL)?;
    let counts_ok = parse_count_check(output, SPIN_LABEL).unwrap_or(true)
        && parse_count_check(output, MUTEX_LABEL).unwrap_or(true);
    Some(TrialSample {
        spin_ms,
        mutex_ms,
        counts_ok,
    })
}

// ============================================================================
// Per-cell repeat loop
// ============================================================================

/// Robust central estimates for one sweep cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReducedCell {
    /// Reduced spin-lock time, ms per [`NORMALIZATION_BASIS`] cycles
    pub spin_ms: f64,
    /// Reduced mutex time, ms per [`NORMALIZATION_BASIS`] cycles
    pub mutex_ms: f64,
    /// Iteration tier the cell was measured with
    pub iterations: u64,
}

/// A reduced cell plus bookkeeping about how it was obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMeasurement {
    /// The reduced estimates
    pub cell: ReducedCell,
    /// Successful repeats that contributed samples (0..=repeats)
    pub samples_kept: usize,
    /// Repeats whose atomic-count self-check reported FAIL
    pub count_check_failures: u64,
}

/// Drives the repeat loop for one sweep cell against a [`LockBench`]
pub struct TrialRunner<'a> {
    bench: &'a dyn LockBench,
    repeats: usize,
}

impl<'a> TrialRunner<'a> {
    /// Create a runner issuing `repeats` invocations per cell
    #[must_use]
    pub fn new(bench: &'a dyn LockBench, repeats: usize) -> Self {
        Self { bench, repeats }
    }

    /// Measure one `(threads, workload)` cell
    ///
    /// Invokes the benchmark `repeats` times at the workload's iteration
    /// tier, drops unusable repeats, normalizes survivors to the
    /// per-million-cycle basis, and reduces each metric independently. An
    /// all-failed cell reduces to zeros; the caller records it and moves on.
    #[must_use]
    pub fn run_cell(&self, threads: usize, workload: u64) -> CellMeasurement {
        let iterations = iterations_for(workload);
        let scale = NORMALIZATION_BASIS as f64 / iterations as f64;

        let mut spin_samples = Vec::with_capacity(self.repeats);
        let mut mutex_samples = Vec::with_capacity(self.repeats);
        let mut count_check_failures = 0u64;

        for _ in 0..self.repeats {
            let Ok(text) = self.bench.invoke(threads, workload, iterations) else {
                continue;
            };
            let Some(sample) = parse_trial(&text) else {
                continue;
            };
            if !sample.counts_ok {
                count_check_failures += 1;
            }
            spin_samples.push(sample.spin_ms * scale);
            mutex_samples.push(sample.mutex_ms * scale);
        }

        CellMeasurement {
            cell: ReducedCell {
                spin_ms: reduce(&spin_samples),
                mutex_ms: reduce(&mutex_samples),
                iterations,
            },
            samples_kept: spin_samples.len(),
            count_check_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(spin_ms: f64, mutex_ms: f64) -> String {
        format!(
            "\n--- SPINLOCK BENCHMARK SUITE START ---\n\
             System Info:\n\
             \x20 L1 Cache Line  : 64 bytes\n\
             Configuration:\n\
             \x20 Threads        : 4\n\
             \x20 Iterations     : 1000000\n\
             \x20 Workload (nop) : 0\n\
             \x20 Backoff Range  : 4 ~ 1024\n\
             --------------------------------------\n\n\
             [ Custom Hybrid Spinlock ]\n\
             \x20 - Elapsed Time : {spin_ms:10.3} ms\n\
             \x20 - Atomic Count :    4000000 / 4000000 (OK)\n\n\
             [ POSIX Mutex            ]\n\
             \x20 - Elapsed Time : {mutex_ms:10.3} ms\n\
             \x20 - Atomic Count :    4000000 / 4000000 (OK)\n\n\
             --------------------------------------\n\
             FINAL RESULT:\n\
             \x20 Speedup Factor : 2.00x (Spinlock/Mutex)\n\
             \x20 Winner         : Custom Spinlock\n\
             --- BENCHMARK SUITE END ---\n\n"
        )
    }

    struct CannedBench {
        text: String,
    }

    impl LockBench for CannedBench {
        fn invoke(&self, _threads: usize, _workload: u64, _iterations: u64) -> Result<String> {
            Ok(self.text.clone())
        }
    }

    /// Fails every invocation whose (0-based) index is in `failing`
    struct FlakyBench {
        text: String,
        failing: Vec<usize>,
        calls: std::cell::Cell<usize>,
    }

    impl LockBench for FlakyBench {
        fn invoke(&self, _threads: usize, _workload: u64, _iterations: u64) -> Result<String> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if self.failing.contains(&n) {
                Ok("garbage with no timing lines".to_string())
            } else {
                Ok(self.text.clone())
            }
        }
    }

    #[test]
    fn test_iterations_for_tiers() {
        assert_eq!(iterations_for(0), LIGHT_TIER_ITERATIONS);
        assert_eq!(iterations_for(999), LIGHT_TIER_ITERATIONS);
        assert_eq!(iterations_for(1000), HEAVY_TIER_ITERATIONS);
        assert_eq!(iterations_for(5000), HEAVY_TIER_ITERATIONS);
    }

    #[test]
    fn test_parse_elapsed_both_sections() {
        let out = fixture(123.456, 246.912);
        assert!((parse_elapsed_ms(&out, SPIN_LABEL).unwrap() - 123.456).abs() < 1e-9);
        assert!((parse_elapsed_ms(&out, MUTEX_LABEL).unwrap() - 246.912).abs() < 1e-9);
    }

    #[test]
    fn test_parse_elapsed_missing_section() {
        let out = fixture(1.0, 2.0).replace(MUTEX_LABEL, "Something Else");
        assert!(parse_elapsed_ms(&out, SPIN_LABEL).is_some());
        assert_eq!(parse_elapsed_ms(&out, MUTEX_LABEL), None);
    }

    #[test]
    fn test_parse_elapsed_does_not_cross_sections() {
        // Spin section lost its timing line; the mutex section's value must
        // not be attributed to it.
        let out = "[ Custom Hybrid Spinlock ]\n\
                   \x20 - Atomic Count : 1 / 1 (OK)\n\
                   [ POSIX Mutex ]\n\
                   \x20 - Elapsed Time :      9.000 ms\n";
        assert_eq!(parse_elapsed_ms(out, SPIN_LABEL), None);
        assert!((parse_elapsed_ms(out, MUTEX_LABEL).unwrap() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_count_check_verdicts() {
        let ok = fixture(1.0, 2.0);
        assert_eq!(parse_count_check(&ok, SPIN_LABEL), Some(true));

        let failed = ok.replacen("(OK)", "(FAIL)", 1);
        assert_eq!(parse_count_check(&failed, SPIN_LABEL), Some(false));
        assert_eq!(parse_count_check(&failed, MUTEX_LABEL), Some(true));
    }

    #[test]
    fn test_parse_trial_requires_both_timings() {
        assert!(parse_trial(&fixture(5.0, 10.0)).is_some());
        assert!(parse_trial("no timings at all").is_none());

        let only_spin = fixture(5.0, 10.0).replace(MUTEX_LABEL, "Renamed");
        assert!(parse_trial(&only_spin).is_none());
    }

    #[test]
    fn test_parse_trial_records_count_failure() {
        let failed = fixture(5.0, 10.0).replacen("(OK)", "(FAIL)", 1);
        let sample = parse_trial(&failed).unwrap();
        assert!(!sample.counts_ok);
    }

    #[test]
    fn test_build_args_basic() {
        let bin = SpinlockTestBin::new("./bin/spinlock_test");
        assert_eq!(
            bin.build_args(8, 500, 1_000_000),
            vec!["-t", "8", "-l", "500", "-i", "1000000"]
        );
    }

    #[test]
    fn test_build_args_with_backoff() {
        let bin = SpinlockTestBin::new("./bin/spinlock_test")
            .with_spin_min(16)
            .with_spin_max(2048);
        let args = bin.build_args(1, 0, 1_000_000);
        assert!(args.windows(2).any(|w| w[0] == "-m" && w[1] == "16"));
        assert!(args.windows(2).any(|w| w[0] == "-M" && w[1] == "2048"));
    }

    #[test]
    fn test_invoke_missing_binary_is_error() {
        let bin = SpinlockTestBin::new("/nonexistent/spinlock_test");
        assert!(bin.invoke(1, 0, 1000).is_err());
    }

    #[test]
    fn test_run_cell_normalizes_heavy_tier() {
        // Heavy tier runs 400k iterations; a raw 10ms sample normalizes to
        // 25ms per million cycles.
        let bench = CannedBench {
            text: fixture(10.0, 20.0),
        };
        let runner = TrialRunner::new(&bench, DEFAULT_REPEATS);
        let m = runner.run_cell(4, 2000);

        assert_eq!(m.cell.iterations, HEAVY_TIER_ITERATIONS);
        assert!((m.cell.spin_ms - 25.0).abs() < 1e-9);
        assert!((m.cell.mutex_ms - 50.0).abs() < 1e-9);
        assert_eq!(m.samples_kept, DEFAULT_REPEATS);
    }

    #[test]
    fn test_run_cell_light_tier_identity() {
        let bench = CannedBench {
            text: fixture(10.0, 20.0),
        };
        let runner = TrialRunner::new(&bench, DEFAULT_REPEATS);
        let m = runner.run_cell(4, 0);

        assert_eq!(m.cell.iterations, LIGHT_TIER_ITERATIONS);
        assert!((m.cell.spin_ms - 10.0).abs() < 1e-9);
        assert!((m.cell.mutex_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_cell_tolerates_dropped_repeats() {
        let bench = FlakyBench {
            text: fixture(10.0, 20.0),
            failing: vec![1, 3],
            calls: std::cell::Cell::new(0),
        };
        let runner = TrialRunner::new(&bench, 5);
        let m = runner.run_cell(2, 0);

        assert_eq!(m.samples_kept, 3);
        assert!(m.cell.spin_ms.is_finite());
        assert!((m.cell.spin_ms - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_cell_all_failed_reduces_to_zero() {
        let bench = CannedBench {
            text: "not benchmark output".to_string(),
        };
        let runner = TrialRunner::new(&bench, 5);
        let m = runner.run_cell(2, 0);

        assert_eq!(m.samples_kept, 0);
        assert_eq!(m.cell.spin_ms, 0.0);
        assert_eq!(m.cell.mutex_ms, 0.0);
    }
}
