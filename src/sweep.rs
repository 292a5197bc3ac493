//! Parameter axes, result matrices, and the orchestrating sweep loop
//!
//! The controller walks the full (workload × threads) cross product in a
//! fixed order (workload outer, threads inner, both ascending); the order is
//! visible in the progress line and the report layout. Every cell is
//! measured through the [`TrialRunner`](crate::runner::TrialRunner), written
//! into three dense matrices exactly once, and flattened into a report row.
//! A failed cell records zeros; nothing stops the sweep.

#![allow(clippy::cast_precision_loss)]

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::probe::SystemProfile;
use crate::runner::{LockBench, TrialRunner, DEFAULT_REPEATS};

/// Default workload axis, in abstract busy-work units (nop loops)
pub const DEFAULT_WORKLOADS: &[u64] = &[0, 500, 2000, 5000];

// ============================================================================
// Axes
// ============================================================================

/// The two fixed axes of one sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepAxes {
    /// Busy-work intensities, outer loop, ascending
    pub workloads: Vec<u64>,
    /// Thread counts, inner loop, ascending
    pub threads: Vec<usize>,
}

impl SweepAxes {
    /// Derive the thread axis from a processor count, with default workloads
    ///
    /// Starts at `2 × cores` and floor-halves down to 1, then deduplicates
    /// and sorts ascending: 4 cores yield `[1, 2, 4, 8]`, 5 cores yield
    /// `[1, 2, 5, 10]`.
    #[must_use]
    pub fn from_cores(cores: usize) -> Self {
        Self {
            workloads: DEFAULT_WORKLOADS.to_vec(),
            threads: thread_axis(cores),
        }
    }

    /// Replace the workload axis
    #[must_use]
    pub fn with_workloads(mut self, workloads: Vec<u64>) -> Self {
        self.workloads = workloads;
        self
    }

    /// Number of sweep cells (cross product size)
    #[must_use]
    pub fn cells(&self) -> usize {
        self.workloads.len() * self.threads.len()
    }

    /// Largest thread count on the axis (0 if the axis is empty)
    #[must_use]
    pub fn max_threads(&self) -> usize {
        self.threads.last().copied().unwrap_or(0)
    }
}

/// Powers-of-two descent from `2 × cores` to 1, deduplicated, ascending
fn thread_axis(cores: usize) -> Vec<usize> {
    let mut axis = Vec::new();
    let mut curr = cores.max(1) * 2;
    while curr >= 1 {
        axis.push(curr);
        curr /= 2;
    }
    axis.sort_unstable();
    axis.dedup();
    axis
}

// ============================================================================
// Result matrices
// ============================================================================

/// Dense 2D grid indexed by (workload position, thread position)
///
/// Backed by a row-major `Vec`; cells start at 0.0 and are each written
/// exactly once as the sweep progresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMatrix {
    workloads: usize,
    threads: usize,
    cells: Vec<f64>,
}

impl ResultMatrix {
    /// Zero-filled matrix for the given axis sizes
    #[must_use]
    pub fn new(workloads: usize, threads: usize) -> Self {
        Self {
            workloads,
            threads,
            cells: vec![0.0; workloads * threads],
        }
    }

    /// Write one cell
    pub fn set(&mut self, workload_idx: usize, thread_idx: usize, value: f64) {
        self.cells[workload_idx * self.threads + thread_idx] = value;
    }

    /// Read one cell
    #[must_use]
    pub fn get(&self, workload_idx: usize, thread_idx: usize) -> f64 {
        self.cells[workload_idx * self.threads + thread_idx]
    }

    /// All thread-axis values for one workload, in axis order
    #[must_use]
    pub fn workload_row(&self, workload_idx: usize) -> &[f64] {
        let start = workload_idx * self.threads;
        &self.cells[start..start + self.threads]
    }

    /// Largest finite value in the matrix (0.0 if empty)
    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.cells
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }
}

/// Denormalized record of one sweep cell, used only for text rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Busy-work intensity
    pub workload: u64,
    /// Thread count
    pub threads: usize,
    /// Iteration tier used
    pub iterations: u64,
    /// Reduced spin time, ms per million cycles
    pub spin_ms: f64,
    /// Reduced mutex time, ms per million cycles
    pub mutex_ms: f64,
    /// Speedup ratio mutex/spin (0.0 when spin degenerates to 0)
    pub ratio: f64,
}

/// Position report handed to the progress observer after every cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepProgress {
    /// Cells finished so far (1-based once the first cell completes)
    pub completed: usize,
    /// Total cells in the sweep
    pub total: usize,
    /// Workload of the cell just finished
    pub workload: u64,
    /// Thread count of the cell just finished
    pub threads: usize,
}

/// Everything one sweep run produced
///
/// Owned by a single run with a clear start/end lifecycle; there is no
/// ambient accumulation state anywhere in the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// Hardware the sweep ran on
    pub profile: SystemProfile,
    /// Axes the matrices are indexed by
    pub axes: SweepAxes,
    /// Repeats per cell
    pub repeats: usize,
    /// Spin-lock latency grid, ms per million cycles
    pub spin: ResultMatrix,
    /// Mutex latency grid, ms per million cycles
    pub mutex: ResultMatrix,
    /// Speedup ratio grid (mutex / spin)
    pub ratio: ResultMatrix,
    /// One row per cell, in sweep order
    pub rows: Vec<ReportRow>,
    /// Raw lock/unlock operations issued, decorative throughput statistic
    pub total_raw_ops: u64,
    /// Trials whose atomic-count self-check reported FAIL, decorative
    pub count_check_failures: u64,
    /// Wall-clock duration of the whole sweep in seconds
    pub elapsed_secs: f64,
}

impl SweepOutcome {
    /// Serialize to pretty JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or does not match the schema.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Drives the full cross-product sweep over a [`LockBench`]
pub struct SweepController<'a> {
    bench: &'a dyn LockBench,
    axes: SweepAxes,
    repeats: usize,
}

impl<'a> SweepController<'a> {
    /// Create a controller over the given benchmark and axes
    #[must_use]
    pub fn new(bench: &'a dyn LockBench, axes: SweepAxes) -> Self {
        Self {
            bench,
            axes,
            repeats: DEFAULT_REPEATS,
        }
    }

    /// Override the repeat count per cell
    #[must_use]
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    /// Run the whole sweep, invoking `on_progress` after every cell
    ///
    /// Cells are measured strictly sequentially, workload outer and threads
    /// inner. Cells whose every repeat failed are recorded as zeros (ratio
    /// 0.0) and the sweep continues.
    pub fn run(
        &self,
        profile: SystemProfile,
        mut on_progress: impl FnMut(&SweepProgress),
    ) -> SweepOutcome {
        let started = Instant::now();
        let (w, t) = (self.axes.workloads.len(), self.axes.threads.len());

        let mut spin = ResultMatrix::new(w, t);
        let mut mutex = ResultMatrix::new(w, t);
        let mut ratio = ResultMatrix::new(w, t);
        let mut rows = Vec::with_capacity(w * t);
        let mut total_raw_ops = 0u64;
        let mut count_check_failures = 0u64;

        let runner = TrialRunner::new(self.bench, self.repeats);
        let total = w * t;
        let mut completed = 0usize;

        for (wi, &workload) in self.axes.workloads.iter().enumerate() {
            for (ti, &threads) in self.axes.threads.iter().enumerate() {
                let measured = runner.run_cell(threads, workload);
                let cell = measured.cell;

                let cell_ratio = if cell.spin_ms > 0.0 {
                    cell.mutex_ms / cell.spin_ms
                } else {
                    0.0
                };

                spin.set(wi, ti, cell.spin_ms);
                mutex.set(wi, ti, cell.mutex_ms);
                ratio.set(wi, ti, cell_ratio);

                total_raw_ops += cell.iterations * self.repeats as u64 * threads as u64;
                count_check_failures += measured.count_check_failures;

                rows.push(ReportRow {
                    workload,
                    threads,
                    iterations: cell.iterations,
                    spin_ms: cell.spin_ms,
                    mutex_ms: cell.mutex_ms,
                    ratio: cell_ratio,
                });

                completed += 1;
                on_progress(&SweepProgress {
                    completed,
                    total,
                    workload,
                    threads,
                });
            }
        }

        SweepOutcome {
            profile,
            axes: self.axes.clone(),
            repeats: self.repeats,
            spin,
            mutex,
            ratio,
            rows,
            total_raw_ops,
            count_check_failures,
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{HEAVY_TIER_ITERATIONS, LIGHT_TIER_ITERATIONS};

    struct ConstantBench {
        spin_ms: f64,
        mutex_ms: f64,
    }

    impl LockBench for ConstantBench {
        fn invoke(
            &self,
            _threads: usize,
            _workload: u64,
            _iterations: u64,
        ) -> crate::error::Result<String> {
            Ok(format!(
                "[ Custom Hybrid Spinlock ]\n\
                 \x20 - Elapsed Time : {:10.3} ms\n\
                 [ POSIX Mutex            ]\n\
                 \x20 - Elapsed Time : {:10.3} ms\n",
                self.spin_ms, self.mutex_ms
            ))
        }
    }

    struct BrokenBench;

    impl LockBench for BrokenBench {
        fn invoke(
            &self,
            _threads: usize,
            _workload: u64,
            _iterations: u64,
        ) -> crate::error::Result<String> {
            Ok("no timing output".to_string())
        }
    }

    #[test]
    fn test_thread_axis_power_of_two_cores() {
        assert_eq!(thread_axis(4), vec![1, 2, 4, 8]);
    }

    #[test]
    fn test_thread_axis_six_cores() {
        assert_eq!(thread_axis(6), vec![1, 3, 6, 12]);
    }

    #[test]
    fn test_thread_axis_five_cores() {
        assert_eq!(thread_axis(5), vec![1, 2, 5, 10]);
    }

    #[test]
    fn test_thread_axis_single_core() {
        assert_eq!(thread_axis(1), vec![1, 2]);
    }

    #[test]
    fn test_axes_from_cores_defaults() {
        let axes = SweepAxes::from_cores(4);
        assert_eq!(axes.workloads, DEFAULT_WORKLOADS);
        assert_eq!(axes.threads, vec![1, 2, 4, 8]);
        assert_eq!(axes.cells(), 16);
        assert_eq!(axes.max_threads(), 8);
    }

    #[test]
    fn test_matrix_set_get_row() {
        let mut m = ResultMatrix::new(2, 3);
        m.set(0, 0, 1.0);
        m.set(1, 2, 9.0);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 2), 9.0);
        assert_eq!(m.get(1, 0), 0.0);
        assert_eq!(m.workload_row(1), &[0.0, 0.0, 9.0]);
        assert_eq!(m.max_value(), 9.0);
    }

    #[test]
    fn test_sweep_writes_every_cell_once_in_order() {
        let bench = ConstantBench {
            spin_ms: 5.0,
            mutex_ms: 10.0,
        };
        let axes = SweepAxes::from_cores(4).with_workloads(vec![0, 2000]);
        let mut seen = Vec::new();
        let outcome = SweepController::new(&bench, axes.clone())
            .run(SystemProfile::default(), |p| {
                seen.push((p.workload, p.threads));
            });

        assert_eq!(outcome.rows.len(), axes.cells());
        // Workload outer, threads inner, both in axis order.
        let expected: Vec<(u64, usize)> = axes
            .workloads
            .iter()
            .flat_map(|&w| axes.threads.iter().map(move |&t| (w, t)))
            .collect();
        assert_eq!(seen, expected);
        let row_order: Vec<(u64, usize)> =
            outcome.rows.iter().map(|r| (r.workload, r.threads)).collect();
        assert_eq!(row_order, expected);
    }

    #[test]
    fn test_sweep_constant_latency_ratio_everywhere() {
        let bench = ConstantBench {
            spin_ms: 5.0,
            mutex_ms: 10.0,
        };
        let axes = SweepAxes::from_cores(4);
        let outcome =
            SweepController::new(&bench, axes).run(SystemProfile::default(), |_| {});

        for row in &outcome.rows {
            assert!((row.ratio - 2.0).abs() < 1e-9);
        }
        for wi in 0..outcome.axes.workloads.len() {
            for ti in 0..outcome.axes.threads.len() {
                assert!((outcome.ratio.get(wi, ti) - 2.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_sweep_normalization_per_tier() {
        let bench = ConstantBench {
            spin_ms: 10.0,
            mutex_ms: 10.0,
        };
        let axes = SweepAxes::from_cores(1).with_workloads(vec![0, 5000]);
        let outcome =
            SweepController::new(&bench, axes).run(SystemProfile::default(), |_| {});

        let light = &outcome.rows[0];
        assert_eq!(light.iterations, LIGHT_TIER_ITERATIONS);
        assert!((light.spin_ms - 10.0).abs() < 1e-9);

        let heavy = outcome
            .rows
            .iter()
            .find(|r| r.workload == 5000)
            .expect("heavy row");
        assert_eq!(heavy.iterations, HEAVY_TIER_ITERATIONS);
        assert!((heavy.spin_ms - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_sweep_failed_cells_record_zeros_and_continue() {
        let axes = SweepAxes::from_cores(4);
        let total = axes.cells();
        let outcome =
            SweepController::new(&BrokenBench, axes).run(SystemProfile::default(), |_| {});

        assert_eq!(outcome.rows.len(), total);
        for row in &outcome.rows {
            assert_eq!(row.spin_ms, 0.0);
            assert_eq!(row.mutex_ms, 0.0);
            assert_eq!(row.ratio, 0.0);
        }
    }

    #[test]
    fn test_sweep_accumulates_raw_ops() {
        let bench = ConstantBench {
            spin_ms: 1.0,
            mutex_ms: 1.0,
        };
        let axes = SweepAxes {
            workloads: vec![0],
            threads: vec![2],
        };
        let outcome = SweepController::new(&bench, axes)
            .with_repeats(5)
            .run(SystemProfile::default(), |_| {});

        assert_eq!(outcome.total_raw_ops, LIGHT_TIER_ITERATIONS * 5 * 2);
    }

    #[test]
    fn test_outcome_json_round_trip() {
        let bench = ConstantBench {
            spin_ms: 5.0,
            mutex_ms: 10.0,
        };
        let axes = SweepAxes::from_cores(2);
        let outcome =
            SweepController::new(&bench, axes).run(SystemProfile::default(), |_| {});

        let json = outcome.to_json().unwrap();
        let back = SweepOutcome::from_json(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
