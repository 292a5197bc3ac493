//! # Cerrojo
//!
//! Parameter-sweep benchmark harness comparing the latency of a custom
//! hybrid spin lock against a baseline POSIX mutex under varying contention
//! (thread count) and simulated critical-section length (busy-work units).
//!
//! Cerrojo (Spanish: "deadbolt") does not implement either lock. It drives a
//! pre-built external benchmark executable once per (threads, workload,
//! repeat) combination, extracts the two timing figures from its text
//! output, statistically cleans the repeated samples with an IQR outlier
//! fence, normalizes every cell to a common per-million-cycle basis, and
//! renders a fixed-width comparison report plus a two-panel chart.
//!
//! ## Example
//!
//! ```rust
//! use cerrojo::{LockBench, SweepAxes, SweepController, SystemProfile};
//!
//! struct Canned;
//!
//! impl LockBench for Canned {
//!     fn invoke(&self, _t: usize, _w: u64, _i: u64) -> cerrojo::Result<String> {
//!         Ok("[ Custom Hybrid Spinlock ]\n  - Elapsed Time : 5.000 ms\n\
//!             [ POSIX Mutex ]\n  - Elapsed Time : 10.000 ms\n"
//!             .to_string())
//!     }
//! }
//!
//! let axes = SweepAxes::from_cores(4);
//! let outcome = SweepController::new(&Canned, axes)
//!     .run(SystemProfile::default(), |_| {});
//! assert!(outcome.rows.iter().all(|r| (r.ratio - 2.0).abs() < 1e-9));
//! ```
//!
//! ## Design
//!
//! The sweep is best-effort by construction: probe failures fall back to
//! defaults, unparseable trials are dropped without retry, and a cell whose
//! every repeat failed is recorded as zeros. Nothing aborts a sweep; the only
//! fatal errors live at the CLI boundary (bad configuration, unwritable
//! artifacts).

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (MUST come after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

pub mod cli;
pub mod error;
pub mod probe;
pub mod report;
pub mod runner;
pub mod stats;
pub mod sweep;
pub mod viz;

pub use error::{CerrojoError, Result};
pub use probe::SystemProfile;
pub use runner::{
    CellMeasurement, LockBench, ReducedCell, SpinlockTestBin, TrialRunner, TrialSample,
};
pub use sweep::{
    ReportRow, ResultMatrix, SweepAxes, SweepController, SweepOutcome, SweepProgress,
};
