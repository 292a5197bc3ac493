//! Error types for the cerrojo harness
//!
//! Failures inside the sweep itself (unparseable trials, probe misses) are
//! recovered locally and never reach these types; the sweep is best-effort by
//! design. `CerrojoError` covers the CLI boundary, where aborting is the
//! right answer: bad configuration, unreadable result files, unwritable
//! artifacts.

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, CerrojoError>;

/// Typed errors surfaced at the CLI boundary
#[derive(Debug, Error)]
pub enum CerrojoError {
    /// Reading or writing an artifact failed
    #[error("I/O failure on {path}: {source}")]
    Io {
        /// Path of the file being read or written
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A configuration value fails validation before the sweep starts
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig {
        /// The offending field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Serializing or deserializing a sweep outcome failed
    #[error("Result serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The chart backend reported a rendering failure
    #[error("Chart rendering failed for {path}: {reason}")]
    Render {
        /// Output path of the chart
        path: String,
        /// Backend error text
        reason: String,
    },
}

impl CerrojoError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an `InvalidConfig` error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
