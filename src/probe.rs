//! Best-effort hardware and topology discovery
//!
//! Every probe is an ordered chain of attempts that ends in a hard-coded
//! default, so a missing `/proc`, a stripped-down container, or an absent
//! `getconf` can never abort a benchmark run. Absent data shows up in the
//! report as the fallback value, nothing more.

use std::process::Command;

use serde::{Deserialize, Serialize};

/// Processor count used when every probe source fails
pub const FALLBACK_CORES: usize = 4;

/// L1 line size (bytes, as reported text) used when `getconf` is unavailable
pub const FALLBACK_L1_LINE: &str = "64";

/// Hardware description embedded in reports and serialized outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemProfile {
    /// CPU model string from `/proc/cpuinfo`
    pub cpu_model: String,
    /// Online processor count
    pub cores: usize,
    /// L1 data cache line size in bytes, kept as the probe's text output
    pub l1_line_bytes: String,
}

impl Default for SystemProfile {
    fn default() -> Self {
        Self {
            cpu_model: "Unknown".to_string(),
            cores: FALLBACK_CORES,
            l1_line_bytes: FALLBACK_L1_LINE.to_string(),
        }
    }
}

impl SystemProfile {
    /// Probe the running system, falling back per field on any failure
    #[must_use]
    pub fn detect() -> Self {
        Self {
            cpu_model: probe_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
            cores: probe_core_count().unwrap_or(FALLBACK_CORES),
            l1_line_bytes: probe_l1_line_size().unwrap_or_else(|| FALLBACK_L1_LINE.to_string()),
        }
    }
}

/// First `model name` entry of `/proc/cpuinfo`, if readable
fn probe_cpu_model() -> Option<String> {
    let cpuinfo = std::fs::read_to_string("/proc/cpuinfo").ok()?;
    parse_cpu_model(&cpuinfo)
}

/// Extract the first `model name : ...` value from cpuinfo text
fn parse_cpu_model(cpuinfo: &str) -> Option<String> {
    for line in cpuinfo.lines() {
        if line.starts_with("model name") {
            let value = line.split(':').nth(1)?.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Online processor count via the standard library
fn probe_core_count() -> Option<usize> {
    std::thread::available_parallelism()
        .ok()
        .map(std::num::NonZeroUsize::get)
}

/// L1 data cache line size via `getconf LEVEL1_DCACHE_LINESIZE`
fn probe_l1_line_size() -> Option<String> {
    let output = Command::new("getconf")
        .arg("LEVEL1_DCACHE_LINESIZE")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    // getconf prints "undefined" for unsupported variables
    if text.is_empty() || text.parse::<u64>().is_err() {
        return None;
    }
    Some(text)
}
