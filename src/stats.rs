//! Outlier-robust statistical reduction of repeated timing samples
//!
//! A sweep cell is measured `repeats` times and the raw samples are noisy:
//! scheduler interference, thermal events, or a cold cache can inflate a
//! single run by an order of magnitude. `reduce` collapses a sample set into
//! one robust central estimate using Tukey's 1.5×IQR fence.

#![allow(clippy::cast_precision_loss)]

/// Tukey fence multiplier applied to the interquartile range
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Minimum sample count before quartile estimation is considered meaningful
pub const MIN_SAMPLES_FOR_IQR: usize = 4;

/// Compute a percentile with linear interpolation between closest ranks
///
/// Uses the standard interpolation method (`pos = (n-1) * p / 100`), so
/// `percentile(&[10, 20, 30, 40], 25.0)` is 17.5, not 20. Returns 0.0 for an
/// empty slice.
#[must_use]
pub fn percentile(data: &[f64], p: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let pos = (n - 1) as f64 * (p / 100.0).clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }

    let weight = pos - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Compute the median of a sample set
///
/// Returns 0.0 for an empty slice.
#[must_use]
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    if n % 2 == 0 {
        f64::midpoint(sorted[n / 2 - 1], sorted[n / 2])
    } else {
        sorted[n / 2]
    }
}

/// Arithmetic mean; 0.0 for an empty slice
#[must_use]
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Reduce a noisy sample set to a robust central estimate
///
/// - Fewer than [`MIN_SAMPLES_FOR_IQR`] samples: plain median (not enough
///   data to estimate spread).
/// - Otherwise: samples outside `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]` are discarded
///   and the mean of the survivors is returned.
/// - If the fence discards every sample, fall back to the mean of the full
///   unfiltered set so the result is always finite.
///
/// The input is treated as read-only and ordering does not affect the result.
#[must_use]
pub fn reduce(samples: &[f64]) -> f64 {
    if samples.len() < MIN_SAMPLES_FOR_IQR {
        return median(samples);
    }

    let q1 = percentile(samples, 25.0);
    let q3 = percentile(samples, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - IQR_MULTIPLIER * iqr;
    let upper = q3 + IQR_MULTIPLIER * iqr;

    let kept: Vec<f64> = samples
        .iter()
        .copied()
        .filter(|x| *x >= lower && *x <= upper)
        .collect();

    if kept.is_empty() {
        mean(samples)
    } else {
        mean(&kept)
    }
}
