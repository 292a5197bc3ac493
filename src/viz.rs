//! Two-panel chart rendering of a sweep outcome
//!
//! Top panel: normalized latency against the thread axis, one solid line per
//! workload for the spin lock and a dashed counterpart for the mutex. Bottom
//! panel: the mutex/spin speedup ratio per workload with a reference line at
//! 1.0. The panels plot the already-reduced matrices verbatim; nothing here
//! recomputes statistics.

#![allow(clippy::cast_precision_loss)]

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;

use crate::error::{CerrojoError, Result};
use crate::sweep::SweepOutcome;

/// Output bitmap dimensions (two stacked panels)
const CHART_SIZE: (u32, u32) = (1200, 1400);

/// Line palette cycled per workload value
const PALETTE: [RGBColor; 5] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
];

/// Render the latency and speedup panels into a PNG at `path`
///
/// # Errors
///
/// Returns `CerrojoError::InvalidConfig` if the outcome has empty axes, or
/// `CerrojoError::Render` if the chart backend fails (unwritable path,
/// malformed dimensions).
pub fn render_chart(outcome: &SweepOutcome, path: &Path) -> Result<()> {
    if outcome.axes.threads.is_empty() || outcome.axes.workloads.is_empty() {
        return Err(CerrojoError::invalid_config(
            "axes",
            "cannot plot an outcome with an empty axis",
        ));
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    draw_panels(outcome, &root).map_err(|e| CerrojoError::Render {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn draw_panels(
    outcome: &SweepOutcome,
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 1));

    let threads: Vec<f64> = outcome.axes.threads.iter().map(|&t| t as f64).collect();
    let x_max = threads.last().copied().unwrap_or(1.0) * 1.05;

    // ------------------------------------------------------------------
    // Panel 1: normalized latency vs threads
    // ------------------------------------------------------------------
    let y_max = outcome
        .spin
        .max_value()
        .max(outcome.mutex.max_value())
        .max(1e-6)
        * 1.1;

    let mut latency = ChartBuilder::on(&panels[0])
        .caption(
            format!(
                "Execution Latency (Normalized 1M Iters) | {}",
                outcome.profile.cpu_model
            ),
            ("sans-serif", 22),
        )
        .margin(12)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

    latency
        .configure_mesh()
        .x_desc("Number of Threads")
        .y_desc("Total Time (ms)")
        .draw()?;

    for (wi, &workload) in outcome.axes.workloads.iter().enumerate() {
        let color = PALETTE[wi % PALETTE.len()];

        let spin_points: Vec<(f64, f64)> = threads
            .iter()
            .copied()
            .zip(outcome.spin.workload_row(wi).iter().copied())
            .collect();
        latency
            .draw_series(LineSeries::new(spin_points, color.stroke_width(2)))?
            .label(format!("Spin ({workload} NOPs)"))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
            });

        let mutex_points: Vec<(f64, f64)> = threads
            .iter()
            .copied()
            .zip(outcome.mutex.workload_row(wi).iter().copied())
            .collect();
        latency
            .draw_series(DashedLineSeries::new(
                mutex_points,
                8,
                5,
                color.mix(0.7).stroke_width(1),
            ))?
            .label(format!("Mutex ({workload} NOPs)"))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.mix(0.7))
            });
    }

    latency
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.25))
        .draw()?;

    // ------------------------------------------------------------------
    // Panel 2: speedup ratio vs threads, reference at 1.0
    // ------------------------------------------------------------------
    let ratio_max = outcome.ratio.max_value().max(1.2) * 1.15;

    let mut speedup = ChartBuilder::on(&panels[1])
        .caption(
            "Speedup Analysis: Mutex / Spinlock Ratio",
            ("sans-serif", 22),
        )
        .margin(12)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..ratio_max)?;

    speedup
        .configure_mesh()
        .x_desc("Number of Threads")
        .y_desc("Ratio (Speedup Multiplier)")
        .draw()?;

    speedup
        .draw_series(std::iter::once(PathElement::new(
            vec![(0.0, 1.0), (x_max, 1.0)],
            RED.mix(0.5).stroke_width(1),
        )))?
        .label("Baseline (1.0x)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], RED.mix(0.5)));

    for (wi, &workload) in outcome.axes.workloads.iter().enumerate() {
        let color = PALETTE[wi % PALETTE.len()];
        let points: Vec<(f64, f64)> = threads
            .iter()
            .copied()
            .zip(outcome.ratio.workload_row(wi).iter().copied())
            .collect();
        speedup
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(format!("{workload} NOPs"))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
            });
    }

    speedup
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.25))
        .draw()?;

    root.present()?;
    Ok(())
}
