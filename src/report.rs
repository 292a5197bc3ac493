//! Fixed-width text report rendering
//!
//! A pure function of the accumulated [`SweepOutcome`]: hardware and
//! methodology header, one table line per sweep cell in sweep order, a rule
//! after each workload block, and a final winner trailer. Failed cells render
//! as 0.000 / ratio 0.00, which is the operator's signal that every repeat of
//! that cell was dropped.

use std::fmt::Write as FmtWrite;

use crate::runner::NORMALIZATION_BASIS;
use crate::sweep::SweepOutcome;

/// Total column width of the report rules
const RULE_WIDTH: usize = 125;

/// Render the complete report for one sweep run
#[must_use]
pub fn render_report(outcome: &SweepOutcome) -> String {
    let mut out = String::new();
    let heavy_rule = "=".repeat(RULE_WIDTH);
    let light_rule = "-".repeat(RULE_WIDTH);

    let _ = writeln!(out);
    let _ = writeln!(out, "{heavy_rule}");
    let _ = writeln!(out, "SYSTEM & PERFORMANCE REPORT: HYBRID SPINLOCK BENCHMARK");
    let _ = writeln!(out, "{heavy_rule}");
    let _ = writeln!(out, "HARDWARE SPECIFICATIONS:");
    let _ = writeln!(out, "  - CPU Model       : {}", outcome.profile.cpu_model);
    let _ = writeln!(out, "  - CPU Cores       : {} Online", outcome.profile.cores);
    let _ = writeln!(
        out,
        "  - L1 Cache Line   : {} bytes",
        outcome.profile.l1_line_bytes
    );
    let _ = writeln!(out, "{light_rule}");
    let _ = writeln!(out, "TEST PARAMETERS:");
    let _ = writeln!(out, "  - Noise Filter    : IQR Outlier Removal");
    let _ = writeln!(
        out,
        "  - Normalization   : {} Lock/Unlock cycles",
        group_thousands(NORMALIZATION_BASIS)
    );
    let _ = writeln!(out, "  - Repeats / Cell  : {}", outcome.repeats);
    let _ = writeln!(
        out,
        "  - Total Raw Ops   : {} cycles performed",
        group_thousands(outcome.total_raw_ops)
    );
    let _ = writeln!(
        out,
        "  - Bench Duration  : {:.2} seconds",
        outcome.elapsed_secs
    );
    if outcome.count_check_failures > 0 {
        let _ = writeln!(
            out,
            "  - Count Checks    : {} trial(s) reported FAIL",
            outcome.count_check_failures
        );
    }
    let _ = writeln!(out, "{heavy_rule}");
    let _ = writeln!(
        out,
        "{:<30} | {:<8} | {:<12} | {:<15} | {:<15} | {:<10}",
        "Workload Intensity (NOPs)", "Threads", "Raw Iters", "Spin(ms)", "Mutex(ms)", "Speedup"
    );
    let _ = writeln!(out, "{light_rule}");

    let max_threads = outcome.axes.max_threads();
    for row in &outcome.rows {
        let _ = writeln!(
            out,
            "{:<30} | {:<8} | {:<12} | {:<15.3} | {:<15.3} | {:<10.2}",
            row.workload, row.threads, row.iterations, row.spin_ms, row.mutex_ms, row.ratio
        );
        if row.threads == max_threads {
            let _ = writeln!(out, "{light_rule}");
        }
    }

    render_final_result(&mut out, outcome);
    out
}

/// `FINAL RESULT` trailer: best speedup cell and overall winner
fn render_final_result(out: &mut String, outcome: &SweepOutcome) {
    let _ = writeln!(out, "FINAL RESULT:");

    let best = outcome
        .rows
        .iter()
        .filter(|r| r.ratio > 0.0)
        .max_by(|a, b| a.ratio.partial_cmp(&b.ratio).unwrap_or(std::cmp::Ordering::Equal));

    match best {
        Some(row) => {
            let _ = writeln!(
                out,
                "  Best Speedup    : {:.2}x at {} NOPs / {} threads",
                row.ratio, row.workload, row.threads
            );
            let measured: Vec<f64> = outcome
                .rows
                .iter()
                .filter(|r| r.ratio > 0.0)
                .map(|r| r.ratio)
                .collect();
            let mean_ratio = crate::stats::mean(&measured);
            let winner = if mean_ratio > 1.0 {
                "Custom Hybrid Spinlock"
            } else {
                "POSIX Mutex"
            };
            let _ = writeln!(out, "  Winner          : {winner}");
        },
        None => {
            let _ = writeln!(out, "  Winner          : Inconclusive (no usable cells)");
        },
    }
}

/// Insert `,` thousands separators into an integer
#[must_use]
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
