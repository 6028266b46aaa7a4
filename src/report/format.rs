//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the cleaning and statistics code stays free of presentation
//! - output changes are localized (the tables are covered by snapshot tests)

use crate::clean::{NormalizeReport, ReconstructionSummary};
use crate::domain::{FillSource, TimedSeries};
use crate::stats::{AdfResult, DescriptiveStats};

/// Format the cleaning summary: series extent, normalization counts, tier counts
/// and the first `max_gaps` unreconstructable gaps.
pub fn format_clean_summary(
    series: &TimedSeries,
    normalization: &NormalizeReport,
    summary: &ReconstructionSummary,
    max_gaps: usize,
) -> String {
    let mut out = String::new();
    let area = series.area();

    out.push_str("=== conso - consumption cleaning ===\n");
    out.push_str(&format!("Area: {} ({})\n", area.name, area.code));
    if let (Some(first), Some(last)) = (series.first_instant(), series.last_instant()) {
        out.push_str(&format!(
            "Span: {} to {} | {} samples every {} min\n",
            first.format("%Y-%m-%d %H:%M"),
            last.format("%Y-%m-%d %H:%M"),
            series.len(),
            series.sampling().interval_minutes,
        ));
    }

    out.push_str(&format!(
        "Rows: read={} other-area={} same-day={} | zero={} unreported={} inserted={}\n",
        normalization.rows_in,
        normalization.rows_other_area,
        normalization.rows_today,
        normalization.zero_readings,
        normalization.unreported,
        normalization.inserted,
    ));

    out.push_str("\nProvenance:\n");
    let total = summary.total().max(1) as f64;
    for source in [
        FillSource::Original,
        FillSource::Interpolated,
        FillSource::WeeklyLag,
        FillSource::Unreconstructed,
    ] {
        let n = summary.count(source);
        out.push_str(&format!(
            "  {:<16} {:>8} {:>7.2}%\n",
            source.label(),
            n,
            100.0 * n as f64 / total
        ));
    }

    if summary.unreconstructable.is_empty() {
        out.push_str("\nNo unreconstructable gaps.\n");
    } else {
        out.push_str(&format!(
            "\nUnreconstructable gaps ({}):\n",
            summary.unreconstructable.len()
        ));
        for gap in summary.unreconstructable.iter().take(max_gaps) {
            out.push_str(&format!(
                "  {} to {} ({} samples)\n",
                gap.start.format("%Y-%m-%d %H:%M"),
                gap.end.format("%Y-%m-%d %H:%M"),
                gap.len
            ));
        }
        let hidden = summary.unreconstructable.len().saturating_sub(max_gaps);
        if hidden > 0 {
            out.push_str(&format!("  ... and {hidden} more\n"));
        }
    }

    out
}

/// Single-row table of the ten descriptive statistics, rounded to 2 decimals.
pub fn format_descriptive(stats: &DescriptiveStats) -> String {
    let headers = [
        "mean", "median", "mode", "min", "max", "range", "std", "var", "skew", "kurt",
    ];
    let values = [
        stats.mean,
        stats.median,
        stats.mode,
        stats.min,
        stats.max,
        stats.range,
        stats.std_dev,
        stats.variance,
        stats.skewness,
        stats.kurtosis,
    ];

    let cells: Vec<String> = values.iter().map(|v| format!("{v:.2}")).collect();
    let widths: Vec<usize> = headers
        .iter()
        .zip(&cells)
        .map(|(h, c)| h.len().max(c.len()))
        .collect();

    let mut out = format!("Descriptive statistics (n={}):\n", stats.count);
    let row = |items: &[String]| {
        items
            .iter()
            .zip(&widths)
            .map(|(s, &w)| format!("{s:>w$}"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    out.push_str(&row(&headers.map(String::from)));
    out.push('\n');
    out.push_str(&row(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>()));
    out.push('\n');
    out.push_str(&row(&cells));
    out.push('\n');
    out
}

/// Table of ADF results, one row per deterministic specification.
pub fn format_stationarity(results: &[AdfResult]) -> String {
    let mut out = String::new();
    out.push_str("Stationarity (augmented Dickey-Fuller, 5%):\n");
    out.push_str(&format!(
        "{:<16} {:>10} {:>10} {:>5} {:<14}\n",
        "specification", "statistic", "critical", "lags", "verdict"
    ));
    out.push_str(&format!(
        "{:-<16} {:-<10} {:-<10} {:-<5} {:-<14}\n",
        "", "", "", "", ""
    ));
    for r in results {
        let verdict = if r.stationary { "stationary" } else { "non-stationary" };
        out.push_str(
            format!(
                "{:<16} {:>10.2} {:>10.2} {:>5} {:<14}\n",
                r.spec.label(),
                r.statistic,
                r.critical_value,
                r.lags,
                verdict
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}
