//! Backend-independent chart layout: axis ticks, bounds and provenance segments.
//!
//! Kept separate from the renderers so the SVG charts, the ASCII chart and the
//! TUI widget agree on what they draw, and so the layout can be tested without
//! producing any output.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::domain::Sample;

/// Axis granularity of a time-range chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickGranularity {
    Monthly,
    Yearly,
}

impl TickGranularity {
    /// Monthly ticks for ranges up to a year, yearly beyond.
    pub fn for_range(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if (end - start).num_days() <= 365 {
            TickGranularity::Monthly
        } else {
            TickGranularity::Yearly
        }
    }

    fn label_format(self) -> &'static str {
        match self {
            TickGranularity::Monthly => "%b %Y",
            TickGranularity::Yearly => "%Y",
        }
    }
}

/// Tick positions within `[start, end]` with their labels.
pub fn date_ticks(start: NaiveDateTime, end: NaiveDateTime) -> Vec<(NaiveDateTime, String)> {
    if end < start {
        return Vec::new();
    }
    let granularity = TickGranularity::for_range(start, end);

    let mut ticks = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    if granularity == TickGranularity::Yearly {
        month = 1;
    }
    loop {
        let Some(at) = NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
            break;
        };
        if at > end {
            break;
        }
        if at >= start {
            ticks.push((at, at.format(granularity.label_format()).to_string()));
        }
        match granularity {
            TickGranularity::Monthly if month == 12 => {
                year += 1;
                month = 1;
            }
            TickGranularity::Monthly => month += 1,
            TickGranularity::Yearly => year += 1,
        }
    }
    ticks
}

/// Days elapsed since `origin`, the x coordinate used by every time chart.
pub fn day_offset(origin: NaiveDateTime, t: NaiveDateTime) -> f64 {
    (t - origin).num_seconds() as f64 / 86_400.0
}

/// Smallest and largest present final value.
pub fn value_bounds(samples: &[Sample]) -> Option<(f64, f64)> {
    samples
        .iter()
        .filter_map(Sample::final_value)
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Widen a degenerate range so a chart can still be built on it.
pub fn non_degenerate(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        let pad = lo.abs().max(1.0) * 0.05;
        (lo - pad, hi + pad)
    }
}

/// Contiguous runs of present final values, for plain line charts.
pub fn present_runs(samples: &[Sample]) -> Vec<Vec<(NaiveDateTime, f64)>> {
    let mut runs = Vec::new();
    let mut current: Vec<(NaiveDateTime, f64)> = Vec::new();
    for s in samples {
        match s.final_value() {
            Some(v) => current.push((s.instant, v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// A polyline drawn in a single provenance color.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub original: bool,
    pub points: Vec<(NaiveDateTime, f64)>,
}

/// Split the final series into provenance-colored polylines.
///
/// The line from sample `i` to `i + 1` takes the color of sample `i`.
/// Neighboring pieces of the same color are merged, and an absent value on
/// either end breaks the line.
pub fn provenance_segments(samples: &[Sample]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut open = false;

    for pair in samples.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let (Some(va), Some(vb)) = (a.final_value(), b.final_value()) else {
            open = false;
            continue;
        };
        let original = a.is_original();
        match segments.last_mut() {
            Some(seg) if open && seg.original == original => seg.points.push((b.instant, vb)),
            _ => segments.push(Segment {
                original,
                points: vec![(a.instant, va), (b.instant, vb)],
            }),
        }
        open = true;
    }
    segments
}
