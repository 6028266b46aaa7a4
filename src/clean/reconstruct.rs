//! Two-tier gap reconstruction.
//!
//! Tier 1 fills short absent runs by time-weighted interpolation between the
//! known neighbors. A run longer than `interpolation_limit` samples is left
//! untouched as a whole; runs touching either end of the series are extended
//! from their single known neighbor under the same length bound.
//!
//! Tier 2 fills what is still absent with the Tier-1 value from exactly
//! `lag_samples` slots earlier (same weekday, same quarter hour). When that
//! slot is absent too, or precedes the series, the final value stays absent.
//!
//! The pass is pure and deterministic: it recomputes every derived value from
//! `raw_value`, so running it twice yields the same series.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{FillSource, Sample, TimedSeries};

/// How Tier 1 classified an absent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunClass {
    /// Bounded on both sides and short enough: interpolated.
    Interpolated,
    /// At the start or end of the series and short enough: extended.
    Boundary,
    /// Too long (or no known neighbor at all): left for the weekly lag.
    LongGap,
}

impl RunClass {
    pub fn label(self) -> &'static str {
        match self {
            RunClass::Interpolated => "interpolated",
            RunClass::Boundary => "boundary",
            RunClass::LongGap => "long-gap",
        }
    }
}

/// A maximal run of absent raw values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbsentRun {
    pub start: NaiveDateTime,
    pub len: usize,
    pub class: RunClass,
}

/// A maximal run of instants whose final value could not be reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub len: usize,
}

/// Outcome of a reconstruction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconstructionSummary {
    pub original: usize,
    pub interpolated: usize,
    pub weekly_lag: usize,
    pub unreconstructed: usize,
    pub runs: Vec<AbsentRun>,
    pub unreconstructable: Vec<Gap>,
}

impl ReconstructionSummary {
    pub fn total(&self) -> usize {
        self.original + self.interpolated + self.weekly_lag + self.unreconstructed
    }

    pub fn count(&self, source: FillSource) -> usize {
        match source {
            FillSource::Original => self.original,
            FillSource::Interpolated => self.interpolated,
            FillSource::WeeklyLag => self.weekly_lag,
            FillSource::Unreconstructed => self.unreconstructed,
        }
    }
}

/// Populate `interpolated_value` and `final_value` for every sample.
pub fn reconstruct(series: &mut TimedSeries) -> ReconstructionSummary {
    let sampling = *series.sampling();
    let limit = sampling.interpolation_limit;
    let lag = sampling.lag_samples();

    let samples = series.samples_mut();
    let raw: Vec<Option<f64>> = samples.iter().map(|s| s.raw_value).collect();

    // Tier 1.
    let mut interpolated = raw.clone();
    let mut runs = Vec::new();
    for (start, end) in absent_spans(&raw) {
        let len = end - start;
        let before = start.checked_sub(1);
        let after = (end < raw.len()).then_some(end);

        let class = match (before, after) {
            (Some(b), Some(a)) if len <= limit => {
                fill_between(samples, &raw, &mut interpolated, b, a);
                RunClass::Interpolated
            }
            (Some(k), None) | (None, Some(k)) if len <= limit => {
                interpolated[start..end].fill(raw[k]);
                RunClass::Boundary
            }
            _ => RunClass::LongGap,
        };
        runs.push(AbsentRun {
            start: samples[start].instant,
            len,
            class,
        });
    }

    // Tier 2.
    for (i, sample) in samples.iter_mut().enumerate() {
        sample.interpolated_value = interpolated[i];
        sample.final_value = interpolated[i].or_else(|| {
            i.checked_sub(lag).and_then(|j| interpolated[j])
        });
    }

    let summary = summarize(samples, runs);
    series.mark_reconstructed();

    info!(
        original = summary.original,
        interpolated = summary.interpolated,
        weekly_lag = summary.weekly_lag,
        unreconstructed = summary.unreconstructed,
        "gap reconstruction complete"
    );
    for gap in &summary.unreconstructable {
        warn!(start = %gap.start, end = %gap.end, samples = gap.len, "unreconstructable gap");
    }

    summary
}

/// Half-open index spans `[start, end)` of maximal absent runs.
fn absent_spans(values: &[Option<f64>]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, v) in values.iter().enumerate() {
        match (v.is_none(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, values.len()));
    }
    spans
}

/// Linear interpolation on elapsed time between known samples `b` and `a`.
fn fill_between(
    samples: &[Sample],
    raw: &[Option<f64>],
    out: &mut [Option<f64>],
    b: usize,
    a: usize,
) {
    let (Some(v0), Some(v1)) = (raw[b], raw[a]) else {
        return;
    };
    let t0 = samples[b].instant;
    let span = (samples[a].instant - t0).num_seconds() as f64;
    for i in b + 1..a {
        let frac = (samples[i].instant - t0).num_seconds() as f64 / span;
        out[i] = Some(v0 + frac * (v1 - v0));
    }
}

fn summarize(samples: &[Sample], runs: Vec<AbsentRun>) -> ReconstructionSummary {
    let mut summary = ReconstructionSummary {
        runs,
        ..ReconstructionSummary::default()
    };

    let mut open: Option<Gap> = None;
    for s in samples {
        match s.fill_source() {
            FillSource::Original => summary.original += 1,
            FillSource::Interpolated => summary.interpolated += 1,
            FillSource::WeeklyLag => summary.weekly_lag += 1,
            FillSource::Unreconstructed => summary.unreconstructed += 1,
        }

        if s.final_value.is_none() {
            match open.as_mut() {
                Some(gap) => {
                    gap.end = s.instant;
                    gap.len += 1;
                }
                None => {
                    open = Some(Gap {
                        start: s.instant,
                        end: s.instant,
                        len: 1,
                    })
                }
            }
        } else if let Some(gap) = open.take() {
            summary.unreconstructable.push(gap);
        }
    }
    if let Some(gap) = open {
        summary.unreconstructable.push(gap);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Area, SamplingConfig};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    const DAY: usize = 96;
    const WEEK: usize = 7 * DAY;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// A series whose value at slot `i` is `1000 + i`, with `absent` slots blanked.
    fn series_with_gaps(len: usize, absent: &[std::ops::Range<usize>]) -> TimedSeries {
        let samples = (0..len)
            .map(|i| {
                let blank = absent.iter().any(|r| r.contains(&i));
                let raw = (!blank).then_some(1000.0 + i as f64);
                Sample::observed(start() + Duration::minutes(15 * i as i64), raw)
            })
            .collect();
        let area = Area {
            code: "200054781".to_string(),
            name: "Métropole du Grand Paris".to_string(),
        };
        TimedSeries::new(area, SamplingConfig::default(), samples)
    }

    #[test]
    fn short_run_is_interpolated_on_elapsed_time() {
        let mut series = series_with_gaps(20, &[5..9]);
        let summary = reconstruct(&mut series);

        for i in 5..9 {
            let s = &series.samples()[i];
            assert_relative_eq!(s.interpolated_value().unwrap(), 1000.0 + i as f64, epsilon = 1e-9);
            assert_eq!(s.final_value(), s.interpolated_value());
            assert_eq!(s.fill_source(), FillSource::Interpolated);
            assert!(!s.is_original());
        }
        assert_eq!(summary.interpolated, 4);
        assert_eq!(summary.runs[0].class, RunClass::Interpolated);
        assert!(series.is_reconstructed());
    }

    #[test]
    fn run_of_four_is_fully_filled_and_run_of_five_is_not_touched() {
        let mut series = series_with_gaps(WEEK + 40, &[WEEK + 2..WEEK + 6, WEEK + 20..WEEK + 25]);
        let summary = reconstruct(&mut series);
        let samples = series.samples();

        for i in WEEK + 2..WEEK + 6 {
            assert_eq!(samples[i].fill_source(), FillSource::Interpolated);
        }
        for i in WEEK + 20..WEEK + 25 {
            assert_eq!(samples[i].interpolated_value(), None, "slot {i} must not be interpolated");
            assert_eq!(samples[i].fill_source(), FillSource::WeeklyLag);
            assert_eq!(samples[i].final_value(), samples[i - WEEK].interpolated_value());
        }
        assert_eq!(summary.interpolated, 4);
        assert_eq!(summary.weekly_lag, 5);
        assert_eq!(summary.runs[1].class, RunClass::LongGap);
    }

    #[test]
    fn long_gap_takes_last_week_value_exactly() {
        let mut series = series_with_gaps(WEEK + 100, &[WEEK + 30..WEEK + 40]);
        reconstruct(&mut series);

        for i in WEEK + 30..WEEK + 40 {
            let t = series.samples()[i].instant;
            let week_before = series.get(t - Duration::days(7)).unwrap();
            assert_eq!(series.samples()[i].final_value(), week_before.interpolated_value());
            assert_eq!(series.samples()[i].final_value(), Some(1000.0 + (i - WEEK) as f64));
        }
    }

    #[test]
    fn weekly_lag_uses_interpolated_value_of_last_week() {
        // Last week's slot was itself a short gap, filled by Tier 1.
        let mut series = series_with_gaps(WEEK + 50, &[11..13, WEEK + 5..WEEK + 15]);
        reconstruct(&mut series);

        let s = &series.samples()[WEEK + 11];
        assert_eq!(s.fill_source(), FillSource::WeeklyLag);
        assert_relative_eq!(s.final_value().unwrap(), 1011.0, epsilon = 1e-9);
    }

    #[test]
    fn lag_into_absent_slot_stays_absent() {
        let mut series = series_with_gaps(WEEK + 50, &[0..20, WEEK + 5..WEEK + 15]);
        let summary = reconstruct(&mut series);

        for i in WEEK + 5..WEEK + 15 {
            let s = &series.samples()[i];
            assert_eq!(s.final_value(), None);
            assert_eq!(s.fill_source(), FillSource::Unreconstructed);
        }
        assert_eq!(series.len(), WEEK + 50);
        // The first week has no lag source at all.
        assert_eq!(summary.unreconstructed, 20 + 10);
        assert_eq!(summary.unreconstructable.len(), 2);
        assert_eq!(summary.unreconstructable[1].len, 10);
        assert_eq!(summary.unreconstructable[1].start, series.samples()[WEEK + 5].instant);
        assert_eq!(summary.unreconstructable[1].end, series.samples()[WEEK + 14].instant);
    }

    #[test]
    fn boundary_runs_extend_from_nearest_neighbor() {
        let mut series = series_with_gaps(30, &[0..3, 27..30]);
        let summary = reconstruct(&mut series);
        let samples = series.samples();

        assert!(samples[0..3].iter().all(|s| s.final_value() == Some(1003.0)));
        assert!(samples[27..30].iter().all(|s| s.final_value() == Some(1026.0)));
        assert_eq!(summary.runs[0].class, RunClass::Boundary);
        assert_eq!(summary.runs[1].class, RunClass::Boundary);
    }

    #[test]
    fn long_boundary_run_is_left_for_the_lag() {
        let mut series = series_with_gaps(30, &[0..6]);
        let summary = reconstruct(&mut series);
        assert!(series.samples()[0..6].iter().all(|s| s.final_value().is_none()));
        assert_eq!(summary.runs[0].class, RunClass::LongGap);
    }

    #[test]
    fn fully_absent_series_stays_absent() {
        let mut series = series_with_gaps(8, &[0..8]);
        let summary = reconstruct(&mut series);
        assert_eq!(summary.unreconstructed, 8);
        assert_eq!(summary.runs[0].class, RunClass::LongGap);
    }

    #[test]
    fn zero_limit_disables_interpolation() {
        let base = series_with_gaps(20, &[5..6]);
        let sampling = SamplingConfig {
            interpolation_limit: 0,
            ..*base.sampling()
        };
        let mut series = TimedSeries::new(base.area().clone(), sampling, base.samples().to_vec());
        reconstruct(&mut series);
        assert_eq!(series.samples()[5].final_value(), None);
    }

    #[test]
    fn reconstruction_is_deterministic_and_idempotent() {
        let mut a = series_with_gaps(WEEK + 200, &[3..5, 40..60, WEEK + 45..WEEK + 55, WEEK + 100..WEEK + 102]);
        let mut b = a.clone();
        let sa = reconstruct(&mut a);
        let sb = reconstruct(&mut b);
        assert_eq!(a, b);
        assert_eq!(sa, sb);

        let again = reconstruct(&mut a);
        assert_eq!(a, b);
        assert_eq!(again, sa);
        assert_eq!(sa.total(), a.len());
    }
}
