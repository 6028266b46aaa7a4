//! Calendar projections of the final series.
//!
//! Everything here is read-only: it turns the reconstructed samples into the
//! aggregates the charts draw. Absent final values are skipped, never counted
//! as zero.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;

use crate::domain::{Sample, SamplingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Summer,
    Shoulder,
}

impl Season {
    pub const ALL: [Season; 3] = [Season::Winter, Season::Summer, Season::Shoulder];

    /// Winter is December to February, summer June to August.
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            6..=8 => Season::Summer,
            _ => Season::Shoulder,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Summer => "summer",
            Season::Shoulder => "shoulder",
        }
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// One present final value with its calendar attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisualRecord {
    pub instant: NaiveDateTime,
    pub value: f64,
    pub is_original: bool,
    pub hour: u32,
    pub weekday: Weekday,
    pub is_weekend: bool,
    pub month: u32,
    pub season: Season,
}

pub fn visual_projection(samples: &[Sample]) -> Vec<VisualRecord> {
    samples
        .iter()
        .filter_map(|s| {
            let value = s.final_value()?;
            let weekday = s.instant.weekday();
            let month = s.instant.month();
            Some(VisualRecord {
                instant: s.instant,
                value,
                is_original: s.is_original(),
                hour: s.instant.hour(),
                weekday,
                is_weekend: is_weekend(weekday),
                month,
                season: Season::from_month(month),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn add(&mut self, v: f64) {
        self.sum += v;
        self.n += 1;
    }

    fn value(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

/// A bar of the annual or monthly aggregate chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateBar {
    /// `YYYY` or `YYYY-MM`.
    pub label: String,
    pub mean_mw: f64,
    /// Sum of MW × interval length in hours.
    pub energy_mwh: f64,
    pub samples: usize,
}

pub fn annual_aggregate(samples: &[Sample], sampling: &SamplingConfig) -> Vec<AggregateBar> {
    aggregate_by(samples, sampling, |t| format!("{:04}", t.year()))
}

pub fn monthly_aggregate(samples: &[Sample], sampling: &SamplingConfig) -> Vec<AggregateBar> {
    aggregate_by(samples, sampling, |t| format!("{:04}-{:02}", t.year(), t.month()))
}

fn aggregate_by<F>(samples: &[Sample], sampling: &SamplingConfig, key: F) -> Vec<AggregateBar>
where
    F: Fn(NaiveDateTime) -> String,
{
    // Zero-padded keys sort chronologically.
    let mut buckets: BTreeMap<String, Mean> = BTreeMap::new();
    for s in samples {
        if let Some(v) = s.final_value() {
            buckets.entry(key(s.instant)).or_default().add(v);
        }
    }

    let hours = sampling.interval_hours();
    buckets
        .into_iter()
        .filter_map(|(label, m)| {
            Some(AggregateBar {
                mean_mw: m.value()?,
                energy_mwh: m.sum * hours,
                samples: m.n,
                label,
            })
        })
        .collect()
}

/// Mean consumption per hour of day (rows) and weekday (columns, Monday first).
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    cells: [[Option<f64>; 7]; 24],
}

impl Heatmap {
    pub fn cell(&self, hour: u32, weekday: Weekday) -> Option<f64> {
        self.cells
            .get(hour as usize)
            .and_then(|row| row[weekday.num_days_from_monday() as usize])
    }

    /// Smallest and largest populated cell.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

pub fn hour_weekday_heatmap(samples: &[Sample]) -> Heatmap {
    let mut acc = [[Mean::default(); 7]; 24];
    for r in visual_projection(samples) {
        acc[r.hour as usize][r.weekday.num_days_from_monday() as usize].add(r.value);
    }
    Heatmap {
        cells: acc.map(|row| row.map(|m| m.value())),
    }
}

/// Mean value per time-of-day slot over a subset of days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyProfile {
    pub label: String,
    /// One entry per sampling slot of the day; `None` where no day contributed.
    pub slots: Vec<Option<f64>>,
}

impl DailyProfile {
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, v)| v.map(|v| (i, v)))
    }
}

pub fn weekday_weekend_profiles(samples: &[Sample], sampling: &SamplingConfig) -> Vec<DailyProfile> {
    [("weekday", false), ("weekend", true)]
        .into_iter()
        .map(|(label, weekend)| daily_profile(samples, sampling, label, |r| r.is_weekend == weekend))
        .collect()
}

pub fn season_profiles(samples: &[Sample], sampling: &SamplingConfig) -> Vec<DailyProfile> {
    Season::ALL
        .into_iter()
        .map(|season| daily_profile(samples, sampling, season.label(), |r| r.season == season))
        .collect()
}

fn daily_profile<P>(samples: &[Sample], sampling: &SamplingConfig, label: &str, keep: P) -> DailyProfile
where
    P: Fn(&VisualRecord) -> bool,
{
    let per_day = sampling.samples_per_day();
    let step = sampling.interval_minutes.max(1);
    let mut acc = vec![Mean::default(); per_day];
    for r in visual_projection(samples).iter().filter(|r| keep(r)) {
        let minutes = r.instant.hour() * 60 + r.instant.minute();
        let slot = (minutes / step) as usize;
        if let Some(m) = acc.get_mut(slot) {
            m.add(r.value);
        }
    }
    DailyProfile {
        label: label.to_string(),
        slots: acc.iter().map(Mean::value).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, NaiveDate};

    /// Quarter-hour samples from `start` with value `f(i)`; `None` leaves the slot absent.
    fn samples_from(start: NaiveDateTime, len: usize, f: impl Fn(usize) -> Option<f64>) -> Vec<Sample> {
        (0..len)
            .map(|i| {
                let v = f(i);
                Sample {
                    instant: start + Duration::minutes(15 * i as i64),
                    raw_value: v,
                    interpolated_value: v,
                    final_value: v,
                }
            })
            .collect()
    }

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn seasons_bucket_by_month() {
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(3), Season::Shoulder);
        assert_eq!(Season::from_month(7), Season::Summer);
        assert_eq!(Season::from_month(11), Season::Shoulder);
    }

    #[test]
    fn projection_skips_absent_and_flags_weekend() {
        // 2024-01-06 is a Saturday.
        let samples = samples_from(midnight(2024, 1, 6), 4, |i| (i != 1).then_some(10.0));
        let records = visual_projection(&samples);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.is_weekend && r.season == Season::Winter));
        assert_eq!(weekday_name(records[0].weekday), "Saturday");
    }

    #[test]
    fn heatmap_cells_are_means() {
        // Monday 2024-01-01: hour 0 holds 1, 2, 3, 4 -> 2.5.
        let samples = samples_from(midnight(2024, 1, 1), 8, |i| Some(1.0 + i as f64));
        let map = hour_weekday_heatmap(&samples);
        assert_abs_diff_eq!(map.cell(0, Weekday::Mon).unwrap(), 2.5);
        assert_abs_diff_eq!(map.cell(1, Weekday::Mon).unwrap(), 6.5);
        assert_eq!(map.cell(0, Weekday::Tue), None);
        assert_eq!(map.bounds(), Some((2.5, 6.5)));
    }

    #[test]
    fn profiles_have_one_slot_per_quarter_hour() {
        // Two weeks: weekday slot 0 averages Monday..Friday values.
        let sampling = SamplingConfig::default();
        let samples = samples_from(midnight(2024, 1, 1), 14 * 96, |i| Some((i / 96) as f64));
        let profiles = weekday_weekend_profiles(&samples, &sampling);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].slots.len(), 96);
        // Weekdays are days 0-4 and 7-11: mean 5.5. Weekend days 5, 6, 12, 13: mean 9.
        assert_abs_diff_eq!(profiles[0].slots[0].unwrap(), 5.5);
        assert_abs_diff_eq!(profiles[1].slots[95].unwrap(), 9.0);

        let seasons = season_profiles(&samples, &sampling);
        assert_eq!(seasons[0].label, "winter");
        assert!(seasons[1].slots.iter().all(Option::is_none));
    }

    #[test]
    fn aggregates_group_by_month_and_year() {
        let sampling = SamplingConfig::default();
        // 2023-12-31 22:00 to 2024-01-01 02:00, constant 100 MW with one hole.
        let start = midnight(2023, 12, 31) + Duration::hours(22);
        let samples = samples_from(start, 16, |i| (i != 3).then_some(100.0));

        let annual = annual_aggregate(&samples, &sampling);
        assert_eq!(annual.len(), 2);
        assert_eq!(annual[0].label, "2023");
        assert_eq!(annual[0].samples, 7);
        assert_abs_diff_eq!(annual[0].energy_mwh, 175.0);
        assert_abs_diff_eq!(annual[1].mean_mw, 100.0);

        let monthly = monthly_aggregate(&samples, &sampling);
        assert_eq!(monthly[0].label, "2023-12");
        assert_eq!(monthly[1].label, "2024-01");
        assert_eq!(monthly[1].samples, 8);
    }
}
