//! Shared domain types.
//!
//! These types are intentionally kept small:
//!
//! - `RawReading` is a row of the extract, untouched except for number parsing
//! - `TimedSeries` is the canonical, strictly time-indexed series
//! - `SamplingConfig` carries the feed cadence that every stage depends on

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CleanError;

/// One row of the raw extract.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    /// 1-based line number in the source file (header is line 1).
    pub line: usize,
    pub area_code: String,
    pub area_name: String,
    pub date: String,
    pub time: String,
    /// Consumption in MW as reported. `None` when the cell was empty.
    ///
    /// A reported `0.0` is kept as-is here; the normalizer decides what it means.
    pub consumption: Option<f64>,
}

/// The metropolitan area a series belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub code: String,
    pub name: String,
}

/// Feed cadence and reconstruction bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingConfig {
    /// Minutes between two consecutive samples.
    pub interval_minutes: u32,
    /// Longest absent run (in samples) that local interpolation may fill.
    pub interpolation_limit: usize,
    /// Distance, in days, of the fallback sample used for longer gaps.
    pub lag_days: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 15,
            interpolation_limit: 4,
            lag_days: 7,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<(), CleanError> {
        if self.interval_minutes == 0 || 1440 % self.interval_minutes != 0 {
            return Err(CleanError::InvalidSampling(format!(
                "interval of {} minutes does not divide a day",
                self.interval_minutes
            )));
        }
        if self.lag_days == 0 {
            return Err(CleanError::InvalidSampling(
                "lag must be at least one day".to_string(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }

    pub fn interval_hours(&self) -> f64 {
        f64::from(self.interval_minutes) / 60.0
    }

    pub fn samples_per_day(&self) -> usize {
        (1440 / self.interval_minutes.max(1)) as usize
    }

    /// Index offset of the weekly-lag fallback (672 for the default feed).
    pub fn lag_samples(&self) -> usize {
        self.lag_days as usize * self.samples_per_day()
    }
}

/// Where a sample's final value came from.
///
/// Derived from which values are present; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillSource {
    Original,
    Interpolated,
    WeeklyLag,
    Unreconstructed,
}

impl FillSource {
    pub fn label(self) -> &'static str {
        match self {
            FillSource::Original => "original",
            FillSource::Interpolated => "interpolated",
            FillSource::WeeklyLag => "weekly-lag",
            FillSource::Unreconstructed => "unreconstructed",
        }
    }
}

/// One slot of a `TimedSeries`.
///
/// The value fields are only written by the cleaning pipeline; everything else
/// reads them through the accessors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub instant: NaiveDateTime,
    pub(crate) raw_value: Option<f64>,
    pub(crate) interpolated_value: Option<f64>,
    pub(crate) final_value: Option<f64>,
}

impl Sample {
    /// A freshly normalized sample: nothing reconstructed yet.
    pub fn observed(instant: NaiveDateTime, raw_value: Option<f64>) -> Self {
        Self {
            instant,
            raw_value,
            interpolated_value: None,
            final_value: None,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.instant.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.instant.time()
    }

    pub fn raw_value(&self) -> Option<f64> {
        self.raw_value
    }

    pub fn interpolated_value(&self) -> Option<f64> {
        self.interpolated_value
    }

    pub fn final_value(&self) -> Option<f64> {
        self.final_value
    }

    /// Provenance flag: the feed itself supplied this value.
    pub fn is_original(&self) -> bool {
        self.raw_value.is_some()
    }

    pub fn fill_source(&self) -> FillSource {
        if self.raw_value.is_some() {
            FillSource::Original
        } else if self.interpolated_value.is_some() {
            FillSource::Interpolated
        } else if self.final_value.is_some() {
            FillSource::WeeklyLag
        } else {
            FillSource::Unreconstructed
        }
    }
}

/// A strictly time-indexed consumption series for one area.
///
/// Invariant: `samples[i].instant == start + i * interval` for every `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedSeries {
    area: Area,
    sampling: SamplingConfig,
    samples: Vec<Sample>,
    reconstructed: bool,
}

impl TimedSeries {
    pub(crate) fn new(area: Area, sampling: SamplingConfig, samples: Vec<Sample>) -> Self {
        Self {
            area,
            sampling,
            samples,
            reconstructed: false,
        }
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    pub(crate) fn mark_reconstructed(&mut self) {
        self.reconstructed = true;
    }

    /// Whether the gap reconstructor has populated the derived values.
    pub fn is_reconstructed(&self) -> bool {
        self.reconstructed
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_instant(&self) -> Option<NaiveDateTime> {
        self.samples.first().map(|s| s.instant)
    }

    pub fn last_instant(&self) -> Option<NaiveDateTime> {
        self.samples.last().map(|s| s.instant)
    }

    /// Position of `instant` in the series, if it lies on the grid.
    pub fn index_of(&self, instant: NaiveDateTime) -> Option<usize> {
        let first = self.first_instant()?;
        let offset = (instant - first).num_seconds();
        let step = i64::from(self.sampling.interval_minutes) * 60;
        if offset < 0 || offset % step != 0 {
            return None;
        }
        let idx = usize::try_from(offset / step).ok()?;
        (idx < self.samples.len()).then_some(idx)
    }

    pub fn get(&self, instant: NaiveDateTime) -> Option<&Sample> {
        self.index_of(instant).map(|i| &self.samples[i])
    }

    /// Samples whose calendar date lies in `[start, end]` (inclusive).
    pub fn date_range(&self, start: NaiveDate, end: NaiveDate) -> &[Sample] {
        let lo = self.samples.partition_point(|s| s.date() < start);
        let hi = self.samples.partition_point(|s| s.date() <= end);
        if lo >= hi {
            return &[];
        }
        &self.samples[lo..hi]
    }

    /// Present final values, in time order.
    pub fn final_values(&self) -> Vec<f64> {
        self.samples.iter().filter_map(|s| s.final_value).collect()
    }
}

/// Which chart(s) to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Final series over a date range.
    Range,
    /// Final series colored by original vs reconstructed segments.
    Provenance,
    /// Mean consumption per year.
    Annual,
    /// Mean consumption per month.
    Monthly,
    /// Hour of day × weekday mean consumption.
    Heatmap,
    /// Weekday vs weekend quarter-hour profiles.
    Weekday,
    /// Winter vs summer vs shoulder quarter-hour profiles.
    Season,
    /// Every chart above.
    All,
}

impl ChartKind {
    pub const EACH: [ChartKind; 7] = [
        ChartKind::Range,
        ChartKind::Provenance,
        ChartKind::Annual,
        ChartKind::Monthly,
        ChartKind::Heatmap,
        ChartKind::Weekday,
        ChartKind::Season,
    ];

    pub fn expand(self) -> Vec<ChartKind> {
        match self {
            ChartKind::All => Self::EACH.to_vec(),
            kind => vec![kind],
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            ChartKind::Range => "range",
            ChartKind::Provenance => "provenance",
            ChartKind::Annual => "annual",
            ChartKind::Monthly => "monthly",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Weekday => "weekday-weekend",
            ChartKind::Season => "season",
            ChartKind::All => "all",
        }
    }
}
