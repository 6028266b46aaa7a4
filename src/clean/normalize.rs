//! Structural normalization: raw readings → strictly time-indexed series.
//!
//! Steps, in order:
//! 1. keep only the selected area (when a filter is given)
//! 2. drop rows dated on the processing day (the feed fills them in during the day)
//! 3. parse date + time-of-day into an instant; malformed rows abort
//! 4. sort by instant; duplicates and off-grid instants abort
//! 5. lay the rows on the sampling grid, inserting explicit absent samples
//! 6. map `0` readings to absent

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Area, RawReading, Sample, SamplingConfig, TimedSeries};
use crate::error::CleanError;

/// Inputs of a normalization run besides the rows themselves.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Processing date. Rows dated on this day are excluded.
    pub today: NaiveDate,
    /// Keep only rows with this area code.
    pub area: Option<String>,
    pub sampling: SamplingConfig,
}

/// What normalization did to the extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub rows_other_area: usize,
    pub rows_today: usize,
    pub zero_readings: usize,
    pub unreported: usize,
    /// Grid slots with no row at all, inserted as absent samples.
    pub inserted: usize,
}

/// Normalization output.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub series: TimedSeries,
    pub report: NormalizeReport,
}

/// A row that survived filtering, with its parsed instant.
struct KeyedRow<'a> {
    instant: NaiveDateTime,
    reading: &'a RawReading,
}

/// Build a `TimedSeries` from raw readings.
pub fn normalize(readings: &[RawReading], options: &NormalizeOptions) -> Result<Normalized, CleanError> {
    options.sampling.validate()?;

    let mut report = NormalizeReport {
        rows_in: readings.len(),
        ..NormalizeReport::default()
    };

    let mut rows = Vec::with_capacity(readings.len());
    for reading in readings {
        if let Some(area) = options.area.as_deref() {
            if reading.area_code != area {
                report.rows_other_area += 1;
                continue;
            }
        }

        let date = parse_date(&reading.date).map_err(|reason| malformed(reading, reason))?;
        if date == options.today {
            report.rows_today += 1;
            continue;
        }
        let time = parse_time(&reading.time).map_err(|reason| malformed(reading, reason))?;

        rows.push(KeyedRow {
            instant: date.and_time(time),
            reading,
        });
    }

    let codes: BTreeSet<&str> = rows.iter().map(|r| r.reading.area_code.as_str()).collect();
    if codes.len() > 1 {
        return Err(CleanError::MixedAreas {
            codes: codes.into_iter().map(str::to_string).collect(),
        });
    }
    let Some(first) = rows.first() else {
        return Err(CleanError::EmptyExtract);
    };
    let area = Area {
        code: first.reading.area_code.clone(),
        name: first.reading.area_name.clone(),
    };

    // Stable sort: equal instants keep file order, so the duplicate error
    // names the earlier line first.
    rows.sort_by_key(|r| r.instant);
    if let Some(pair) = rows.windows(2).find(|w| w[0].instant == w[1].instant) {
        return Err(CleanError::DuplicateInstant {
            instant: pair[0].instant,
            first_line: pair[0].reading.line,
            second_line: pair[1].reading.line,
        });
    }

    let samples = lay_on_grid(&rows, &options.sampling, &mut report)?;
    report.inserted = samples.len() - rows.len();

    info!(
        area = %area.code,
        rows = rows.len(),
        excluded_today = report.rows_today,
        other_area = report.rows_other_area,
        zero_readings = report.zero_readings,
        inserted = report.inserted,
        "extract normalized"
    );

    Ok(Normalized {
        series: TimedSeries::new(area, options.sampling, samples),
        report,
    })
}

fn lay_on_grid(
    rows: &[KeyedRow<'_>],
    sampling: &SamplingConfig,
    report: &mut NormalizeReport,
) -> Result<Vec<Sample>, CleanError> {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Ok(Vec::new());
    };
    let step = i64::from(sampling.interval_minutes) * 60;
    let slot_of = |row: &KeyedRow<'_>| -> Result<usize, CleanError> {
        let offset = (row.instant - first.instant).num_seconds();
        if offset % step != 0 {
            return Err(CleanError::OffGridInstant {
                line: row.reading.line,
                instant: row.instant,
                interval_minutes: sampling.interval_minutes,
            });
        }
        // Rows are sorted, so the offset is non-negative.
        Ok((offset / step) as usize)
    };

    let slots = slot_of(last)? + 1;
    let interval = sampling.interval();
    let mut samples: Vec<Sample> = (0..slots)
        .map(|i| Sample::observed(first.instant + interval * i as i32, None))
        .collect();

    for row in rows {
        let slot = slot_of(row)?;
        let raw = match row.reading.consumption {
            // A full metropolitan area never draws exactly 0 MW over a quarter
            // hour; the feed uses 0 for failed transmissions.
            Some(v) if v == 0.0 => {
                report.zero_readings += 1;
                None
            }
            Some(v) => Some(v),
            None => {
                report.unreported += 1;
                None
            }
        };
        samples[slot].raw_value = raw;
    }

    debug!(slots, rows = rows.len(), "rows laid on sampling grid");
    Ok(samples)
}

fn malformed(reading: &RawReading, reason: String) -> CleanError {
    CleanError::MalformedTimestamp {
        line: reading.line,
        date: reading.date.clone(),
        time: reading.time.clone(),
        reason,
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // The feed uses ISO dates, but re-saved spreadsheets often come back as
    // `DD/MM/YYYY`. Only a small fixed set is accepted to keep parsing
    // deterministic.
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "invalid date '{s}' (expected YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY or YYYY/MM/DD)"
    ))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    const FMTS: [&str; 2] = ["%H:%M", "%H:%M:%S"];
    for fmt in FMTS {
        if let Ok(t) = NaiveTime::parse_from_str(s, fmt) {
            return Ok(t);
        }
    }
    Err(format!("invalid time of day '{s}' (expected HH:MM or HH:MM:SS)"))
}
