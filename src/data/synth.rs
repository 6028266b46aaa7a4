//! Synthetic extract generation (deterministic, seeded).
//!
//! Produces rows in the raw extract format with a plausible load shape (two
//! daily peaks, a weekend dip, a winter bump) and the defects the cleaning
//! pipeline exists for: isolated zero readings, dropped rows and multi-hour
//! outages reported as zeros.

use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDate, Timelike, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::info;

use crate::domain::{RawReading, SamplingConfig};
use crate::error::{AppError, EXIT_INPUT};

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub area_code: String,
    pub area_name: String,
    pub start: NaiveDate,
    pub days: u32,
    /// Mean load in MW.
    pub base_mw: f64,
    /// Standard deviation of the additive noise, in MW.
    pub noise_mw: f64,
    /// Probability that a reading is reported as `0`.
    pub zero_rate: f64,
    /// Probability that a row is missing from the extract.
    pub drop_rate: f64,
    /// Number of multi-sample outages.
    pub outages: usize,
    /// Longest outage, in samples.
    pub outage_max_samples: usize,
    pub seed: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            area_code: "200046977".to_string(),
            area_name: "Métropole de Lyon".to_string(),
            start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default(),
            days: 28,
            base_mw: 1500.0,
            noise_mw: 25.0,
            zero_rate: 0.002,
            drop_rate: 0.002,
            outages: 3,
            outage_max_samples: 24,
            seed: 42,
        }
    }
}

/// Generate the extract described by `config`.
pub fn generate_extract(config: &SynthConfig, sampling: &SamplingConfig) -> Result<Vec<RawReading>, AppError> {
    sampling.validate()?;
    let probabilities = [config.zero_rate, config.drop_rate];
    if probabilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
        return Err(AppError::new(EXIT_INPUT, "Zero and drop rates must lie in [0, 1]."));
    }
    let normal = Normal::new(0.0, config.noise_mw.max(0.0))
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid noise level: {e}")))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let n = config.days as usize * sampling.samples_per_day();
    let start = config.start.and_hms_opt(0, 0, 0).unwrap_or_default();

    let mut outage = vec![false; n];
    if n > 0 && config.outage_max_samples > 0 {
        for _ in 0..config.outages {
            let len = rng.gen_range(1..=config.outage_max_samples);
            let at = rng.gen_range(0..n);
            let end = (at + len).min(n);
            outage[at..end].fill(true);
        }
    }

    let mut readings = Vec::with_capacity(n);
    for (i, &in_outage) in outage.iter().enumerate() {
        let roll: f64 = rng.r#gen();
        if roll < config.drop_rate {
            continue;
        }
        let instant = start + sampling.interval() * i as i32;
        let noise = normal.sample(&mut rng);
        let zero: f64 = rng.r#gen();

        let value = if in_outage || zero < config.zero_rate {
            0.0
        } else {
            (config.base_mw * load_shape(instant) + noise).max(0.0).round()
        };

        readings.push(RawReading {
            line: readings.len() + 2,
            area_code: config.area_code.clone(),
            area_name: config.area_name.clone(),
            date: instant.format("%Y-%m-%d").to_string(),
            time: instant.format("%H:%M").to_string(),
            consumption: Some(value),
        });
    }

    info!(
        rows = readings.len(),
        slots = n,
        seed = config.seed,
        "synthetic extract generated"
    );
    Ok(readings)
}

/// Relative load at `t` (mean close to 1).
fn load_shape(t: chrono::NaiveDateTime) -> f64 {
    let hour = f64::from(t.hour()) + f64::from(t.minute()) / 60.0;
    let bump = |center: f64, width: f64| (-((hour - center) / width).powi(2)).exp();
    let daily = 0.8 + 0.25 * bump(8.5, 2.0) + 0.35 * bump(19.0, 2.5);

    let weekly = match t.weekday() {
        Weekday::Sat => 0.9,
        Weekday::Sun => 0.85,
        _ => 1.0,
    };

    // Peak in mid-January, trough in mid-July.
    let day_of_year = f64::from(t.ordinal());
    let seasonal = 1.0 + 0.2 * (2.0 * PI * (day_of_year - 15.0) / 365.25).cos();

    daily * weekly * seasonal
}

/// First day of a `days`-long extract ending the day before `today`.
pub fn start_for(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(i64::from(days))
}
