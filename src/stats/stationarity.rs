//! Augmented Dickey–Fuller stationarity test.
//!
//! Regression, for lag order `p`:
//!
//! ```text
//! Δy_t = det_t + γ·y_{t−1} + Σ_{i=1..p} φ_i·Δy_{t−i} + ε_t
//! ```
//!
//! The statistic is `γ̂ / se(γ̂)`. `p` is chosen by minimum AIC over
//! `0..=max_lag`, all candidates fitted on the same sample; the chosen model is
//! then re-estimated on every usable observation.
//!
//! The series is scaled by its standard deviation and the trend by `1/n`
//! before fitting. The t-statistic of `γ` is invariant to both, and MW-scale
//! levels over tens of thousands of rows otherwise make `X'X` badly scaled.

use serde::Serialize;
use tracing::debug;

use crate::error::StatsError;
use crate::math::NormalEquations;

/// Deterministic terms of the test regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrendSpec {
    /// No deterministic terms.
    None,
    Constant,
    ConstantTrend,
}

impl TrendSpec {
    pub const ALL: [TrendSpec; 3] = [TrendSpec::None, TrendSpec::Constant, TrendSpec::ConstantTrend];

    pub fn label(self) -> &'static str {
        match self {
            TrendSpec::None => "none",
            TrendSpec::Constant => "constant",
            TrendSpec::ConstantTrend => "constant+trend",
        }
    }

    /// MacKinnon asymptotic 5% critical value.
    pub fn critical_value(self) -> f64 {
        match self {
            TrendSpec::None => -1.941,
            TrendSpec::Constant => -2.862,
            TrendSpec::ConstantTrend => -3.413,
        }
    }

    fn deterministic_terms(self) -> usize {
        match self {
            TrendSpec::None => 0,
            TrendSpec::Constant => 1,
            TrendSpec::ConstantTrend => 2,
        }
    }
}

/// Outcome of one ADF regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdfResult {
    pub spec: TrendSpec,
    pub statistic: f64,
    pub critical_value: f64,
    /// Selected lag order.
    pub lags: usize,
    /// Observations in the final regression.
    pub nobs: usize,
    pub stationary: bool,
}

/// Schwert's rule: `⌊12·(n/100)^{1/4}⌋`.
pub fn default_max_lag(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize
}

/// Run the test under all three deterministic specifications.
pub fn stationarity_report(values: &[f64], max_lag: Option<usize>) -> Result<Vec<AdfResult>, StatsError> {
    TrendSpec::ALL
        .iter()
        .map(|&spec| adf_test(values, spec, max_lag))
        .collect()
}

pub fn adf_test(values: &[f64], spec: TrendSpec, max_lag: Option<usize>) -> Result<AdfResult, StatsError> {
    let n = values.len();
    let det = spec.deterministic_terms();
    let min_len = 2 * (det + 3);
    if n < min_len {
        return Err(StatsError::InsufficientData { needed: min_len, got: n });
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt();
    if !sd.is_finite() || sd == 0.0 {
        return Err(StatsError::Singular("series is constant".to_string()));
    }
    let y: Vec<f64> = values.iter().map(|v| v / sd).collect();
    let dy: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();

    let cap = (dy.len() / 2).saturating_sub(det + 1);
    let max_lag = max_lag.unwrap_or_else(|| default_max_lag(n)).min(cap);

    let lags = if max_lag == 0 {
        0
    } else {
        let common = accumulate(&y, &dy, spec, max_lag, max_lag);
        let mut best: Option<(usize, f64)> = None;
        for p in 0..=max_lag {
            let Some(fit) = common.fit_leading(1 + det + p) else {
                continue;
            };
            let aic = fit.aic();
            if best.is_none_or(|(_, b)| aic < b) {
                best = Some((p, aic));
            }
        }
        best.map(|(p, _)| p)
            .ok_or_else(|| StatsError::Singular("no lag order could be fitted".to_string()))?
    };

    let fit = accumulate(&y, &dy, spec, lags, lags)
        .fit()
        .ok_or_else(|| StatsError::Singular(format!("ADF regression ({}, {lags} lags)", spec.label())))?;

    let statistic = fit.t_stat(0);
    if !statistic.is_finite() {
        return Err(StatsError::Singular(format!("ADF statistic ({})", spec.label())));
    }

    let critical_value = spec.critical_value();
    debug!(spec = spec.label(), statistic, lags, nobs = fit.nobs, "ADF regression fitted");

    Ok(AdfResult {
        spec,
        statistic,
        critical_value,
        lags,
        nobs: fit.nobs,
        stationary: statistic < critical_value,
    })
}

/// Normal equations of the ADF regression with `lags` difference lags, using
/// observations from `first` onwards.
///
/// Column order is `[y_{t−1}, det..., Δy_{t−1}, ..., Δy_{t−lags}]`, so the
/// leading blocks are the models with fewer lags.
fn accumulate(y: &[f64], dy: &[f64], spec: TrendSpec, lags: usize, first: usize) -> NormalEquations {
    let det = spec.deterministic_terms();
    let k = 1 + det + lags;
    let n = y.len() as f64;
    let mut ne = NormalEquations::new(k);
    let mut row = vec![0.0; k];

    // dy[t] = y[t+1] − y[t] is regressed on y[t] and dy[t−1..=t−lags].
    for t in first..dy.len() {
        row[0] = y[t];
        if det >= 1 {
            row[1] = 1.0;
        }
        if det >= 2 {
            row[2] = (t + 1) as f64 / n;
        }
        for i in 1..=lags {
            row[det + i] = dy[t - i];
        }
        ne.push(&row, dy[t]);
    }
    ne
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use rand_distr::{Distribution, Normal};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    #[test]
    fn max_lag_follows_schwert_rule() {
        assert_eq!(default_max_lag(100), 12);
        assert_eq!(default_max_lag(10_000), 37);
    }

    #[test]
    fn white_noise_is_stationary_under_every_trend() {
        let values: Vec<f64> = noise(500, 7).into_iter().map(|e| 50.0 * e).collect();
        let report = stationarity_report(&values, None).unwrap();
        assert_eq!(report.len(), 3);
        for r in &report {
            assert!(r.stationary, "{:?}", r);
        }
    }

    #[test]
    fn mean_reverting_ar1_is_stationary() {
        let e = noise(400, 11);
        let mut values = vec![0.0; 400];
        for t in 1..400 {
            values[t] = 0.2 * values[t - 1] + e[t];
        }
        let r = adf_test(&values, TrendSpec::Constant, None).unwrap();
        assert!(r.stationary);
        assert_eq!(r.critical_value, -2.862);
    }

    #[test]
    fn drifting_random_walk_is_not_stationary_without_deterministic_terms() {
        let e = noise(400, 3);
        let mut values = vec![100.0; 400];
        for t in 1..400 {
            values[t] = values[t - 1] + 1.0 + e[t];
        }
        let r = adf_test(&values, TrendSpec::None, Some(0)).unwrap();
        assert!(!r.stationary);
        assert!(r.statistic > 0.0);
    }

    #[test]
    fn explosive_growth_is_not_stationary() {
        let e = noise(300, 5);
        let values: Vec<f64> = (0..300).map(|t| 100.0 * 1.01_f64.powi(t as i32) + e[t]).collect();
        for spec in [TrendSpec::None, TrendSpec::Constant] {
            let r = adf_test(&values, spec, Some(0)).unwrap();
            assert!(!r.stationary, "{:?}", r);
        }
    }

    #[test]
    fn constant_series_is_singular() {
        let err = adf_test(&[3.0; 50], TrendSpec::Constant, None).unwrap_err();
        assert!(matches!(err, StatsError::Singular(_)));
    }

    #[test]
    fn short_series_is_insufficient() {
        let err = adf_test(&[1.0, 2.0, 3.0], TrendSpec::ConstantTrend, None).unwrap_err();
        assert_eq!(err, StatsError::InsufficientData { needed: 10, got: 3 });
    }
}
