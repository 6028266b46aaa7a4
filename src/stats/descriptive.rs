//! Summary statistics over the final consumption values.

use serde::Serialize;

use crate::error::StatsError;

/// The ten descriptive statistics reported for a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    /// Sample standard deviation (n − 1).
    pub std_dev: f64,
    /// Sample variance (n − 1).
    pub variance: f64,
    /// Population skewness.
    pub skewness: f64,
    /// Population excess (Fisher) kurtosis.
    pub kurtosis: f64,
}

/// Compute the descriptive statistics of `values`.
///
/// Absent values must already have been filtered out.
pub fn describe(values: &[f64]) -> Result<DescriptiveStats, StatsError> {
    let n = values.len();
    if n < 2 {
        return Err(StatsError::InsufficientData { needed: 2, got: n });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;

    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &v in values {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    let variance = m2 / (nf - 1.0);
    let (m2, m3, m4) = (m2 / nf, m3 / nf, m4 / nf);

    // A constant series has no shape; report zero rather than NaN.
    let (skewness, kurtosis) = if m2 > 0.0 {
        (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
    } else {
        (0.0, 0.0)
    };

    let min = sorted[0];
    let max = sorted[n - 1];

    Ok(DescriptiveStats {
        count: n,
        mean,
        median: median_sorted(&sorted),
        mode: mode_sorted(&sorted),
        min,
        max,
        range: max - min,
        std_dev: variance.sqrt(),
        variance,
        skewness,
        kurtosis,
    })
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Most frequent value; the smallest wins a tie.
fn mode_sorted(sorted: &[f64]) -> f64 {
    let mut best = sorted[0];
    let mut best_run = 0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        // Strictly greater keeps the earlier (smaller) value on ties.
        if j - i > best_run {
            best_run = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn known_answer_small_sample() {
        let s = describe(&[4.0, 2.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_abs_diff_eq!(s.mean, 2.4, epsilon = 1e-12);
        assert_abs_diff_eq!(s.median, 2.0);
        assert_abs_diff_eq!(s.mode, 2.0);
        assert_abs_diff_eq!(s.min, 1.0);
        assert_abs_diff_eq!(s.max, 4.0);
        assert_abs_diff_eq!(s.range, 3.0);
        assert_abs_diff_eq!(s.variance, 1.3, epsilon = 1e-12);
        assert_abs_diff_eq!(s.std_dev, 1.140175425, epsilon = 1e-9);
        assert_abs_diff_eq!(s.skewness, 0.271545, epsilon = 1e-6);
        assert_abs_diff_eq!(s.kurtosis, -1.044379, epsilon = 1e-6);
    }

    #[test]
    fn even_count_median_and_mode_tie() {
        let s = describe(&[5.0, 1.0, 5.0, 1.0, 3.0, 9.0]).unwrap();
        assert_abs_diff_eq!(s.median, 4.0);
        assert_abs_diff_eq!(s.mode, 1.0);
    }

    #[test]
    fn constant_series_has_zero_shape() {
        let s = describe(&[7.0; 10]).unwrap();
        assert_abs_diff_eq!(s.std_dev, 0.0);
        assert_abs_diff_eq!(s.skewness, 0.0);
        assert_abs_diff_eq!(s.kurtosis, 0.0);
    }

    #[test]
    fn single_value_is_insufficient() {
        assert_eq!(
            describe(&[1.0]),
            Err(StatsError::InsufficientData { needed: 2, got: 1 })
        );
    }
}
