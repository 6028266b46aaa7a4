//! Ordinary least squares.
//!
//! The regressions in this project are long and thin: tens of thousands of
//! rows, a few dozen columns. Materializing the design matrix would be wasteful,
//! so rows are folded into the normal equations `X'X β = X'y` as they are
//! produced.
//!
//! Because columns are appended in a fixed order, the leading `k × k` block of
//! `X'X` is the normal matrix of the regression on the first `k` columns. This
//! lets a lag-order search fit every candidate model from one accumulation.
//!
//! Implementation choices:
//! - Cholesky on `X'X` for the common well-conditioned case.
//! - SVD fallback (`solve_least_squares`) with progressively looser tolerances
//!   when `X'X` is not numerically positive definite.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// A fitted regression.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub beta: DVector<f64>,
    pub std_errors: DVector<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    pub fn t_stat(&self, i: usize) -> f64 {
        self.beta[i] / self.std_errors[i]
    }

    /// Akaike information criterion, Gaussian log-likelihood form.
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let k = self.beta.len() as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * k
    }
}

/// Running normal equations for a regression with `k` columns.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    xtx: DMatrix<f64>,
    xty: DVector<f64>,
    yty: f64,
    nobs: usize,
}

impl NormalEquations {
    pub fn new(k: usize) -> Self {
        Self {
            xtx: DMatrix::zeros(k, k),
            xty: DVector::zeros(k),
            yty: 0.0,
            nobs: 0,
        }
    }

    pub fn columns(&self) -> usize {
        self.xty.len()
    }

    pub fn nobs(&self) -> usize {
        self.nobs
    }

    /// Fold one observation into the accumulator. `row.len()` must equal `columns()`.
    pub fn push(&mut self, row: &[f64], y: f64) {
        let k = self.columns();
        debug_assert_eq!(row.len(), k);
        for i in 0..k {
            let ri = row[i];
            self.xty[i] += ri * y;
            for j in i..k {
                self.xtx[(i, j)] += ri * row[j];
            }
        }
        self.yty += y * y;
        self.nobs += 1;
    }

    /// Fit on all accumulated columns.
    pub fn fit(&self) -> Option<OlsFit> {
        self.fit_leading(self.columns())
    }

    /// Fit the regression restricted to the first `k` columns.
    pub fn fit_leading(&self, k: usize) -> Option<OlsFit> {
        if k == 0 || k > self.columns() || self.nobs <= k {
            return None;
        }

        let xtx = self.symmetric_block(k);
        let xty = self.xty.rows(0, k).into_owned();

        let (beta, inv) = match xtx.clone().cholesky() {
            Some(chol) => (chol.solve(&xty), chol.inverse()),
            None => {
                let beta = solve_least_squares(&xtx, &xty)?;
                let inv = xtx.pseudo_inverse(1e-12).ok()?;
                (beta, inv)
            }
        };

        // At the optimum, SSR = y'y - β'X'y.
        let ssr = (self.yty - beta.dot(&xty)).max(0.0);
        let dof = (self.nobs - k) as f64;
        let sigma2 = ssr / dof;

        let std_errors = DVector::from_iterator(k, (0..k).map(|i| (sigma2 * inv[(i, i)]).sqrt()));
        if !beta.iter().chain(std_errors.iter()).all(|v| v.is_finite()) {
            return None;
        }

        Some(OlsFit {
            beta,
            std_errors,
            ssr,
            nobs: self.nobs,
        })
    }

    fn symmetric_block(&self, k: usize) -> DMatrix<f64> {
        DMatrix::from_fn(k, k, |i, j| {
            if i <= j {
                self.xtx[(i, j)]
            } else {
                self.xtx[(j, i)]
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn normal_equations_match_textbook_line_fit() {
        // y = 1, 3, 2, 5 on x = 0..4: slope 1.1, intercept 1.1.
        let mut ne = NormalEquations::new(2);
        for (x, y) in [(0.0, 1.0), (1.0, 3.0), (2.0, 2.0), (3.0, 5.0)] {
            ne.push(&[1.0, x], y);
        }
        let fit = ne.fit().unwrap();
        assert_abs_diff_eq!(fit.beta[0], 1.1, epsilon = 1e-10);
        assert_abs_diff_eq!(fit.beta[1], 1.1, epsilon = 1e-10);

        // Residuals: -0.1, 0.8, -1.3, 0.6 -> SSR 2.7, sigma^2 1.35, Sxx 5.
        assert_abs_diff_eq!(fit.ssr, 2.7, epsilon = 1e-9);
        let se_slope = (1.35_f64 / 5.0).sqrt();
        assert_abs_diff_eq!(fit.std_errors[1], se_slope, epsilon = 1e-9);
    }

    #[test]
    fn leading_block_fits_the_nested_model() {
        let mut ne = NormalEquations::new(2);
        for (x, y) in [(0.0, 1.0), (1.0, 3.0), (2.0, 2.0), (3.0, 5.0)] {
            ne.push(&[1.0, x], y);
        }
        // Intercept only: the mean.
        let fit = ne.fit_leading(1).unwrap();
        assert_abs_diff_eq!(fit.beta[0], 2.75, epsilon = 1e-12);
    }

    #[test]
    fn collinear_columns_fall_back_to_svd() {
        let mut ne = NormalEquations::new(2);
        for x in 0..5 {
            let x = f64::from(x);
            ne.push(&[x, 2.0 * x], 3.0 * x + 1.0);
        }
        // A rank-deficient system still yields a finite minimum-norm solution
        // or is rejected outright, never a NaN.
        if let Some(fit) = ne.fit() {
            assert!(fit.beta.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn too_few_observations_is_rejected() {
        let mut ne = NormalEquations::new(2);
        ne.push(&[1.0, 0.0], 1.0);
        ne.push(&[1.0, 1.0], 2.0);
        assert!(ne.fit().is_none());
    }
}
