//! Ordinary least squares via the SVD pseudo-inverse.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{PipelineError, PipelineResult};

/// Singular values below this (relative) tolerance count as zero.
const RANK_TOLERANCE: f64 = 1e-10;

/// Named regressor column.
#[derive(Debug, Clone, PartialEq)]
pub struct Regressor {
    pub name: String,
    pub values: Vec<f64>,
}

impl Regressor {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Column of ones.
    pub fn constant(n: usize) -> Self {
        Self::new("constant", vec![1.0; n])
    }
}

/// Estimate for one regressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficient {
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

/// Result of [`fit_ols`].
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub names: Vec<String>,
    pub coefficients: Vec<Coefficient>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub nobs: usize,
    pub df_resid: usize,
    pub fitted: Vec<f64>,
}

impl OlsFit {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.coefficients[i])
    }
}

/// Fits `y ~ regressors` by least squares.
///
/// Rank-deficient designs are solved through the pseudo-inverse, so
/// collinear dummy columns do not abort the fit. R² is centered when a
/// constant column is present and uncentered otherwise. P-values are
/// two-sided from Student's t with `nobs - rank` degrees of freedom.
///
/// # Errors
///
/// Returns [`PipelineError::Regression`] if there are no observations or
/// regressors, a column length differs from `y`, or the residual degrees of
/// freedom would be zero.
pub fn fit_ols(model: &str, y: &[f64], regressors: &[Regressor]) -> PipelineResult<OlsFit> {
    let fail = |reason: String| PipelineError::Regression {
        model: model.to_string(),
        reason,
    };
    let n = y.len();
    let k = regressors.len();
    if n == 0 || k == 0 {
        return Err(fail(format!("empty design ({n} observations, {k} regressors)")));
    }
    if let Some(r) = regressors.iter().find(|r| r.values.len() != n) {
        return Err(fail(format!(
            "regressor \"{}\" has {} values, expected {n}",
            r.name,
            r.values.len()
        )));
    }

    let x = DMatrix::from_fn(n, k, |i, j| regressors[j].values[i]);
    let y_vec = DVector::from_column_slice(y);

    let rank = x.clone().svd(false, false).rank(RANK_TOLERANCE);
    if rank >= n {
        return Err(fail(format!(
            "{n} observations leave no residual degrees of freedom for rank {rank}"
        )));
    }
    let pinv = x
        .clone()
        .pseudo_inverse(RANK_TOLERANCE)
        .map_err(|e| fail(e.to_string()))?;

    let beta = &pinv * &y_vec;
    let fitted = &x * &beta;
    let resid = &y_vec - &fitted;
    let ssr = resid.dot(&resid);

    let has_constant = regressors.iter().any(|r| {
        r.values
            .first()
            .is_some_and(|&v| v != 0.0 && r.values.iter().all(|&w| w == v))
    });
    let tss = if has_constant {
        let mean = y_vec.mean();
        y_vec.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
    } else {
        y_vec.dot(&y_vec)
    };
    let r_squared = if tss > 0.0 { 1.0 - ssr / tss } else { f64::NAN };

    let df_resid = n - rank;
    let centered = usize::from(has_constant);
    let adj_r_squared = 1.0 - (n - centered) as f64 / df_resid as f64 * (1.0 - r_squared);

    let sigma2 = ssr / df_resid as f64;
    let cov = &pinv * pinv.transpose() * sigma2;
    let t_dist = StudentsT::new(0.0, 1.0, df_resid as f64).map_err(|e| fail(e.to_string()))?;

    let coefficients = (0..k)
        .map(|j| {
            let estimate = beta[j];
            let std_error = cov[(j, j)].max(0.0).sqrt();
            let t_value = estimate / std_error;
            // 0/0 on an exact fit
            let p_value = if t_value.is_nan() {
                f64::NAN
            } else {
                2.0 * (1.0 - t_dist.cdf(t_value.abs()))
            };
            Coefficient {
                estimate,
                std_error,
                t_value,
                p_value,
            }
        })
        .collect();

    Ok(OlsFit {
        names: regressors.iter().map(|r| r.name.clone()).collect(),
        coefficients,
        r_squared,
        adj_r_squared,
        nobs: n,
        df_resid,
        fitted: fitted.iter().copied().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_line() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 2.0 * v).collect();
        let fit = fit_ols(
            "line",
            &y,
            &[Regressor::new("x", x.clone()), Regressor::constant(x.len())],
        )
        .expect("fit should succeed");
        let slope = fit.coefficient("x").map(|c| c.estimate).unwrap_or_default();
        let intercept = fit
            .coefficient("constant")
            .map(|c| c.estimate)
            .unwrap_or_default();
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((intercept - 3.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(fit.df_resid, 8);
        assert!((fit.fitted[4] - 11.0).abs() < 1e-9);
    }

    #[test]
    fn noisy_fit_has_finite_inference() {
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let noise = [0.3, -0.2, 0.1, -0.4, 0.25];
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.0 + 0.5 * v + noise[i % noise.len()])
            .collect();
        let fit = fit_ols("noisy", &y, &[Regressor::new("x", x), Regressor::constant(20)])
            .expect("fit should succeed");
        let slope = fit.coefficient("x").copied().expect("slope present");
        assert!((slope.estimate - 0.5).abs() < 0.05);
        assert!(slope.std_error.is_finite() && slope.std_error > 0.0);
        assert!(slope.p_value < 0.01);
        assert!(fit.r_squared > 0.9 && fit.r_squared < 1.0);
        assert!(fit.adj_r_squared < fit.r_squared);
    }

    #[test]
    fn collinear_columns_do_not_abort() {
        let x: Vec<f64> = (0..6).map(f64::from).collect();
        let twice: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.0 + v).collect();
        let fit = fit_ols(
            "collinear",
            &y,
            &[
                Regressor::new("x", x),
                Regressor::new("x2", twice),
                Regressor::constant(6),
            ],
        )
        .expect("pseudo-inverse handles rank deficiency");
        assert_eq!(fit.df_resid, 4);
        assert!((fit.fitted[5] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_observations_is_an_error() {
        let err = fit_ols(
            "tiny",
            &[1.0, 2.0],
            &[Regressor::new("x", vec![1.0, 2.0]), Regressor::constant(2)],
        )
        .expect_err("two points, two regressors");
        assert!(matches!(err, PipelineError::Regression { .. }));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = fit_ols("bad", &[1.0, 2.0, 3.0], &[Regressor::new("x", vec![1.0])])
            .expect_err("length mismatch");
        assert!(err.to_string().contains("\"x\""));
    }
}
