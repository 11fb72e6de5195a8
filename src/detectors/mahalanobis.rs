use crate::error::{AutoOdError, Result};
use crate::primitives::{Matrix, Vector};
use crate::stats::cov_matrix;
use crate::traits::OutlierDetector;

/// Squared Mahalanobis distance of each row to the column means.
///
/// A singular covariance is regularised with a growing diagonal ridge,
/// relative to the mean variance, before giving up.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mahalanobis;

const RIDGES: [f32; 5] = [0.0, 1e-6, 1e-4, 1e-2, 1.0];

impl Mahalanobis {
    /// Creates the detector.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Inverse covariance, one column per unit-vector solve.
    fn precision(cov: &Matrix<f32>) -> Result<Matrix<f32>> {
        let d = cov.n_rows();
        let mean_var = (0..d).map(|j| cov.get(j, j)).sum::<f32>() / d as f32;
        let base = if mean_var > 0.0 { mean_var } else { 1.0 };

        for ridge in RIDGES {
            let regularised = if ridge > 0.0 {
                cov.add_diagonal(ridge * base)
            } else {
                cov.clone()
            };
            if let Ok(columns) = Self::invert(&regularised) {
                let precision = Matrix::from_columns(d, &columns)?;
                if Self::residual(&regularised, &precision) < 1e-2 {
                    if ridge > 0.0 {
                        tracing::debug!(ridge, "Mahalanobis covariance regularised");
                    }
                    return Ok(precision);
                }
            }
        }

        Err(AutoOdError::SingularMatrix {
            context: "Mahalanobis covariance".to_string(),
        })
    }

    /// Largest deviation of `cov · precision` from the identity.
    fn residual(cov: &Matrix<f32>, precision: &Matrix<f32>) -> f32 {
        let d = cov.n_rows();
        let mut worst = 0.0_f32;
        for i in 0..d {
            for j in 0..d {
                let product: f32 = (0..d).map(|k| cov.get(i, k) * precision.get(k, j)).sum();
                let target = if i == j { 1.0 } else { 0.0 };
                let err = (product - target).abs();
                if !err.is_finite() {
                    return f32::INFINITY;
                }
                worst = worst.max(err);
            }
        }
        worst
    }

    fn invert(cov: &Matrix<f32>) -> Result<Vec<Vec<f32>>> {
        let d = cov.n_rows();
        (0..d)
            .map(|j| {
                let mut unit = vec![0.0; d];
                unit[j] = 1.0;
                let column = cov.cholesky_solve(&Vector::from_vec(unit))?;
                if column.iter().all(|v| v.is_finite()) {
                    Ok(column.into_vec())
                } else {
                    Err(AutoOdError::SingularMatrix {
                        context: "Mahalanobis covariance".to_string(),
                    })
                }
            })
            .collect()
    }
}

impl OutlierDetector for Mahalanobis {
    fn name(&self) -> String {
        "Mahalanobis".to_string()
    }

    fn score(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 || n_features == 0 {
            return Err(AutoOdError::empty_input("Mahalanobis"));
        }

        let (cov, means) = cov_matrix(x)?;
        let precision = Self::precision(&cov)?;

        Ok((0..n_samples)
            .map(|i| {
                let centered: Vec<f32> = x
                    .row_slice(i)
                    .iter()
                    .zip(&means)
                    .map(|(&v, &m)| v - m)
                    .collect();
                let mut total = 0.0;
                for a in 0..n_features {
                    let mut row_sum = 0.0;
                    for b in 0..n_features {
                        row_sum += precision.get(a, b) * centered[b];
                    }
                    total += centered[a] * row_sum;
                }
                total
            })
            .collect())
    }
}
