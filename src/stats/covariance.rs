//! Covariance and correlation computations.
//!
//! ```text
//! Cov(X, Y) = (1/n) Σ (x_i - x̄)(y_i - ȳ)
//! ρ(X, Y)   = Cov(X, Y) / (σ_X σ_Y)
//! ```
//!
//! # Examples
//!
//! ```
//! use autood::stats::pearson;
//!
//! let x = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let y = [2.0, 4.0, 6.0, 8.0, 10.0];
//!
//! let correlation = pearson(&x, &y).expect("correlation should compute");
//! assert!((correlation - 1.0).abs() < 1e-6);
//! ```

use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;

/// Computes the covariance matrix for a data matrix.
///
/// # Arguments
///
/// * `data` - Data matrix (n × p), where n is samples and p is features
///
/// # Returns
///
/// Covariance matrix (p × p) where entry (i, j) is `Cov(feature_i, feature_j)`,
/// together with the per-feature means used to center the data.
///
/// # Errors
///
/// Returns error if data is empty.
pub fn cov_matrix(data: &Matrix<f32>) -> Result<(Matrix<f32>, Vec<f32>)> {
    let n = data.n_rows();
    let p = data.n_cols();

    if n == 0 || p == 0 {
        return Err(AutoOdError::empty_input("covariance matrix"));
    }

    let means: Vec<f32> = (0..p)
        .map(|j| (0..n).map(|i| data.get(i, j)).sum::<f32>() / n as f32)
        .collect();

    let mut cov_data = vec![0.0_f32; p * p];
    for i in 0..p {
        for j in 0..=i {
            let mut cov_sum = 0.0;
            for k in 0..n {
                cov_sum += (data.get(k, i) - means[i]) * (data.get(k, j) - means[j]);
            }
            let cov_val = cov_sum / n as f32;

            cov_data[i * p + j] = cov_val;
            cov_data[j * p + i] = cov_val;
        }
    }

    let cov = Matrix::from_vec(p, p, cov_data)
        .map_err(|e| AutoOdError::Other(format!("Failed to create covariance matrix: {e}")))?;
    Ok((cov, means))
}

/// Computes the Pearson correlation coefficient between two slices.
///
/// # Errors
///
/// Returns error if the slices have different lengths, are empty, or either
/// side has zero variance.
pub fn pearson(x: &[f32], y: &[f32]) -> Result<f32> {
    corr(x, y)?.ok_or_else(|| "Cannot compute correlation when variance is zero".into())
}

/// Pearson correlation that reports zero variance as `Ok(None)`.
///
/// # Errors
///
/// Returns error if the slices have different lengths or are empty.
pub fn corr(x: &[f32], y: &[f32]) -> Result<Option<f32>> {
    let n = x.len();

    if n != y.len() {
        return Err(AutoOdError::DimensionMismatch {
            expected: format!("{n} values in x"),
            actual: format!("{} values in y", y.len()),
        });
    }

    if n == 0 {
        return Err(AutoOdError::empty_input("correlation"));
    }

    let x_mean = x.iter().sum::<f32>() / n as f32;
    let y_mean = y.iter().sum::<f32>() / n as f32;

    let mut cov_sum = 0.0;
    let mut x_var_sum = 0.0;
    let mut y_var_sum = 0.0;

    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let x_diff = xi - x_mean;
        let y_diff = yi - y_mean;
        cov_sum += x_diff * y_diff;
        x_var_sum += x_diff * x_diff;
        y_var_sum += y_diff * y_diff;
    }

    let x_std = (x_var_sum / n as f32).sqrt();
    let y_std = (y_var_sum / n as f32).sqrt();

    if x_std < 1e-10 || y_std < 1e-10 {
        return Ok(None);
    }

    let covariance = cov_sum / n as f32;
    Ok(Some(covariance / (x_std * y_std)))
}
