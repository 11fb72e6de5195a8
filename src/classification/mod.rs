//! Classification algorithms.
//!
//! This module implements the two binary classifiers used by the co-training
//! pair:
//! - [`LogisticRegression`]: L2-penalised logistic regression fitted with
//!   Newton's method (IRLS)
//! - [`Svc`]: RBF-kernel support vector classifier trained with SMO, with
//!   Platt-scaled probabilities
//!
//! # Example
//!
//! ```
//! use autood::classification::LogisticRegression;
//! use autood::prelude::*;
//!
//! let x = Matrix::from_vec(4, 1, vec![-2.0, -1.0, 1.0, 2.0])
//!     .expect("Matrix dimensions match data length");
//! let y = vec![0, 0, 1, 1];
//!
//! let mut model = LogisticRegression::new().with_max_iter(200);
//! model.fit(&x, &y).expect("Training data is valid with 4 samples");
//! let probas = model.predict_proba(&x).expect("fitted");
//!
//! assert!(probas[0] < 0.5 && probas[3] > 0.5);
//! ```

mod logistic;
mod svc;

pub use logistic::LogisticRegression;
pub use svc::Svc;

use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;

/// Shared input validation for the binary classifiers.
///
/// Returns the number of positive labels.
pub(crate) fn validate_binary(x: &Matrix<f32>, y: &[usize]) -> Result<usize> {
    let n_samples = x.n_rows();
    if n_samples != y.len() {
        return Err(AutoOdError::dimension_mismatch("labels", n_samples, y.len()));
    }
    if n_samples == 0 {
        return Err("Cannot fit with zero samples".into());
    }
    if y.iter().any(|&label| label > 1) {
        return Err("Labels must be 0 or 1 for binary classification".into());
    }
    let n_pos = y.iter().filter(|&&label| label == 1).count();
    if n_pos == 0 || n_pos == n_samples {
        return Err("Training data needs samples of both classes".into());
    }
    Ok(n_pos)
}

/// Numerically stable logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests;
