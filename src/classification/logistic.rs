use super::{sigmoid, validate_binary};
use crate::error::{AutoOdError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::ProbabilisticClassifier;
use serde::{Deserialize, Serialize};

/// Logistic Regression classifier for binary classification.
///
/// Minimizes `0.5 ||w||² + C Σ log-loss` with an unpenalised intercept.
/// Each iteration is a full Newton step, so the solver is deterministic and
/// typically converges in well under the iteration cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Model coefficients (weights)
    coefficients: Option<Vector<f32>>,
    /// Intercept (bias) term
    intercept: f32,
    /// Inverse regularization strength
    c: f32,
    /// Maximum number of Newton iterations
    max_iter: usize,
    /// Convergence tolerance on the largest parameter update
    tol: f32,
}

impl LogisticRegression {
    /// Creates a new logistic regression classifier with `C = 1`,
    /// `max_iter = 100` and `tol = 1e-4`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
        }
    }

    /// Sets the inverse regularization strength.
    #[must_use]
    pub fn with_c(mut self, c: f32) -> Self {
        self.c = c;
        self
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Get model coefficients (weights), one per input column.
    ///
    /// # Panics
    ///
    /// Panics if the model is not fitted.
    #[must_use]
    pub fn coefficients(&self) -> &Vector<f32> {
        self.coefficients.as_ref().expect("Model not fitted")
    }

    /// Get intercept (bias) term.
    #[must_use]
    pub fn intercept(&self) -> f32 {
        self.intercept
    }

    /// Returns true once `fit` has succeeded.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Predicts class labels (probability threshold 0.5).
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        Ok(self
            .predict_proba(x)?
            .iter()
            .map(|&p| usize::from(p > 0.5))
            .collect())
    }

    fn linear(coef: &[f64], intercept: f64, row: &[f32]) -> f64 {
        coef.iter()
            .zip(row)
            .map(|(&w, &v)| w * f64::from(v))
            .sum::<f64>()
            + intercept
    }

    /// Solves the Newton system, adding ridge to the diagonal when the
    /// Hessian is numerically indefinite.
    fn newton_direction(hessian: &Matrix<f64>, grad: &Vector<f64>) -> Result<Vector<f64>> {
        let mut ridge = 0.0_f64;
        for _ in 0..6 {
            let h = if ridge > 0.0 {
                hessian.add_diagonal(ridge)
            } else {
                hessian.clone()
            };
            if let Ok(step) = h.cholesky_solve(grad) {
                if step.iter().all(|v| v.is_finite()) {
                    return Ok(step);
                }
            }
            ridge = if ridge == 0.0 { 1e-6 } else { ridge * 100.0 };
        }
        Err(AutoOdError::SingularMatrix {
            context: "logistic regression Hessian".to_string(),
        })
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        validate_binary(x, y)?;
        let (n_samples, n_features) = x.shape();
        let c = f64::from(self.c);
        let dim = n_features + 1;

        let mut coef = vec![0.0_f64; n_features];
        let mut intercept = 0.0_f64;

        for _ in 0..self.max_iter {
            let mut grad = vec![0.0_f64; dim];
            let mut hess = vec![0.0_f64; dim * dim];

            for (i, &label) in y.iter().enumerate().take(n_samples) {
                let row = x.row_slice(i);
                let p = sigmoid(Self::linear(&coef, intercept, row));
                let err = p - label as f64;
                let w = (p * (1.0 - p)).max(1e-12);
                for a in 0..dim {
                    let xa = if a < n_features { f64::from(row[a]) } else { 1.0 };
                    grad[a] += c * err * xa;
                    for b in 0..=a {
                        let xb = if b < n_features { f64::from(row[b]) } else { 1.0 };
                        hess[a * dim + b] += c * w * xa * xb;
                    }
                }
            }

            // Penalty on the weights only.
            for (j, &w) in coef.iter().enumerate() {
                grad[j] += w;
                hess[j * dim + j] += 1.0;
            }
            for a in 0..dim {
                for b in 0..a {
                    hess[b * dim + a] = hess[a * dim + b];
                }
            }

            let hessian = Matrix::from_vec(dim, dim, hess)?;
            let step = Self::newton_direction(&hessian, &Vector::from_vec(grad))?;

            let mut max_update = 0.0_f64;
            for (j, w) in coef.iter_mut().enumerate() {
                *w -= step[j];
                max_update = max_update.max(step[j].abs());
            }
            intercept -= step[n_features];
            max_update = max_update.max(step[n_features].abs());

            if max_update < f64::from(self.tol) {
                break;
            }
        }

        self.coefficients = Some(Vector::from_vec(coef.iter().map(|&v| v as f32).collect()));
        self.intercept = intercept as f32;
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        let coef = self
            .coefficients
            .as_ref()
            .ok_or_else(|| AutoOdError::from("Model not fitted yet"))?;
        if x.n_cols() != coef.len() {
            return Err(AutoOdError::dimension_mismatch("features", coef.len(), x.n_cols()));
        }
        let coef: Vec<f64> = coef.iter().map(|&v| f64::from(v)).collect();
        let intercept = f64::from(self.intercept);

        Ok((0..x.n_rows())
            .map(|i| sigmoid(Self::linear(&coef, intercept, x.row_slice(i))) as f32)
            .collect())
    }
}
