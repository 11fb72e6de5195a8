//! Core traits for detectors, transformers and classifiers.
//!
//! These traits are the seams of the ensemble: the score-matrix builder only
//! sees [`OutlierDetector`], the co-training pair only sees
//! [`ProbabilisticClassifier`] and [`Transformer`].

use crate::error::Result;
use crate::primitives::Matrix;

/// An unsupervised outlier detector at one fixed hyperparameter setting.
///
/// Implementations return one real-valued score per instance where a higher
/// value means more anomalous. The ensemble treats the scores as opaque.
///
/// # Examples
///
/// ```
/// use autood::prelude::*;
/// use autood::detectors::KnnDistance;
///
/// let x = Matrix::from_vec(4, 1, vec![0.0, 0.1, 0.2, 5.0]).unwrap();
/// let scores = KnnDistance::new(2).score(&x).unwrap();
/// assert_eq!(scores.len(), 4);
/// assert!(scores[3] > scores[1]);
/// ```
pub trait OutlierDetector: Send + Sync {
    /// Human-readable name including the hyperparameter, e.g. `"LOF(k=10)"`.
    fn name(&self) -> String;

    /// Scores every row of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector cannot be evaluated on `x`
    /// (too few rows, singular covariance, ...).
    fn score(&self, x: &Matrix<f32>) -> Result<Vec<f32>>;
}

/// Trait for data transformers (scalers).
pub trait Transformer {
    /// Fits the transformer to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Transforms data using fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if transformer is not fitted.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// A binary classifier that outputs the probability of the positive
/// (outlier) class.
pub trait ProbabilisticClassifier {
    /// Fits on `x` with labels in {0, 1}.
    ///
    /// # Errors
    ///
    /// Returns an error on shape mismatch, empty input, or non-binary labels.
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()>;

    /// Probability of class 1 for every row of `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or `x` has the wrong width.
    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Vec<f32>>;
}
