//! Evaluation metrics for binary outlier labels.
//!
//! Label `1` is the positive (outlier) class.
//!
//! # Examples
//!
//! ```
//! use autood::metrics::f1_score;
//!
//! let y_true = [0, 1, 1, 0];
//! let y_pred = [0, 1, 0, 0];
//! let f1 = f1_score(&y_true, &y_pred).expect("same length");
//! assert!((f1 - 2.0 / 3.0).abs() < 1e-6);
//! ```

use crate::error::{AutoOdError, Result};

/// Counts of a binary confusion matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryCounts {
    /// Predicted 1, actually 1.
    pub true_positives: usize,
    /// Predicted 1, actually 0.
    pub false_positives: usize,
    /// Predicted 0, actually 1.
    pub false_negatives: usize,
    /// Predicted 0, actually 0.
    pub true_negatives: usize,
}

impl BinaryCounts {
    /// Tallies predictions against ground truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the slices differ in length.
    pub fn from_labels(y_true: &[usize], y_pred: &[usize]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(AutoOdError::dimension_mismatch(
                "predictions",
                y_true.len(),
                y_pred.len(),
            ));
        }

        let mut counts = Self::default();
        for (&truth, &pred) in y_true.iter().zip(y_pred) {
            match (truth == 1, pred == 1) {
                (true, true) => counts.true_positives += 1,
                (false, true) => counts.false_positives += 1,
                (true, false) => counts.false_negatives += 1,
                (false, false) => counts.true_negatives += 1,
            }
        }
        Ok(counts)
    }

    /// TP / (TP + FP), or 0 with no positive predictions.
    #[must_use]
    pub fn precision(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// TP / (TP + FN), or 0 with no actual positives.
    #[must_use]
    pub fn recall(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Harmonic mean of precision and recall.
    #[must_use]
    pub fn f1(&self) -> f32 {
        let denom = 2 * self.true_positives + self.false_positives + self.false_negatives;
        ratio(2 * self.true_positives, denom)
    }
}

fn ratio(num: usize, denom: usize) -> f32 {
    if denom == 0 {
        0.0
    } else {
        num as f32 / denom as f32
    }
}

/// F1 score of the outlier class.
///
/// Returns 0 when precision and recall are both 0.
///
/// # Errors
///
/// Returns an error if the slices differ in length.
pub fn f1_score(y_true: &[usize], y_pred: &[usize]) -> Result<f32> {
    Ok(BinaryCounts::from_labels(y_true, y_pred)?.f1())
}

/// Fraction of matching labels.
///
/// # Errors
///
/// Returns an error if the slices differ in length or are empty.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> Result<f32> {
    if y_true.is_empty() {
        return Err(AutoOdError::empty_input("accuracy"));
    }
    let counts = BinaryCounts::from_labels(y_true, y_pred)?;
    Ok(ratio(counts.true_positives + counts.true_negatives, y_true.len()))
}
