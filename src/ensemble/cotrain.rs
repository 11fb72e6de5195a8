//! The two-view classifier pair.
//!
//! Classifier A sees the robust-scaled detector scores, classifier B the
//! robust-scaled raw features. Both learn from the same pseudo-labels and
//! their joint confidence feeds the next iteration.

use super::labeler::{ConfidenceSets, PseudoLabelPartition};
use crate::classification::{LogisticRegression, Svc};
use crate::error::{AutoOdError, Result};
use crate::preprocessing::RobustScaler;
use crate::primitives::Matrix;
use crate::stats;
use crate::traits::{ProbabilisticClassifier, Transformer};

/// Fitted pair and what it predicts for every instance.
#[derive(Debug, Clone)]
pub struct CoTrainingOutput {
    /// Score-space model (classifier A).
    pub score_model: LogisticRegression,
    /// Robust-scaled score matrix classifier A was trained on.
    pub scaled_scores: Matrix<f32>,
    /// `P_A`: outlier probability from the scores.
    pub score_probabilities: Vec<f32>,
    /// `P_B`: outlier probability from the features.
    pub feature_probabilities: Vec<f32>,
    /// Confidence sets for the next iteration.
    pub confidence: ConfidenceSets,
    /// Pearson correlation of `P_A` and `P_B`; `None` if either is constant.
    pub correlation: Option<f32>,
}

impl CoTrainingOutput {
    /// `P_B > 0.5` as 0/1 labels.
    #[must_use]
    pub fn predictions(&self) -> Vec<usize> {
        self.feature_probabilities
            .iter()
            .map(|&p| usize::from(p > 0.5))
            .collect()
    }
}

/// Settings shared by both classifiers of the pair.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierPair {
    high_confidence: f32,
    low_confidence: f32,
    logistic_max_iter: usize,
    seed: u64,
}

impl ClassifierPair {
    /// Creates a pair with the given confidence thresholds, logistic
    /// iteration cap and SVC seed.
    #[must_use]
    pub fn new(high_confidence: f32, low_confidence: f32, logistic_max_iter: usize, seed: u64) -> Self {
        Self {
            high_confidence,
            low_confidence,
            logistic_max_iter,
            seed,
        }
    }

    /// A fresh score-space model with the configured iteration cap.
    #[must_use]
    pub fn score_model(&self) -> LogisticRegression {
        LogisticRegression::new().with_max_iter(self.logistic_max_iter)
    }

    /// Fits both classifiers on the partition and predicts all rows.
    ///
    /// `features` must already be robust-scaled; the scores are scaled here
    /// because their columns change as detectors are pruned.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition lacks a class or a fit fails.
    pub fn fit(
        &self,
        scores: &Matrix<f32>,
        features: &Matrix<f32>,
        partition: &PseudoLabelPartition,
    ) -> Result<CoTrainingOutput> {
        if partition.is_degenerate() {
            return Err(AutoOdError::from(
                "Pseudo-label partition needs both inliers and outliers",
            ));
        }
        if scores.n_rows() != features.n_rows() {
            return Err(AutoOdError::dimension_mismatch(
                "feature rows",
                scores.n_rows(),
                features.n_rows(),
            ));
        }

        let scaled_scores = RobustScaler::new().fit_transform(scores)?;
        let indices = partition.training_indices();
        let labels = partition.labels();

        let (score_side, feature_side) = rayon::join(
            || -> Result<(LogisticRegression, Vec<f32>)> {
                let mut model = self.score_model();
                model.fit(&scaled_scores.select_rows(&indices), &labels)?;
                let probabilities = model.predict_proba(&scaled_scores)?;
                Ok((model, probabilities))
            },
            || -> Result<Vec<f32>> {
                let mut model = Svc::new(self.seed);
                model.fit(&features.select_rows(&indices), &labels)?;
                model.predict_proba(features)
            },
        );
        let (score_model, score_probabilities) = score_side?;
        let feature_probabilities = feature_side?;

        let confidence = ConfidenceSets::from_probabilities(
            &score_probabilities,
            &feature_probabilities,
            self.high_confidence,
            self.low_confidence,
        );
        let correlation = stats::corr(&score_probabilities, &feature_probabilities)?;

        Ok(CoTrainingOutput {
            score_model,
            scaled_scores,
            score_probabilities,
            feature_probabilities,
            confidence,
            correlation,
        })
    }
}

#[cfg(test)]
#[path = "cotrain_tests.rs"]
mod tests;
