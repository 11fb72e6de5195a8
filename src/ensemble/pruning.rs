//! Detector pruning from score-space coefficients.

use super::active::ActiveDetectorSet;
use super::cotrain::{ClassifierPair, CoTrainingOutput};
use crate::error::Result;
use crate::stats;
use crate::traits::ProbabilisticClassifier;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which gate decides whether coefficients are informative enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruningGate {
    /// First round: any non-constant coefficient vector.
    Exploration,
    /// Second round: also requires more than two detectors or a
    /// max/min coefficient ratio of at least 1.1.
    Refinement,
}

/// Result of one pruning decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PruneOutcome {
    /// Fewer than two detectors in every group's numbering.
    NotApplicable,
    /// The gate rejected the coefficients.
    GateClosed,
    /// The mask would have removed every detector.
    NothingKept,
    /// Detectors were removed; holds their original indices.
    Pruned {
        /// Original indices of the removed detectors.
        removed: Vec<usize>,
    },
}

/// Coefficient-driven detector pruning.
#[derive(Debug, Clone, Copy)]
pub struct PruningEngine {
    pair: ClassifierPair,
}

impl PruningEngine {
    /// Creates an engine that refits score models the way `pair` does.
    #[must_use]
    pub fn new(pair: ClassifierPair) -> Self {
        Self { pair }
    }

    /// Coefficients used to rank detectors.
    ///
    /// With confident outliers and inliers available, a fresh score model
    /// fitted on just those rows; otherwise classifier A's coefficients.
    ///
    /// # Errors
    ///
    /// Returns an error if the refit fails.
    pub fn combined_coefficients(&self, output: &CoTrainingOutput) -> Result<Vec<f32>> {
        let confidence = &output.confidence;
        if confidence.high_confidence_outliers.is_empty()
            || confidence.high_confidence_inliers.is_empty()
        {
            return Ok(output.score_model.coefficients().as_slice().to_vec());
        }

        let rows: Vec<usize> = confidence
            .high_confidence_outliers
            .iter()
            .chain(&confidence.high_confidence_inliers)
            .copied()
            .collect();
        let labels: Vec<usize> = std::iter::repeat(1)
            .take(confidence.high_confidence_outliers.len())
            .chain(std::iter::repeat(0).take(confidence.high_confidence_inliers.len()))
            .collect();

        let mut model = self.pair.score_model();
        model.fit(&output.scaled_scores.select_rows(&rows), &labels)?;
        Ok(model.coefficients().as_slice().to_vec())
    }

    /// Whether `coef` passes the gate for a set whose largest detector
    /// range end is `max_end`.
    #[must_use]
    pub fn gate_open(gate: PruningGate, coef: &[f32], max_end: usize) -> bool {
        let non_constant = coef.windows(2).any(|w| w[0] != w[1]);
        if max_end < 2 || !non_constant {
            return false;
        }
        match gate {
            PruningGate::Exploration => true,
            PruningGate::Refinement => {
                let max = coef.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let min = coef.iter().copied().fold(f32::INFINITY, f32::min);
                max_end > 2 || max / min >= 1.1
            }
        }
    }

    /// `max(max(0, mean - std), min)` of the coefficients.
    #[must_use]
    pub fn cutoff(coef: &[f32]) -> f32 {
        let min = coef.iter().copied().fold(f32::INFINITY, f32::min);
        (stats::mean(coef) - stats::std(coef)).max(0.0).max(min)
    }

    /// Detectors whose coefficient is strictly above the cutoff.
    #[must_use]
    pub fn keep_mask(coef: &[f32]) -> Vec<bool> {
        let cutoff = Self::cutoff(coef);
        coef.iter().map(|&c| c > cutoff).collect()
    }

    /// Runs one pruning decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the coefficient refit fails.
    pub fn apply(
        &self,
        active: ActiveDetectorSet,
        output: &CoTrainingOutput,
        gate: PruningGate,
    ) -> Result<(ActiveDetectorSet, PruneOutcome)> {
        let max_end = active.max_detector_end();
        if max_end < 2 {
            return Ok((active, PruneOutcome::NotApplicable));
        }

        let coef = self.combined_coefficients(output)?;
        if !Self::gate_open(gate, &coef, max_end) {
            debug!(?gate, "Pruning gate closed");
            return Ok((active, PruneOutcome::GateClosed));
        }

        let keep = Self::keep_mask(&coef);
        if !keep.iter().any(|&k| k) {
            debug!("Pruning mask keeps no detector, skipping");
            return Ok((active, PruneOutcome::NothingKept));
        }

        let removed: Vec<usize> = active
            .detector_ids()
            .iter()
            .zip(&keep)
            .filter(|(_, &k)| !k)
            .map(|(&id, _)| id)
            .collect();
        let pruned = active.prune(&keep)?;
        info!(
            removed = ?removed,
            remaining = pruned.n_detectors(),
            detector_ranges = ?pruned.groups().iter().map(|g| g.detector_range.clone()).collect::<Vec<_>>(),
            "Pruned detectors"
        );
        Ok((pruned, PruneOutcome::Pruned { removed }))
    }
}

#[cfg(test)]
#[path = "pruning_tests.rs"]
mod tests;
