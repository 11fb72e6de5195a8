//! The detector columns still in play during a training round.

use super::matrix_builder::DetectorMatrix;
use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Column ranges of one method group inside an [`ActiveDetectorSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRanges {
    /// Method display name.
    pub name: String,
    /// Vote columns of the group.
    pub instance_range: Range<usize>,
    /// Score columns (one per hyperparameter) of the group.
    pub detector_range: Range<usize>,
}

/// Vote matrix `L`, score-space matrix `S` and their ranges.
///
/// A value of this type is never mutated. Pruning produces a new, smaller
/// set and the round boundary swaps back to the original one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDetectorSet {
    votes: Matrix<u8>,
    scores: Matrix<f32>,
    groups: Vec<GroupRanges>,
    n_fractions: usize,
    /// Original detector index of every score column.
    detector_ids: Vec<usize>,
}

impl ActiveDetectorSet {
    /// Takes the full vote matrix and, per group, the score columns of the
    /// first target fraction.
    ///
    /// # Errors
    ///
    /// Returns an error if the groups' ranges do not tile the matrix.
    pub fn from_matrix(matrix: &DetectorMatrix) -> Result<Self> {
        let n_fractions = matrix.fractions.len();
        let mut score_columns = Vec::with_capacity(matrix.n_detectors());
        let mut groups = Vec::with_capacity(matrix.groups.len());

        for group in &matrix.groups {
            let width = group.detector_width();
            if group.instance_width() != width * n_fractions {
                return Err(AutoOdError::InvariantViolation {
                    message: format!(
                        "group {} has {} vote columns, expected {} x {}",
                        group.name,
                        group.instance_width(),
                        width,
                        n_fractions
                    ),
                });
            }
            let start = group.instance_range.start;
            score_columns.extend(start..start + width);
            groups.push(GroupRanges {
                name: group.name.clone(),
                instance_range: group.instance_range.clone(),
                detector_range: group.detector_range.clone(),
            });
        }

        Ok(Self {
            votes: matrix.votes.clone(),
            scores: matrix.scores.select_columns(&score_columns),
            groups,
            n_fractions,
            detector_ids: (0..score_columns.len()).collect(),
        })
    }

    /// Vote matrix `L` (N × M).
    #[must_use]
    pub fn votes(&self) -> &Matrix<u8> {
        &self.votes
    }

    /// Score-space matrix `S` (N × K).
    #[must_use]
    pub fn scores(&self) -> &Matrix<f32> {
        &self.scores
    }

    /// Ranges per method group.
    #[must_use]
    pub fn groups(&self) -> &[GroupRanges] {
        &self.groups
    }

    /// Number of target fractions.
    #[must_use]
    pub fn n_fractions(&self) -> usize {
        self.n_fractions
    }

    /// Number of vote columns (M).
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.votes.n_cols()
    }

    /// Number of score columns (K).
    #[must_use]
    pub fn n_detectors(&self) -> usize {
        self.scores.n_cols()
    }

    /// Original indices of the surviving detectors.
    #[must_use]
    pub fn detector_ids(&self) -> &[usize] {
        &self.detector_ids
    }

    /// Largest `detector_range` end; 0 when there are no groups.
    #[must_use]
    pub fn max_detector_end(&self) -> usize {
        self.groups
            .iter()
            .map(|g| g.detector_range.end)
            .max()
            .unwrap_or(0)
    }

    /// True if both sets have the same shapes and ranges.
    #[must_use]
    pub fn same_layout(&self, other: &Self) -> bool {
        self.votes.shape() == other.votes.shape()
            && self.scores.shape() == other.scores.shape()
            && self.groups == other.groups
            && self.n_fractions == other.n_fractions
    }

    /// Keeps the detectors whose mask entry is true.
    ///
    /// Each kept detector keeps its vote column in every fraction block.
    /// Ranges are rebuilt contiguously in group order, and a group may end
    /// up empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the mask length differs from the detector count
    /// or the mask keeps nothing.
    pub fn prune(&self, keep: &[bool]) -> Result<Self> {
        if keep.len() != self.n_detectors() {
            return Err(AutoOdError::dimension_mismatch(
                "pruning mask",
                self.n_detectors(),
                keep.len(),
            ));
        }
        if !keep.iter().any(|&k| k) {
            return Err(AutoOdError::InvariantViolation {
                message: "pruning mask removes every detector".to_string(),
            });
        }

        let mut vote_columns = Vec::new();
        let mut groups = Vec::with_capacity(self.groups.len());
        let mut kept_total = 0;

        for group in &self.groups {
            let width = group.detector_range.len();
            let saved: Vec<usize> = (0..width)
                .filter(|&p| keep[group.detector_range.start + p])
                .collect();
            for block in 0..self.n_fractions {
                vote_columns.extend(
                    saved
                        .iter()
                        .map(|&p| group.instance_range.start + block * width + p),
                );
            }

            let kept = saved.len();
            groups.push(GroupRanges {
                name: group.name.clone(),
                instance_range: kept_total * self.n_fractions..(kept_total + kept) * self.n_fractions,
                detector_range: kept_total..kept_total + kept,
            });
            kept_total += kept;
        }

        let score_columns: Vec<usize> = (0..keep.len()).filter(|&i| keep[i]).collect();
        Ok(Self {
            votes: self.votes.select_columns(&vote_columns),
            scores: self.scores.select_columns(&score_columns),
            groups,
            n_fractions: self.n_fractions,
            detector_ids: score_columns.iter().map(|&i| self.detector_ids[i]).collect(),
        })
    }
}

#[cfg(test)]
#[path = "active_tests.rs"]
mod tests;
