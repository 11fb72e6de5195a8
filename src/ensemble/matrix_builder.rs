//! Detector score matrix.
//!
//! Runs every configured detector sweep and thresholds each score vector at
//! every target outlier fraction. Columns of a method group are laid out
//! fraction-major: column `start + j * H + h` holds hyperparameter `h` at
//! fraction `j`, where `H` is the group's hyperparameter count.

use crate::config::AutoOdParameters;
use crate::error::{AutoOdError, Result};
use crate::metrics::f1_score;
use crate::primitives::Matrix;
use crate::traits::OutlierDetector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::info;

/// Number of instances voted outlier for a target fraction.
#[must_use]
pub fn target_count(fraction: f32, n_samples: usize) -> usize {
    (f64::from(fraction) * n_samples as f64).round() as usize
}

/// Votes 1 for every score strictly above the (k+1)-th largest score.
///
/// Ties at the threshold are all voted 0, so fewer than `k` instances can be
/// flagged. `k = 0` flags nothing and `k >= N` flags everything.
///
/// ```
/// use autood::ensemble::threshold_votes;
///
/// assert_eq!(threshold_votes(&[0.1, 0.9, 0.5, 0.7], 2), vec![0, 1, 0, 1]);
/// assert_eq!(threshold_votes(&[1.0, 1.0, 0.0], 1), vec![0, 0, 0]);
/// ```
#[must_use]
pub fn threshold_votes(scores: &[f32], k: usize) -> Vec<u8> {
    if k >= scores.len() {
        return vec![1; scores.len()];
    }
    let mut sorted = scores.to_vec();
    sorted.sort_unstable_by(|a, b| b.total_cmp(a));
    let threshold = sorted[k];
    scores.iter().map(|&s| u8::from(s > threshold)).collect()
}

/// One method's block of columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodGroup {
    /// Display name of the method, e.g. `"LOF"`.
    pub name: String,
    /// Columns of the vote matrix, all hyperparameters × fractions.
    pub instance_range: Range<usize>,
    /// Columns in hyperparameter-only numbering.
    pub detector_range: Range<usize>,
    /// Best F1 over the group's columns, when labels were supplied.
    pub best_f1: Option<f32>,
}

impl MethodGroup {
    /// Number of hyperparameter values.
    #[must_use]
    pub fn detector_width(&self) -> usize {
        self.detector_range.len()
    }

    /// Number of vote columns.
    #[must_use]
    pub fn instance_width(&self) -> usize {
        self.instance_range.len()
    }
}

/// Output of the builder: vote and score matrices with range bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorMatrix {
    /// Binary votes, N × M.
    pub votes: Matrix<u8>,
    /// Raw scores parallel to `votes`, N × M.
    pub scores: Matrix<f32>,
    /// Method groups in column order.
    pub groups: Vec<MethodGroup>,
    /// Target fractions, ascending.
    pub fractions: Vec<f32>,
    /// `"<detector> @ <fraction>"` for each column.
    pub column_names: Vec<String>,
}

impl DetectorMatrix {
    /// Number of instances.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.votes.n_rows()
    }

    /// Number of vote columns (M).
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.votes.n_cols()
    }

    /// Number of hyperparameter-level detectors (K).
    #[must_use]
    pub fn n_detectors(&self) -> usize {
        self.groups.iter().map(MethodGroup::detector_width).sum()
    }

    /// Best single-method F1 and the methods reaching it.
    ///
    /// Returns `None` when no labels were supplied.
    #[must_use]
    pub fn best_unsupervised(&self) -> Option<(f32, Vec<String>)> {
        let best = self
            .groups
            .iter()
            .filter_map(|g| g.best_f1)
            .fold(None, |acc: Option<f32>, f| Some(acc.map_or(f, |a| a.max(f))))?;
        let methods = self
            .groups
            .iter()
            .filter(|g| g.best_f1.is_some_and(|f| f >= best))
            .map(|g| g.name.clone())
            .collect();
        Some((best, methods))
    }
}

/// Scores for one method: one vector per hyperparameter value.
#[derive(Debug, Clone)]
pub struct GroupScores {
    /// Method display name.
    pub name: String,
    /// Detector names, parallel to `scores`.
    pub detector_names: Vec<String>,
    /// Score vectors, each of length N.
    pub scores: Vec<Vec<f32>>,
}

/// Builds a [`DetectorMatrix`] from the configured sweeps.
#[derive(Debug, Clone)]
pub struct ScoreMatrixBuilder {
    params: AutoOdParameters,
}

impl ScoreMatrixBuilder {
    /// Creates a builder for the given parameters.
    #[must_use]
    pub fn new(params: AutoOdParameters) -> Self {
        Self { params }
    }

    /// Runs every detector on `x` and assembles the matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if a detector fails, if `x` is empty, or if the label
    /// count does not match.
    pub fn build(&self, x: &Matrix<f32>, labels: Option<&[usize]>) -> Result<DetectorMatrix> {
        if x.n_rows() == 0 {
            return Err(AutoOdError::empty_input("detector sweep"));
        }

        let mut groups = Vec::with_capacity(self.params.methods.len());
        for method in &self.params.methods {
            let detectors = method.detectors(&self.params);
            let names: Vec<String> = detectors.iter().map(|d| d.name()).collect();
            info!(method = %method, detectors = ?names, "Start running detector sweep");
            groups.push(GroupScores {
                name: method.to_string(),
                detector_names: names,
                scores: run_sweep(&detectors, x)?,
            });
        }

        Self::assemble(groups, &self.params.n_range, labels)
    }

    /// Thresholds precomputed score vectors into a matrix.
    ///
    /// Fractions are sorted ascending before use.
    ///
    /// # Errors
    ///
    /// Returns an error if a group is empty, score vectors differ in length,
    /// or the label count does not match.
    pub fn assemble(
        groups: Vec<GroupScores>,
        fractions: &[f32],
        labels: Option<&[usize]>,
    ) -> Result<DetectorMatrix> {
        let n = groups
            .first()
            .and_then(|g| g.scores.first())
            .map(Vec::len)
            .ok_or_else(|| AutoOdError::empty_input("score matrix"))?;
        if fractions.is_empty() {
            return Err(AutoOdError::empty_input("target fractions"));
        }
        if let Some(y) = labels {
            if y.len() != n {
                return Err(AutoOdError::dimension_mismatch("labels", n, y.len()));
            }
        }

        let mut fractions = fractions.to_vec();
        fractions.sort_by(f32::total_cmp);
        let counts: Vec<usize> = fractions.iter().map(|&f| target_count(f, n)).collect();

        let mut vote_columns: Vec<Vec<u8>> = Vec::new();
        let mut score_columns: Vec<Vec<f32>> = Vec::new();
        let mut column_names = Vec::new();
        let mut method_groups = Vec::with_capacity(groups.len());
        let mut n_detectors = 0;

        for group in groups {
            if group.scores.is_empty() {
                return Err(AutoOdError::empty_input("detector group"));
            }
            if let Some(bad) = group.scores.iter().find(|s| s.len() != n) {
                return Err(AutoOdError::dimension_mismatch("detector scores", n, bad.len()));
            }

            let start = vote_columns.len();
            let mut best_f1: Option<f32> = None;
            for (&fraction, &k) in fractions.iter().zip(&counts) {
                for (h, scores) in group.scores.iter().enumerate() {
                    let votes = threshold_votes(scores, k);
                    if let Some(y) = labels {
                        let f1 = f1_score(y, &to_labels(&votes))?;
                        best_f1 = Some(best_f1.map_or(f1, |b| b.max(f1)));
                    }
                    let detector = group
                        .detector_names
                        .get(h)
                        .cloned()
                        .unwrap_or_else(|| format!("{}[{h}]", group.name));
                    column_names.push(format!("{detector} @ {fraction}"));
                    vote_columns.push(votes);
                    score_columns.push(scores.clone());
                }
            }

            let width = group.scores.len();
            if let Some(f1) = best_f1 {
                info!(method = %group.name, f1, "Best F-1 for method");
            }
            method_groups.push(MethodGroup {
                name: group.name,
                instance_range: start..vote_columns.len(),
                detector_range: n_detectors..n_detectors + width,
                best_f1,
            });
            n_detectors += width;
        }

        info!(
            instance_ranges = ?method_groups.iter().map(|g| g.instance_range.clone()).collect::<Vec<_>>(),
            detector_ranges = ?method_groups.iter().map(|g| g.detector_range.clone()).collect::<Vec<_>>(),
            "Detector matrix assembled"
        );

        Ok(DetectorMatrix {
            votes: Matrix::from_columns(n, &vote_columns)?,
            scores: Matrix::from_columns(n, &score_columns)?,
            groups: method_groups,
            fractions,
            column_names,
        })
    }
}

/// Scores `x` with every detector, in parallel.
fn run_sweep(detectors: &[Box<dyn OutlierDetector>], x: &Matrix<f32>) -> Result<Vec<Vec<f32>>> {
    detectors
        .par_iter()
        .map(|detector| {
            let scores = detector.score(x)?;
            if scores.len() != x.n_rows() {
                return Err(AutoOdError::dimension_mismatch(
                    "detector scores",
                    x.n_rows(),
                    scores.len(),
                ));
            }
            Ok(scores)
        })
        .collect()
}

pub(crate) fn to_labels(votes: &[u8]) -> Vec<usize> {
    votes.iter().map(|&v| usize::from(v)).collect()
}

#[cfg(test)]
#[path = "matrix_builder_tests.rs"]
mod tests;
