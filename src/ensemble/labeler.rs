//! Pseudo-label selection.
//!
//! Instances on which every active vote agrees become training examples,
//! filtered and extended by the confident predictions of the previous
//! iteration.

use super::active::ActiveDetectorSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Confident predictions carried from one iteration to the next.
///
/// All three lists are sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceSets {
    /// Both classifiers above the high-confidence threshold.
    pub high_confidence_outliers: Vec<usize>,
    /// Both classifiers below the low-confidence threshold.
    pub high_confidence_inliers: Vec<usize>,
    /// The two classifiers disagree at 0.5.
    pub disagreements: Vec<usize>,
}

impl ConfidenceSets {
    /// Derives the sets from the two probability vectors.
    #[must_use]
    pub fn from_probabilities(p_a: &[f32], p_b: &[f32], high: f32, low: f32) -> Self {
        let mut sets = Self::default();
        for (i, (&a, &b)) in p_a.iter().zip(p_b).enumerate() {
            if a > high && b > high {
                sets.high_confidence_outliers.push(i);
            }
            if a < low && b < low {
                sets.high_confidence_inliers.push(i);
            }
            if (a > 0.5) != (b > 0.5) {
                sets.disagreements.push(i);
            }
        }
        sets
    }
}

/// Training set for one iteration: inliers labelled 0, outliers labelled 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PseudoLabelPartition {
    /// Sorted inlier indices.
    pub inliers: Vec<usize>,
    /// Sorted outlier indices, rescued ones included.
    pub outliers: Vec<usize>,
    /// Instances added by the self-agreement rescue.
    pub rescued: Vec<usize>,
}

impl PseudoLabelPartition {
    /// Inliers followed by outliers.
    #[must_use]
    pub fn training_indices(&self) -> Vec<usize> {
        self.inliers.iter().chain(&self.outliers).copied().collect()
    }

    /// Labels parallel to [`training_indices`](Self::training_indices).
    #[must_use]
    pub fn labels(&self) -> Vec<usize> {
        std::iter::repeat(0)
            .take(self.inliers.len())
            .chain(std::iter::repeat(1).take(self.outliers.len()))
            .collect()
    }

    /// Number of training examples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inliers.len() + self.outliers.len()
    }

    /// True if there are no training examples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True unless both classes are present.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.inliers.is_empty() || self.outliers.is_empty()
    }
}

/// Builds a [`PseudoLabelPartition`] from the vote matrix.
#[derive(Debug, Clone, Copy)]
pub struct PseudoLabeler {
    imbalance_ratio: f32,
    min_group_width: usize,
}

impl Default for PseudoLabeler {
    fn default() -> Self {
        Self::new(1000.0, 6)
    }
}

impl PseudoLabeler {
    /// Creates a labeler.
    ///
    /// The rescue rule fires when there are no outlier candidates or more
    /// than `imbalance_ratio` inliers per outlier, and only groups with more
    /// than `min_group_width` vote columns can rescue.
    #[must_use]
    pub fn new(imbalance_ratio: f32, min_group_width: usize) -> Self {
        Self {
            imbalance_ratio,
            min_group_width,
        }
    }

    /// Splits instances into pseudo-labelled inliers and outliers.
    #[must_use]
    pub fn partition(
        &self,
        active: &ActiveDetectorSet,
        confidence: &ConfidenceSets,
    ) -> PseudoLabelPartition {
        let votes = active.votes();
        let n_columns = votes.n_cols();
        let row_sums = votes.row_sums();

        let mut agree_inliers = BTreeSet::new();
        let mut agree_outliers = BTreeSet::new();
        let mut disagree = Vec::new();
        for (i, &sum) in row_sums.iter().enumerate() {
            if sum == 0 {
                agree_inliers.insert(i);
            }
            if sum == n_columns {
                agree_outliers.insert(i);
            }
            if sum != 0 && sum != n_columns {
                disagree.push(i);
            }
        }

        let hc_outliers: BTreeSet<usize> =
            confidence.high_confidence_outliers.iter().copied().collect();
        let hc_inliers: BTreeSet<usize> =
            confidence.high_confidence_inliers.iter().copied().collect();
        let disagreements: BTreeSet<usize> = confidence.disagreements.iter().copied().collect();

        let mut inliers: BTreeSet<usize> = agree_inliers.difference(&hc_outliers).copied().collect();
        if !hc_inliers.is_empty() {
            inliers = inliers.intersection(&hc_inliers).copied().collect();
        }
        let inliers: BTreeSet<usize> = inliers.difference(&disagreements).copied().collect();

        let mut outliers: BTreeSet<usize> = agree_outliers.union(&hc_outliers).copied().collect();

        let needs_rescue = outliers.is_empty()
            || inliers.len() as f32 / outliers.len() as f32 > self.imbalance_ratio;
        let rescued = if needs_rescue {
            self.rescue(active, &disagree)
        } else {
            Vec::new()
        };
        outliers.extend(rescued.iter().copied());
        let outliers: Vec<usize> = outliers.difference(&disagreements).copied().collect();

        PseudoLabelPartition {
            inliers: inliers.into_iter().collect(),
            outliers,
            rescued,
        }
    }

    /// Disagreeing instances that one wide method group votes outlier in
    /// every one of its columns.
    fn rescue(&self, active: &ActiveDetectorSet, disagree: &[usize]) -> Vec<usize> {
        let votes = active.votes();
        let mut rescued = BTreeSet::new();
        for group in active.groups() {
            let range = group.instance_range.clone();
            if range.len() <= self.min_group_width {
                continue;
            }
            for &i in disagree {
                let row = votes.row_slice(i);
                if row[range.clone()].iter().all(|&v| v == 1) {
                    rescued.insert(i);
                }
            }
        }
        if !rescued.is_empty() {
            tracing::debug!(count = rescued.len(), "Self-agreement rescue added outliers");
        }
        rescued.into_iter().collect()
    }
}

#[cfg(test)]
#[path = "labeler_tests.rs"]
mod tests;
