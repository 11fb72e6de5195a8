//! Run configuration.
//!
//! [`AutoOdParameters`] collects the detector sweeps and the training-loop
//! constants. It serialises to JSON, so a run can be described in a file:
//!
//! ```
//! use autood::config::AutoOdParameters;
//!
//! let params: AutoOdParameters =
//!     serde_json::from_str(r#"{ "methods": ["knn"], "k_range": [5] }"#)
//!         .expect("valid JSON");
//! assert_eq!(params.k_range, vec![5]);
//! // Unspecified fields keep their defaults.
//! assert_eq!(params.max_iterations, 50);
//! params.validate().expect("valid parameters");
//! ```

use crate::detectors::DetectionMethod;
use crate::error::{AutoOdError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of one AutoOD run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoOdParameters {
    /// Detector families to sweep, in this order.
    pub methods: Vec<DetectionMethod>,
    /// Neighbour counts for LOF and KNN.
    pub k_range: Vec<usize>,
    /// Isolation Forest feature fractions.
    pub if_range: Vec<f32>,
    /// Target outlier fractions of N.
    pub n_range: Vec<f32>,
    /// CSV column holding a row index, dropped before detection.
    pub index_col: Option<String>,
    /// CSV column holding ground-truth labels.
    pub label_col: Option<String>,
    /// Seed for the Isolation Forest and the SVC folds.
    pub random_seed: u64,
    /// Iteration cap of each training round.
    pub max_iterations: usize,
    /// Both classifiers above this probability mark a confident outlier.
    pub high_confidence: f32,
    /// Both classifiers below this probability mark a confident inlier.
    pub low_confidence: f32,
    /// Inlier/outlier candidate ratio that triggers the rescue rule.
    pub rescue_imbalance_ratio: f32,
    /// Method groups must have more columns than this to rescue.
    pub rescue_min_group_width: usize,
    /// Newton iteration cap of the score-space logistic regression.
    pub logistic_max_iter: usize,
}

impl Default for AutoOdParameters {
    fn default() -> Self {
        Self {
            methods: vec![
                DetectionMethod::Lof,
                DetectionMethod::Knn,
                DetectionMethod::Mahalanobis,
            ],
            k_range: (1..=10).map(|i| i * 10).collect(),
            if_range: vec![0.5, 0.6, 0.7, 0.8, 0.9],
            n_range: vec![0.05, 0.07, 0.09, 0.11, 0.13, 0.15],
            index_col: None,
            label_col: None,
            random_seed: 0,
            max_iterations: 50,
            high_confidence: 0.99,
            low_confidence: 0.01,
            rescue_imbalance_ratio: 1000.0,
            rescue_min_group_width: 6,
            logistic_max_iter: 200,
        }
    }
}

impl AutoOdParameters {
    /// Creates the default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the detector families.
    #[must_use]
    pub fn with_methods(mut self, methods: Vec<DetectionMethod>) -> Self {
        self.methods = methods;
        self
    }

    /// Sets the LOF/KNN neighbour counts.
    #[must_use]
    pub fn with_k_range(mut self, k_range: Vec<usize>) -> Self {
        self.k_range = k_range;
        self
    }

    /// Sets the Isolation Forest feature fractions.
    #[must_use]
    pub fn with_if_range(mut self, if_range: Vec<f32>) -> Self {
        self.if_range = if_range;
        self
    }

    /// Sets the target outlier fractions directly.
    #[must_use]
    pub fn with_n_range(mut self, n_range: Vec<f32>) -> Self {
        self.n_range = n_range;
        self
    }

    /// Sets six evenly spaced target fractions from `min_pct`% to `max_pct`%.
    ///
    /// ```
    /// use autood::config::AutoOdParameters;
    ///
    /// let params = AutoOdParameters::new().with_outlier_range(5.0, 15.0);
    /// assert_eq!(params.n_range, vec![0.05, 0.07, 0.09, 0.11, 0.13, 0.15]);
    /// ```
    #[must_use]
    pub fn with_outlier_range(mut self, min_pct: f32, max_pct: f32) -> Self {
        let step = (max_pct - min_pct) / 5.0;
        self.n_range = (0..6)
            .map(|i| {
                let fraction = f64::from(min_pct + step * i as f32) / 100.0;
                ((fraction * 1e5).round() / 1e5) as f32
            })
            .collect();
        self
    }

    /// Sets the CSV index and label columns.
    #[must_use]
    pub fn with_columns(mut self, index_col: Option<String>, label_col: Option<String>) -> Self {
        self.index_col = index_col;
        self.label_col = label_col;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Sets the per-round iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Loads parameters from a JSON file and validates them.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`validate`](Self::validate).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&text)?;
        params.validate()?;
        Ok(params)
    }

    /// Checks that every sweep is usable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.methods.is_empty() {
            return Err(AutoOdError::invalid_hyperparameter("methods", "[]", "non-empty"));
        }
        if self.n_range.is_empty() {
            return Err(AutoOdError::invalid_hyperparameter("n_range", "[]", "non-empty"));
        }
        if let Some(&f) = self.n_range.iter().find(|f| !(**f > 0.0 && **f < 1.0)) {
            return Err(AutoOdError::invalid_hyperparameter("n_range", f, "in (0, 1)"));
        }

        let uses_k = self
            .methods
            .iter()
            .any(|m| matches!(m, DetectionMethod::Lof | DetectionMethod::Knn));
        if uses_k {
            if self.k_range.is_empty() {
                return Err(AutoOdError::invalid_hyperparameter("k_range", "[]", "non-empty"));
            }
            if self.k_range.contains(&0) {
                return Err(AutoOdError::invalid_hyperparameter("k_range", 0, ">= 1"));
            }
        }

        if self.methods.contains(&DetectionMethod::IsolationForest) {
            if self.if_range.is_empty() {
                return Err(AutoOdError::invalid_hyperparameter("if_range", "[]", "non-empty"));
            }
            if let Some(&f) = self.if_range.iter().find(|f| !(**f > 0.0 && **f <= 1.0)) {
                return Err(AutoOdError::invalid_hyperparameter("if_range", f, "in (0, 1]"));
            }
        }

        if self.max_iterations == 0 {
            return Err(AutoOdError::invalid_hyperparameter("max_iterations", 0, ">= 1"));
        }
        if !(self.low_confidence < 0.5 && self.high_confidence > 0.5) {
            return Err(AutoOdError::invalid_hyperparameter(
                "confidence",
                format!("({}, {})", self.low_confidence, self.high_confidence),
                "low < 0.5 < high",
            ));
        }
        Ok(())
    }
}
