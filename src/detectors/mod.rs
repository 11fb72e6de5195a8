//! Unsupervised outlier detectors.
//!
//! Each detector scores every row of a feature matrix at one fixed
//! hyperparameter; higher scores are more anomalous. [`DetectionMethod`]
//! expands a method into its hyperparameter sweep.
//!
//! # Example
//!
//! ```
//! use autood::config::AutoOdParameters;
//! use autood::detectors::DetectionMethod;
//!
//! let params = AutoOdParameters::default();
//! let sweep = DetectionMethod::Knn.detectors(&params);
//! assert_eq!(sweep.len(), params.k_range.len());
//! assert_eq!(sweep[0].name(), "KNN(k=10)");
//! ```

mod isolation_forest;
mod knn;
mod lof;
mod mahalanobis;

pub use isolation_forest::IsolationForest;
pub use knn::KnnDistance;
pub use lof::LocalOutlierFactor;
pub use mahalanobis::Mahalanobis;

use crate::config::AutoOdParameters;
use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;
use crate::traits::OutlierDetector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The detector families the ensemble can sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    /// Local Outlier Factor over `k_range`.
    #[serde(rename = "lof")]
    Lof,
    /// Distance to the k-th nearest neighbour over `k_range`.
    #[serde(rename = "knn")]
    Knn,
    /// Isolation Forest over `if_range`.
    #[serde(rename = "if")]
    IsolationForest,
    /// Mahalanobis distance, no hyperparameter.
    #[serde(rename = "mahala")]
    Mahalanobis,
}

impl DetectionMethod {
    /// All methods in sweep order.
    pub const ALL: [DetectionMethod; 4] = [
        DetectionMethod::Lof,
        DetectionMethod::Knn,
        DetectionMethod::IsolationForest,
        DetectionMethod::Mahalanobis,
    ];

    /// Short identifier used in configuration files and on the command line.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            DetectionMethod::Lof => "lof",
            DetectionMethod::Knn => "knn",
            DetectionMethod::IsolationForest => "if",
            DetectionMethod::Mahalanobis => "mahala",
        }
    }

    /// Expands the method into one detector per hyperparameter value.
    #[must_use]
    pub fn detectors(self, params: &AutoOdParameters) -> Vec<Box<dyn OutlierDetector>> {
        match self {
            DetectionMethod::Lof => params
                .k_range
                .iter()
                .map(|&k| Box::new(LocalOutlierFactor::new(k)) as Box<dyn OutlierDetector>)
                .collect(),
            DetectionMethod::Knn => params
                .k_range
                .iter()
                .map(|&k| Box::new(KnnDistance::new(k)) as Box<dyn OutlierDetector>)
                .collect(),
            DetectionMethod::IsolationForest => params
                .if_range
                .iter()
                .map(|&max_features| {
                    Box::new(
                        IsolationForest::new(max_features).with_random_state(params.random_seed),
                    ) as Box<dyn OutlierDetector>
                })
                .collect(),
            DetectionMethod::Mahalanobis => vec![Box::new(Mahalanobis::new())],
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetectionMethod::Lof => "LOF",
            DetectionMethod::Knn => "KNN",
            DetectionMethod::IsolationForest => "IsolationForest",
            DetectionMethod::Mahalanobis => "Mahalanobis",
        };
        f.write_str(name)
    }
}

impl FromStr for DetectionMethod {
    type Err = AutoOdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lof" => Ok(DetectionMethod::Lof),
            "knn" => Ok(DetectionMethod::Knn),
            "if" | "isolation_forest" | "isolationforest" => Ok(DetectionMethod::IsolationForest),
            "mahala" | "mahalanobis" => Ok(DetectionMethod::Mahalanobis),
            other => Err(AutoOdError::invalid_hyperparameter(
                "detection_method",
                other,
                "one of lof, knn, if, mahala",
            )),
        }
    }
}

/// Neighbour lists for every row, sorted by distance then index.
///
/// With `include_self` the row itself appears at distance 0 as its own first
/// neighbour.
pub(crate) fn nearest_neighbors(
    x: &Matrix<f32>,
    k: usize,
    include_self: bool,
) -> Vec<Vec<(usize, f32)>> {
    let n = x.n_rows();
    (0..n)
        .into_par_iter()
        .map(|i| {
            let query = x.row_slice(i);
            let mut dists: Vec<(usize, f32)> = (0..n)
                .filter(|&j| include_self || j != i)
                .map(|j| (j, euclidean(query, x.row_slice(j))))
                .collect();
            dists.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            dists.truncate(k);
            dists
        })
        .collect()
}

pub(crate) fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&u, &v)| (u - v) * (u - v))
        .sum::<f32>()
        .sqrt()
}

fn check_neighbors(k: usize, available: usize) -> Result<()> {
    if k == 0 {
        return Err(AutoOdError::invalid_hyperparameter("k", k, ">= 1"));
    }
    if available == 0 {
        return Err(AutoOdError::empty_input("neighbour search"));
    }
    Ok(())
}
