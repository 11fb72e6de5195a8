//! AutoOD: automated outlier detection without labels.
//!
//! AutoOD runs a sweep of unsupervised detectors (LOF, KNN distance,
//! Isolation Forest, Mahalanobis distance) at several target outlier
//! fractions, then fuses their votes by self-training: instances the
//! detectors agree on become pseudo-labels for a score-space and a
//! feature-space classifier, whose joint confidence refines the labels and
//! whose coefficients prune uninformative detectors.
//!
//! # Quick Start
//!
//! ```
//! use autood::prelude::*;
//!
//! // Forty points on a grid and four far away.
//! let mut data = Vec::new();
//! for i in 0..40 {
//!     data.push((i % 8) as f32 * 0.1);
//!     data.push((i / 8) as f32 * 0.1);
//! }
//! data.extend_from_slice(&[6.0, 6.0, 6.5, 6.0, 6.0, 6.5, 6.5, 6.5]);
//! let x = Matrix::from_vec(44, 2, data).unwrap();
//! let dataset = Dataset::new(x, None).unwrap();
//!
//! let params = AutoOdParameters::new()
//!     .with_methods(vec![DetectionMethod::Knn])
//!     .with_k_range(vec![3, 5])
//!     .with_n_range(vec![0.08, 0.1]);
//! let detection = AutoOd::new(params).detect(&dataset).unwrap();
//! assert_eq!(detection.predictions.len(), 44);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`detectors`]: Unsupervised outlier detectors and their sweeps
//! - [`ensemble`]: Score matrix, pseudo-labelling, co-training, pruning
//! - [`classification`]: Logistic regression and RBF SVC with probabilities
//! - [`preprocessing`]: Robust scaling
//! - [`stats`]: Quantiles, moments, covariance and correlation
//! - [`metrics`]: Binary F1 and accuracy
//! - [`data`]: CSV and ARFF loading
//! - [`config`]: Run parameters
//! - [`pipeline`]: Load, detect, score and persist in one call

pub mod classification;
pub mod config;
pub mod data;
pub mod detectors;
pub mod ensemble;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod stats;
pub mod traits;

pub use error::{AutoOdError, Result};
pub use primitives::{Matrix, Vector};
pub use traits::{OutlierDetector, ProbabilisticClassifier, Transformer};
