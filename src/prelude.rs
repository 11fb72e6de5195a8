//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use autood::prelude::*;
//! ```

pub use crate::config::AutoOdParameters;
pub use crate::data::Dataset;
pub use crate::detectors::DetectionMethod;
pub use crate::ensemble::{AutoOdTrainer, DetectorMatrix, ScoreMatrixBuilder, TrainingOutcome};
pub use crate::error::{AutoOdError, Result};
pub use crate::metrics::f1_score;
pub use crate::pipeline::{AutoOd, AutoOdResults};
pub use crate::primitives::{Matrix, Vector};
pub use crate::traits::{OutlierDetector, ProbabilisticClassifier, Transformer};
