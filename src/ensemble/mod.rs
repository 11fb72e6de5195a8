//! The AutoOD ensemble.
//!
//! A [`ScoreMatrixBuilder`] turns detector sweeps into a vote matrix and a
//! score matrix. The [`AutoOdTrainer`] then alternates pseudo-labelling,
//! co-training of a score-space and a feature-space classifier, and
//! coefficient-driven pruning over two rounds.
//!
//! # Examples
//!
//! ```
//! use autood::ensemble::{AutoOdTrainer, GroupScores, ScoreMatrixBuilder};
//! use autood::config::AutoOdParameters;
//! use autood::primitives::Matrix;
//!
//! // Twenty inliers on a small grid and two far-away points.
//! let mut data = Vec::new();
//! for i in 0..20 {
//!     data.push((i % 5) as f32 * 0.1);
//!     data.push((i / 5) as f32 * 0.1);
//! }
//! data.extend_from_slice(&[8.0, 8.0, -8.0, 9.0]);
//! let x = Matrix::from_vec(22, 2, data).expect("22x2 features");
//!
//! // One group, one detector: distance from the grid centre.
//! let scores: Vec<f32> = (0..22)
//!     .map(|i| (x.get(i, 0) - 0.2).hypot(x.get(i, 1) - 0.15))
//!     .collect();
//! let group = GroupScores {
//!     name: "Distance".to_string(),
//!     detector_names: vec!["Distance".to_string()],
//!     scores: vec![scores],
//! };
//! let matrix = ScoreMatrixBuilder::assemble(vec![group], &[0.1], None).expect("matrix");
//!
//! let params = AutoOdParameters::new();
//! let outcome = AutoOdTrainer::new(&params, &x, None)
//!     .expect("trainer")
//!     .train(&matrix)
//!     .expect("training");
//! assert_eq!(outcome.predictions.len(), 22);
//! ```

mod active;
mod baseline;
mod controller;
mod cotrain;
mod labeler;
mod matrix_builder;
mod pruning;

pub use active::{ActiveDetectorSet, GroupRanges};
pub use baseline::majority_vote;
pub use controller::{
    check_round_boundary, AutoOdTrainer, Decision, IterationRecord, IterationState, Round,
    RoundReport, Step, StopReason, TrainingOutcome, TrainingReport,
};
pub use cotrain::{ClassifierPair, CoTrainingOutput};
pub use labeler::{ConfidenceSets, PseudoLabelPartition, PseudoLabeler};
pub use matrix_builder::{
    target_count, threshold_votes, DetectorMatrix, GroupScores, MethodGroup, ScoreMatrixBuilder,
};
pub use pruning::{PruneOutcome, PruningEngine, PruningGate};
