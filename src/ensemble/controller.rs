//! Two-round self-training controller.
//!
//! Each iteration is a pure step `(IterationState, ActiveDetectorSet) ->
//! (IterationState, ActiveDetectorSet, Decision)`: pseudo-label, fit the
//! classifier pair, prune, then check the stop conditions. Round 1 explores
//! which detectors are informative; round 2 restarts from the unpruned
//! matrix, seeded with round 1's last training set.

use super::active::ActiveDetectorSet;
use super::baseline::majority_vote;
use super::cotrain::ClassifierPair;
use super::labeler::{ConfidenceSets, PseudoLabelPartition, PseudoLabeler};
use super::matrix_builder::DetectorMatrix;
use super::pruning::{PruneOutcome, PruningEngine, PruningGate};
use crate::config::AutoOdParameters;
use crate::error::{AutoOdError, Result};
use crate::metrics::f1_score;
use crate::preprocessing::RobustScaler;
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Consecutive unchanged training sets tolerated before a round stops.
const STABILITY_PATIENCE: usize = 3;

/// Training round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Round {
    /// Round 1: prunes freely to find an informative detector subset.
    Exploration,
    /// Round 2: restarts from the full matrix with a stricter gate.
    Refinement,
}

impl Round {
    /// Pruning gate used during this round.
    #[must_use]
    pub fn gate(self) -> PruningGate {
        match self {
            Round::Exploration => PruningGate::Exploration,
            Round::Refinement => PruningGate::Refinement,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Round::Exploration => f.write_str("first"),
            Round::Refinement => f.write_str("second"),
        }
    }
}

/// Why a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The training set stopped changing and nothing is left to prune.
    Stable,
    /// The per-round iteration cap was reached.
    IterationCap,
    /// The pseudo-labels lacked one of the two classes.
    DegenerateTrainingSet,
}

/// What the controller does after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Run another iteration.
    Continue,
    /// End the current round.
    Stop(StopReason),
}

/// State threaded from one iteration to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationState {
    /// Current round.
    pub round: Round,
    /// Iterations completed in this round.
    pub iteration: usize,
    /// Confident sets from the previous fit.
    pub confidence: ConfidenceSets,
    /// Training indices of the previous iteration.
    pub previous_training: Option<Vec<usize>>,
    /// Consecutive iterations with an unchanged training set.
    pub stability_counter: usize,
    /// Partition of the most recent successful iteration.
    pub last_partition: Option<PseudoLabelPartition>,
    /// Classifier B's most recent probabilities.
    pub feature_probabilities: Option<Vec<f32>>,
}

impl IterationState {
    /// Empty state at the start of a round.
    #[must_use]
    pub fn new(round: Round) -> Self {
        Self {
            round,
            iteration: 0,
            confidence: ConfidenceSets::default(),
            previous_training: None,
            stability_counter: 0,
            last_partition: None,
            feature_probabilities: None,
        }
    }
}

/// Diagnostics of one classifier-pair fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Round of the fit.
    pub round: Round,
    /// Iteration index within the round.
    pub iteration: usize,
    /// Number of pseudo-labelled instances.
    pub training_size: usize,
    /// Instances added by the rescue rule.
    pub rescued: usize,
    /// F1 of the pseudo-labels against the truth.
    pub training_f1: Option<f32>,
    /// F1 of `P_B > 0.5` against the truth.
    pub ensemble_f1: Option<f32>,
    /// Correlation of the two classifiers' probabilities.
    pub correlation: Option<f32>,
    /// Pruning decision taken after the fit.
    pub pruning: PruneOutcome,
    /// Score columns left after pruning.
    pub n_detectors: usize,
}

/// Diagnostics of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Which round.
    pub round: Round,
    /// The round-boundary refit that seeded this round, if any.
    pub seed: Option<IterationRecord>,
    /// One record per iteration.
    pub iterations: Vec<IterationRecord>,
    /// Why the round ended.
    pub stop_reason: StopReason,
}

/// Diagnostics of a full training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Round 1 then round 2.
    pub rounds: Vec<RoundReport>,
    /// Original indices of the detectors active at the end.
    pub remaining_detectors: Vec<usize>,
}

impl TrainingReport {
    /// Iterations run per round.
    #[must_use]
    pub fn iterations_per_round(&self) -> Vec<usize> {
        self.rounds.iter().map(|r| r.iterations.len()).collect()
    }

    /// Iterations run across both rounds.
    #[must_use]
    pub fn total_iterations(&self) -> usize {
        self.iterations_per_round().iter().sum()
    }

    /// Stop reason per round.
    #[must_use]
    pub fn stop_reasons(&self) -> Vec<StopReason> {
        self.rounds.iter().map(|r| r.stop_reason).collect()
    }

    /// Correlation of `P_A` and `P_B` for every iteration, in order.
    #[must_use]
    pub fn correlations(&self) -> Vec<Option<f32>> {
        self.rounds
            .iter()
            .flat_map(|r| r.iterations.iter().map(|it| it.correlation))
            .collect()
    }
}

/// Final labels plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    /// 0/1 label per instance.
    pub predictions: Vec<usize>,
    /// How the run went.
    pub report: TrainingReport,
}

/// Output of [`AutoOdTrainer::step`].
#[derive(Debug, Clone)]
pub struct Step {
    /// State for the next iteration.
    pub state: IterationState,
    /// Detector set for the next iteration.
    pub active: ActiveDetectorSet,
    /// Whether to continue.
    pub decision: Decision,
    /// Diagnostics, absent when the step stopped before fitting.
    pub record: Option<IterationRecord>,
}

/// Runs the self-training loop over a [`DetectorMatrix`].
#[derive(Debug)]
pub struct AutoOdTrainer<'a> {
    params: &'a AutoOdParameters,
    features: Matrix<f32>,
    labels: Option<&'a [usize]>,
    labeler: PseudoLabeler,
    pair: ClassifierPair,
    pruning: PruningEngine,
}

impl<'a> AutoOdTrainer<'a> {
    /// Prepares a trainer for the feature matrix `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is empty or the label count differs.
    pub fn new(
        params: &'a AutoOdParameters,
        x: &Matrix<f32>,
        labels: Option<&'a [usize]>,
    ) -> Result<Self> {
        if let Some(y) = labels {
            if y.len() != x.n_rows() {
                return Err(AutoOdError::dimension_mismatch("labels", x.n_rows(), y.len()));
            }
        }
        let features = RobustScaler::new().fit_transform(x)?;
        let pair = ClassifierPair::new(
            params.high_confidence,
            params.low_confidence,
            params.logistic_max_iter,
            params.random_seed,
        );
        Ok(Self {
            params,
            features,
            labels,
            labeler: PseudoLabeler::new(params.rescue_imbalance_ratio, params.rescue_min_group_width),
            pair,
            pruning: PruningEngine::new(pair),
        })
    }

    /// One iteration of self-training.
    ///
    /// # Errors
    ///
    /// Returns an error if a classifier fit or the pruning refit fails.
    pub fn step(&self, state: IterationState, active: ActiveDetectorSet) -> Result<Step> {
        let partition = self.labeler.partition(&active, &state.confidence);
        if partition.is_degenerate() {
            warn!(
                round = %state.round,
                iteration = state.iteration,
                inliers = partition.inliers.len(),
                outliers = partition.outliers.len(),
                "Pseudo-labels miss a class, stopping round"
            );
            return Ok(Step {
                state,
                active,
                decision: Decision::Stop(StopReason::DegenerateTrainingSet),
                record: None,
            });
        }

        let indices = partition.training_indices();
        let training_f1 = self.training_f1(&partition)?;
        let output = self.pair.fit(active.scores(), &self.features, &partition)?;
        let ensemble_f1 = self.ensemble_f1(&output.predictions())?;
        match ensemble_f1 {
            Some(f1) => info!(round = %state.round, iteration = state.iteration, f1, "Iteration"),
            None => info!(round = %state.round, iteration = state.iteration, "Iteration"),
        }

        let (active, pruning) = self.pruning.apply(active, &output, state.round.gate())?;

        let unchanged = state.previous_training.as_deref() == Some(indices.as_slice());
        let stability_counter = if unchanged && active.max_detector_end() < 2 {
            state.stability_counter + 1
        } else {
            0
        };
        let iteration = state.iteration + 1;
        let decision = if stability_counter > STABILITY_PATIENCE {
            Decision::Stop(StopReason::Stable)
        } else if iteration >= self.params.max_iterations {
            Decision::Stop(StopReason::IterationCap)
        } else {
            Decision::Continue
        };

        let record = IterationRecord {
            round: state.round,
            iteration: state.iteration,
            training_size: indices.len(),
            rescued: partition.rescued.len(),
            training_f1,
            ensemble_f1,
            correlation: output.correlation,
            pruning,
            n_detectors: active.n_detectors(),
        };

        Ok(Step {
            state: IterationState {
                round: state.round,
                iteration,
                confidence: output.confidence,
                previous_training: Some(indices),
                stability_counter,
                last_partition: Some(partition),
                feature_probabilities: Some(output.feature_probabilities),
            },
            active,
            decision,
            record: Some(record),
        })
    }

    /// Runs both rounds and returns the final labels.
    ///
    /// # Errors
    ///
    /// Returns an error if a fit fails, the matrix does not match the
    /// features, or the round-2 restart does not reproduce the original
    /// layout.
    pub fn train(&self, matrix: &DetectorMatrix) -> Result<TrainingOutcome> {
        if matrix.n_samples() != self.features.n_rows() {
            return Err(AutoOdError::dimension_mismatch(
                "detector matrix rows",
                self.features.n_rows(),
                matrix.n_samples(),
            ));
        }
        let original = ActiveDetectorSet::from_matrix(matrix)?;

        info!("Start first-round AutoOD training");
        let (state, active, first) =
            self.run_round(IterationState::new(Round::Exploration), original.clone())?;
        let mut rounds = vec![first];

        let (state, active) = match state.last_partition.as_ref() {
            Some(partition) => {
                let restart = original.clone();
                check_round_boundary(matrix, &restart)?;
                let (seeded_state, seeded_active, seed) =
                    self.seed_refinement(restart, partition)?;

                info!("Start second-round AutoOD training");
                let (state, active, mut second) = self.run_round(seeded_state, seeded_active)?;
                second.seed = Some(seed);
                rounds.push(second);
                (state, active)
            }
            None => {
                warn!("First round never produced a usable training set, skipping the second");
                rounds.push(RoundReport {
                    round: Round::Refinement,
                    seed: None,
                    iterations: Vec::new(),
                    stop_reason: StopReason::DegenerateTrainingSet,
                });
                (state, active)
            }
        };

        let predictions = match state.feature_probabilities {
            Some(probabilities) => probabilities.iter().map(|&p| usize::from(p > 0.5)).collect(),
            None => {
                warn!("No classifier was fitted, falling back to the majority vote");
                majority_vote(original.votes())
            }
        };

        Ok(TrainingOutcome {
            predictions,
            report: TrainingReport {
                rounds,
                remaining_detectors: active.detector_ids().to_vec(),
            },
        })
    }

    fn run_round(
        &self,
        mut state: IterationState,
        mut active: ActiveDetectorSet,
    ) -> Result<(IterationState, ActiveDetectorSet, RoundReport)> {
        let round = state.round;
        let mut iterations = Vec::new();
        loop {
            let step = self.step(state, active)?;
            iterations.extend(step.record);
            state = step.state;
            active = step.active;
            if let Decision::Stop(stop_reason) = step.decision {
                info!(round = %round, iterations = iterations.len(), ?stop_reason, "Round finished");
                return Ok((
                    state,
                    active,
                    RoundReport {
                        round,
                        seed: None,
                        iterations,
                        stop_reason,
                    },
                ));
            }
        }
    }

    /// Refits on round 1's last training set over the full matrix and takes
    /// one refinement-gated pruning decision.
    fn seed_refinement(
        &self,
        restart: ActiveDetectorSet,
        partition: &PseudoLabelPartition,
    ) -> Result<(IterationState, ActiveDetectorSet, IterationRecord)> {
        let training_f1 = self.training_f1(partition)?;
        let output = self.pair.fit(restart.scores(), &self.features, partition)?;
        let ensemble_f1 = self.ensemble_f1(&output.predictions())?;
        let (active, pruning) = self.pruning.apply(restart, &output, PruningGate::Refinement)?;

        let record = IterationRecord {
            round: Round::Refinement,
            iteration: 0,
            training_size: partition.len(),
            rescued: partition.rescued.len(),
            training_f1,
            ensemble_f1,
            correlation: output.correlation,
            pruning,
            n_detectors: active.n_detectors(),
        };
        let state = IterationState {
            confidence: output.confidence,
            last_partition: Some(partition.clone()),
            feature_probabilities: Some(output.feature_probabilities),
            ..IterationState::new(Round::Refinement)
        };
        Ok((state, active, record))
    }

    fn training_f1(&self, partition: &PseudoLabelPartition) -> Result<Option<f32>> {
        self.labels
            .map(|y| {
                let truth: Vec<usize> = partition.training_indices().iter().map(|&i| y[i]).collect();
                f1_score(&truth, &partition.labels())
            })
            .transpose()
    }

    fn ensemble_f1(&self, predictions: &[usize]) -> Result<Option<f32>> {
        self.labels.map(|y| f1_score(y, predictions)).transpose()
    }
}

/// Checks that a round-2 starting set reproduces the builder's layout.
///
/// # Errors
///
/// Returns `InvariantViolation` describing the first mismatch.
pub fn check_round_boundary(matrix: &DetectorMatrix, active: &ActiveDetectorSet) -> Result<()> {
    if active.votes().shape() != matrix.votes.shape() {
        return Err(AutoOdError::InvariantViolation {
            message: format!(
                "round boundary: vote matrix is {:?}, builder produced {:?}",
                active.votes().shape(),
                matrix.votes.shape()
            ),
        });
    }
    if active.n_detectors() != matrix.n_detectors() {
        return Err(AutoOdError::InvariantViolation {
            message: format!(
                "round boundary: {} score columns, builder produced {}",
                active.n_detectors(),
                matrix.n_detectors()
            ),
        });
    }
    if active.groups().len() != matrix.groups.len() {
        return Err(AutoOdError::InvariantViolation {
            message: "round boundary: method group count changed".to_string(),
        });
    }
    for (ranges, group) in active.groups().iter().zip(&matrix.groups) {
        if ranges.instance_range != group.instance_range
            || ranges.detector_range != group.detector_range
        {
            return Err(AutoOdError::InvariantViolation {
                message: format!(
                    "round boundary: group {} ranges {:?}/{:?} differ from {:?}/{:?}",
                    group.name,
                    ranges.instance_range,
                    ranges.detector_range,
                    group.instance_range,
                    group.detector_range
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
