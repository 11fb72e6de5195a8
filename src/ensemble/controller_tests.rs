use super::*;
use crate::ensemble::matrix_builder::{GroupScores, ScoreMatrixBuilder};

const N_INLIERS: usize = 50;
const N_OUTLIERS: usize = 10;
const N: usize = N_INLIERS + N_OUTLIERS;

/// A 10x5 grid of inliers and a tight cluster of ten outliers near (6, 6).
fn features() -> Matrix<f32> {
    let mut data = Vec::with_capacity(N * 2);
    for i in 0..N_INLIERS {
        data.push(0.1 * (i % 10) as f32);
        data.push(0.1 * (i / 10) as f32);
    }
    for i in 0..N_OUTLIERS {
        data.push(6.0 + 0.1 * (i % 5) as f32);
        data.push(6.0 + 0.1 * (i / 5) as f32);
    }
    Matrix::from_vec(N, 2, data).expect("60x2 features")
}

fn truth() -> Vec<usize> {
    (0..N).map(|i| usize::from(i >= N_INLIERS)).collect()
}

fn distances(x: &Matrix<f32>) -> Vec<f32> {
    (0..x.n_rows())
        .map(|i| (x.get(i, 0) - 0.45).hypot(x.get(i, 1) - 0.2))
        .collect()
}

fn single_detector_matrix(x: &Matrix<f32>, fraction: f32) -> DetectorMatrix {
    let group = GroupScores {
        name: "Distance".to_string(),
        detector_names: vec!["Distance".to_string()],
        scores: vec![distances(x)],
    };
    ScoreMatrixBuilder::assemble(vec![group], &[fraction], None).expect("matrix")
}

/// Two rescaled copies of the distance in one group, and a detector that
/// ignores the data in another.
fn three_detector_matrix(x: &Matrix<f32>) -> DetectorMatrix {
    let distance = distances(x);
    let doubled = distance.iter().map(|d| 2.0 * d + 0.5).collect();
    let noise = (0..N).map(|i| ((i * 7) % 13) as f32).collect();
    let groups = vec![
        GroupScores {
            name: "Distance".to_string(),
            detector_names: vec!["d".to_string(), "2d".to_string()],
            scores: vec![distance, doubled],
        },
        GroupScores {
            name: "Noise".to_string(),
            detector_names: vec!["noise".to_string()],
            scores: vec![noise],
        },
    ];
    ScoreMatrixBuilder::assemble(groups, &[0.16, 0.17, 0.18, 0.19], None).expect("matrix")
}

#[test]
fn test_round_gates_and_names() {
    assert_eq!(Round::Exploration.gate(), PruningGate::Exploration);
    assert_eq!(Round::Refinement.gate(), PruningGate::Refinement);
    assert_eq!(Round::Exploration.to_string(), "first");
    assert_eq!(Round::Refinement.to_string(), "second");
}

#[test]
fn test_new_state_is_empty() {
    let state = IterationState::new(Round::Refinement);
    assert_eq!(state.round, Round::Refinement);
    assert_eq!(state.iteration, 0);
    assert_eq!(state.stability_counter, 0);
    assert!(state.previous_training.is_none());
    assert!(state.last_partition.is_none());
    assert!(state.feature_probabilities.is_none());
}

#[test]
fn test_trainer_rejects_label_mismatch() {
    let params = AutoOdParameters::new();
    let short = vec![0; N - 1];
    assert!(AutoOdTrainer::new(&params, &features(), Some(&short)).is_err());
}

#[test]
fn test_step_records_first_iteration() {
    let params = AutoOdParameters::new();
    let x = features();
    let labels = truth();
    let matrix = single_detector_matrix(&x, 0.16);
    let trainer = AutoOdTrainer::new(&params, &x, Some(&labels)).expect("trainer");
    let active = ActiveDetectorSet::from_matrix(&matrix).expect("active set");

    let step = trainer
        .step(IterationState::new(Round::Exploration), active)
        .expect("step");

    assert_eq!(step.decision, Decision::Continue);
    let record = step.record.expect("classifiers were fitted");
    assert_eq!(record.iteration, 0);
    assert_eq!(record.training_size, N);
    assert_eq!(record.pruning, PruneOutcome::NotApplicable);
    assert!((record.training_f1.expect("labels") - 1.0).abs() < 1e-6);
    assert!(record.ensemble_f1.is_some());

    assert_eq!(step.state.iteration, 1);
    assert_eq!(step.state.stability_counter, 0);
    assert_eq!(step.state.previous_training, Some((0..N).collect()));
    assert!(step.state.feature_probabilities.is_some());
}

#[test]
fn test_step_stops_when_training_set_is_stable() {
    let params = AutoOdParameters::new();
    let x = features();
    let matrix = single_detector_matrix(&x, 0.16);
    let trainer = AutoOdTrainer::new(&params, &x, None).expect("trainer");
    let active = ActiveDetectorSet::from_matrix(&matrix).expect("active set");

    let state = IterationState {
        iteration: 6,
        previous_training: Some((0..N).collect()),
        stability_counter: 3,
        ..IterationState::new(Round::Exploration)
    };
    let step = trainer.step(state, active).expect("step");

    assert_eq!(step.state.stability_counter, 4);
    assert_eq!(step.decision, Decision::Stop(StopReason::Stable));
}

#[test]
fn test_step_keeps_going_at_patience() {
    let params = AutoOdParameters::new();
    let x = features();
    let matrix = single_detector_matrix(&x, 0.16);
    let trainer = AutoOdTrainer::new(&params, &x, None).expect("trainer");
    let active = ActiveDetectorSet::from_matrix(&matrix).expect("active set");

    let state = IterationState {
        iteration: 5,
        previous_training: Some((0..N).collect()),
        stability_counter: STABILITY_PATIENCE - 1,
        ..IterationState::new(Round::Exploration)
    };
    let step = trainer.step(state, active).expect("step");

    assert_eq!(step.state.stability_counter, STABILITY_PATIENCE);
    assert_eq!(step.decision, Decision::Continue);
}

#[test]
fn test_step_resets_counter_on_change() {
    let params = AutoOdParameters::new();
    let x = features();
    let matrix = single_detector_matrix(&x, 0.16);
    let trainer = AutoOdTrainer::new(&params, &x, None).expect("trainer");
    let active = ActiveDetectorSet::from_matrix(&matrix).expect("active set");

    let state = IterationState {
        previous_training: Some((1..N).collect()),
        stability_counter: 3,
        ..IterationState::new(Round::Exploration)
    };
    let step = trainer.step(state, active).expect("step");

    assert_eq!(step.state.stability_counter, 0);
    assert_eq!(step.decision, Decision::Continue);
}

#[test]
fn test_step_stops_at_iteration_cap() {
    let params = AutoOdParameters::new().with_max_iterations(1);
    let x = features();
    let matrix = single_detector_matrix(&x, 0.16);
    let trainer = AutoOdTrainer::new(&params, &x, None).expect("trainer");
    let active = ActiveDetectorSet::from_matrix(&matrix).expect("active set");

    let step = trainer
        .step(IterationState::new(Round::Exploration), active)
        .expect("step");
    assert_eq!(step.decision, Decision::Stop(StopReason::IterationCap));
}

#[test]
fn test_step_stops_on_degenerate_partition() {
    let params = AutoOdParameters::new();
    let x = features();
    let matrix = single_detector_matrix(&x, 0.16);
    let trainer = AutoOdTrainer::new(&params, &x, None).expect("trainer");
    let active = ActiveDetectorSet::from_matrix(&matrix).expect("active set");

    // every agreeing outlier is a disagreement of the previous fit
    let state = IterationState {
        confidence: ConfidenceSets {
            disagreements: (N_INLIERS..N).collect(),
            ..ConfidenceSets::default()
        },
        ..IterationState::new(Round::Exploration)
    };
    let step = trainer.step(state, active).expect("step");

    assert_eq!(step.decision, Decision::Stop(StopReason::DegenerateTrainingSet));
    assert!(step.record.is_none());
    assert_eq!(step.state.iteration, 0);
}

#[test]
fn test_train_two_rounds_finds_outliers() {
    let params = AutoOdParameters::new();
    let x = features();
    let labels = truth();
    let matrix = single_detector_matrix(&x, 0.16);
    let trainer = AutoOdTrainer::new(&params, &x, Some(&labels)).expect("trainer");

    let outcome = trainer.train(&matrix).expect("training");

    assert_eq!(outcome.predictions.len(), N);
    let report = &outcome.report;
    assert_eq!(report.rounds.len(), 2);
    assert_eq!(report.rounds[0].round, Round::Exploration);
    assert_eq!(report.rounds[1].round, Round::Refinement);
    assert!(report.rounds[0].seed.is_none());
    assert!(report.rounds[1].seed.is_some());
    assert!(report.total_iterations() >= 2);
    assert!(report.total_iterations() <= 2 * params.max_iterations);
    assert_eq!(report.correlations().len(), report.total_iterations());
    assert_eq!(report.remaining_detectors, vec![0]);

    let f1 = f1_score(&labels, &outcome.predictions).expect("same length");
    assert!(f1 >= 0.9, "final F1 was {f1}");
}

#[test]
fn test_train_without_labels_has_no_scores() {
    let params = AutoOdParameters::new();
    let x = features();
    let matrix = single_detector_matrix(&x, 0.16);
    let outcome = AutoOdTrainer::new(&params, &x, None)
        .expect("trainer")
        .train(&matrix)
        .expect("training");

    for round in &outcome.report.rounds {
        for record in &round.iterations {
            assert!(record.training_f1.is_none());
            assert!(record.ensemble_f1.is_none());
        }
    }
}

#[test]
fn test_train_falls_back_to_majority_vote() {
    // 0.001 of 60 rounds to zero flagged instances: no outlier is ever found
    let params = AutoOdParameters::new();
    let x = features();
    let matrix = single_detector_matrix(&x, 0.001);
    let outcome = AutoOdTrainer::new(&params, &x, None)
        .expect("trainer")
        .train(&matrix)
        .expect("training");

    assert_eq!(outcome.predictions, vec![0; N]);
    assert_eq!(outcome.report.iterations_per_round(), vec![0, 0]);
    assert_eq!(
        outcome.report.stop_reasons(),
        vec![
            StopReason::DegenerateTrainingSet,
            StopReason::DegenerateTrainingSet
        ]
    );
}

#[test]
fn test_train_with_several_detectors() {
    let params = AutoOdParameters::new();
    let x = features();
    let matrix = three_detector_matrix(&x);
    let outcome = AutoOdTrainer::new(&params, &x, None)
        .expect("trainer")
        .train(&matrix)
        .expect("training");

    let remaining = &outcome.report.remaining_detectors;
    assert!(!remaining.is_empty());
    assert!(remaining.iter().all(|&id| id < 3));
    assert!(remaining.windows(2).all(|w| w[0] < w[1]));

    let seed = outcome.report.rounds[1].seed.as_ref().expect("second round ran");
    assert_eq!(seed.round, Round::Refinement);
    assert!(seed.n_detectors <= 3);
}

#[test]
fn test_train_rejects_row_mismatch() {
    let params = AutoOdParameters::new();
    let x = features();
    let other = x.select_rows(&(0..30).collect::<Vec<_>>());
    let matrix = single_detector_matrix(&other, 0.16);
    let trainer = AutoOdTrainer::new(&params, &x, None).expect("trainer");
    assert!(matches!(
        trainer.train(&matrix),
        Err(AutoOdError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_round_boundary_check() {
    let x = features();
    let matrix = three_detector_matrix(&x);
    let original = ActiveDetectorSet::from_matrix(&matrix).expect("active set");
    check_round_boundary(&matrix, &original).expect("original layout");

    let pruned = original.prune(&[true, false, true]).expect("pruned");
    let err = check_round_boundary(&matrix, &pruned).unwrap_err();
    assert!(matches!(err, AutoOdError::InvariantViolation { .. }));
    assert!(err.to_string().contains("round boundary"));
}

#[test]
fn test_second_round_restarts_from_every_detector() {
    let params = AutoOdParameters::new();
    let x = features();
    let matrix = three_detector_matrix(&x);
    let n_detectors = matrix.n_detectors();
    let outcome = AutoOdTrainer::new(&params, &x, None)
        .expect("trainer")
        .train(&matrix)
        .expect("training");

    // The noise detector cannot outweigh the distance pair, so round 1 drops it.
    let first = &outcome.report.rounds[0];
    assert!(first
        .iterations
        .iter()
        .any(|r| matches!(r.pruning, PruneOutcome::Pruned { .. })));
    let first_end = first.iterations.last().expect("round 1 ran").n_detectors;
    assert!(first_end < n_detectors);

    // The seed refit sees the full builder output again.
    let seed = outcome.report.rounds[1].seed.as_ref().expect("second round ran");
    let removed = match &seed.pruning {
        PruneOutcome::Pruned { removed } => {
            assert!(removed.iter().all(|&id| id < n_detectors));
            removed.len()
        }
        _ => 0,
    };
    assert_eq!(seed.n_detectors + removed, n_detectors);

    let second = &outcome.report.rounds[1];
    if let Some(record) = second.iterations.first() {
        assert!(record.n_detectors <= seed.n_detectors);
    }
}
