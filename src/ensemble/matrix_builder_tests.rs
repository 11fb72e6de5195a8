use super::*;
use crate::detectors::DetectionMethod;
use proptest::prelude::*;

fn group(name: &str, scores: Vec<Vec<f32>>) -> GroupScores {
    GroupScores {
        name: name.to_string(),
        detector_names: (0..scores.len()).map(|h| format!("{name}{h}")).collect(),
        scores,
    }
}

/// Group `a` has two detectors, group `b` one, over five instances.
fn two_groups() -> Vec<GroupScores> {
    vec![
        group(
            "a",
            vec![vec![0.1, 0.2, 0.3, 0.4, 0.5], vec![5.0, 4.0, 3.0, 2.0, 1.0]],
        ),
        group("b", vec![vec![0.0, 0.0, 9.0, 0.0, 0.0]]),
    ]
}

#[test]
fn test_target_count_rounds() {
    assert_eq!(target_count(0.05, 100), 5);
    assert_eq!(target_count(0.1, 22), 2);
    assert_eq!(target_count(0.125, 20), 3);
    assert_eq!(target_count(0.01, 10), 0);
}

#[test]
fn test_threshold_votes_strictly_above() {
    assert_eq!(threshold_votes(&[3.0, 1.0, 2.0], 1), vec![1, 0, 0]);
    assert_eq!(threshold_votes(&[3.0, 1.0, 2.0], 2), vec![1, 0, 1]);
}

#[test]
fn test_threshold_votes_ties_flag_fewer() {
    // Two instances tie at the threshold: neither is flagged.
    assert_eq!(threshold_votes(&[5.0, 2.0, 2.0, 1.0], 2), vec![1, 0, 0, 0]);
}

#[test]
fn test_threshold_votes_extremes() {
    assert_eq!(threshold_votes(&[1.0, 2.0, 3.0], 0), vec![0, 0, 0]);
    assert_eq!(threshold_votes(&[1.0, 2.0, 3.0], 3), vec![1, 1, 1]);
    assert_eq!(threshold_votes(&[1.0, 2.0, 3.0], 7), vec![1, 1, 1]);
}

#[test]
fn test_assemble_layout_is_fraction_major() {
    let matrix = ScoreMatrixBuilder::assemble(two_groups(), &[0.4, 0.2], None).expect("matrix");

    assert_eq!(matrix.fractions, vec![0.2, 0.4]);
    assert_eq!(matrix.votes.shape(), (5, 6));
    assert_eq!(matrix.scores.shape(), (5, 6));
    assert_eq!(matrix.n_detectors(), 3);

    assert_eq!(matrix.groups[0].instance_range, 0..4);
    assert_eq!(matrix.groups[0].detector_range, 0..2);
    assert_eq!(matrix.groups[1].instance_range, 4..6);
    assert_eq!(matrix.groups[1].detector_range, 2..3);

    // fraction 0.2 flags one instance, 0.4 flags two
    assert_eq!(matrix.votes.column(0).as_slice(), &[0, 0, 0, 0, 1]);
    assert_eq!(matrix.votes.column(1).as_slice(), &[1, 0, 0, 0, 0]);
    assert_eq!(matrix.votes.column(2).as_slice(), &[0, 0, 0, 1, 1]);
    assert_eq!(matrix.votes.column(3).as_slice(), &[1, 1, 0, 0, 0]);
    assert_eq!(matrix.votes.column(4).as_slice(), &[0, 0, 1, 0, 0]);
    assert_eq!(matrix.votes.column(5).as_slice(), &[0, 0, 1, 0, 0]);

    assert_eq!(matrix.scores.column(3).as_slice(), &[5.0, 4.0, 3.0, 2.0, 1.0]);
    assert_eq!(matrix.column_names[2], "a0 @ 0.4");
    assert_eq!(matrix.column_names[4], "b0 @ 0.2");
}

#[test]
fn test_assemble_best_f1_with_labels() {
    let labels = [0, 0, 1, 0, 0];
    let matrix =
        ScoreMatrixBuilder::assemble(two_groups(), &[0.2, 0.4], Some(&labels)).expect("matrix");

    assert_eq!(matrix.groups[0].best_f1, Some(0.0));
    assert_eq!(matrix.groups[1].best_f1, Some(1.0));
    let (best, methods) = matrix.best_unsupervised().expect("labels were supplied");
    assert!((best - 1.0).abs() < 1e-6);
    assert_eq!(methods, vec!["b".to_string()]);
}

#[test]
fn test_best_unsupervised_without_labels() {
    let matrix = ScoreMatrixBuilder::assemble(two_groups(), &[0.2], None).expect("matrix");
    assert!(matrix.best_unsupervised().is_none());
    assert!(matrix.groups.iter().all(|g| g.best_f1.is_none()));
}

#[test]
fn test_assemble_rejects_bad_input() {
    assert!(ScoreMatrixBuilder::assemble(vec![], &[0.1], None).is_err());
    assert!(ScoreMatrixBuilder::assemble(two_groups(), &[], None).is_err());
    assert!(ScoreMatrixBuilder::assemble(two_groups(), &[0.2], Some(&[0, 1])).is_err());

    let ragged = vec![group("a", vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]])];
    assert!(ScoreMatrixBuilder::assemble(ragged, &[0.2], None).is_err());

    let empty_group = vec![group("a", vec![vec![1.0, 2.0]]), group("b", vec![])];
    assert!(ScoreMatrixBuilder::assemble(empty_group, &[0.2], None).is_err());
}

#[test]
fn test_build_knn_sweep_flags_far_point() {
    let x = Matrix::from_vec(
        9,
        2,
        vec![
            1.0, 1.0, 1.1, 1.0, 1.0, 1.1, 0.9, 0.9, 1.1, 1.1, 1.0, 0.9, 0.9, 1.1, 0.9, 1.0, 8.0,
            8.0,
        ],
    )
    .expect("9x2 matrix");
    let params = AutoOdParameters::new()
        .with_methods(vec![DetectionMethod::Knn])
        .with_k_range(vec![2, 3])
        .with_n_range(vec![0.1, 0.2]);

    let matrix = ScoreMatrixBuilder::new(params).build(&x, None).expect("matrix");

    assert_eq!(matrix.votes.shape(), (9, 4));
    assert_eq!(matrix.groups.len(), 1);
    assert_eq!(matrix.groups[0].name, "KNN");
    assert_eq!(matrix.n_detectors(), 2);
    assert!(matrix.votes.row_slice(8).iter().all(|&v| v == 1));
}

#[test]
fn test_build_rejects_empty_features() {
    let x = Matrix::from_vec(0, 2, vec![]).expect("0x2 matrix");
    let builder = ScoreMatrixBuilder::new(AutoOdParameters::new());
    assert!(builder.build(&x, None).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_threshold_flags_at_most_k(
        scores in proptest::collection::vec(0u8..20, 1..60),
        k in 0usize..70,
    ) {
        let scores: Vec<f32> = scores.into_iter().map(f32::from).collect();
        let votes = threshold_votes(&scores, k);
        let flagged = votes.iter().filter(|&&v| v == 1).count();
        if k >= scores.len() {
            prop_assert_eq!(flagged, scores.len());
        } else {
            prop_assert!(flagged <= k);
        }
    }

    #[test]
    fn prop_threshold_exact_without_ties(n in 1usize..60, k in 0usize..60) {
        let scores: Vec<f32> = (0..n).map(|i| ((i * 7919) % n) as f32).collect();
        let votes = threshold_votes(&scores, k);
        let flagged = votes.iter().filter(|&&v| v == 1).count();
        prop_assert_eq!(flagged, k.min(n));
    }
}
