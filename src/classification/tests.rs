//! Tests for classification module.

use super::*;
use crate::traits::ProbabilisticClassifier;

fn two_clusters() -> (Matrix<f32>, Vec<usize>) {
    let mut data = Vec::new();
    let mut labels = Vec::new();
    for class in 0..2 {
        let offset = if class == 0 { 0.0 } else { 5.0 };
        for i in 0..20 {
            data.push(offset + 0.1 * (i % 5) as f32);
            data.push(offset + 0.1 * (i / 5) as f32);
            labels.push(class);
        }
    }
    (
        Matrix::from_vec(40, 2, data).expect("40x2 matrix"),
        labels,
    )
}

#[test]
fn test_sigmoid() {
    assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    assert!(sigmoid(10.0) > 0.99);
    assert!(sigmoid(-10.0) < 0.01);
    assert!(sigmoid(-800.0) >= 0.0);
    assert!(sigmoid(800.0) <= 1.0);
}

#[test]
fn test_validate_binary_rejects_single_class() {
    let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("3x1 matrix");
    assert!(validate_binary(&x, &[1, 1, 1]).is_err());
    assert!(validate_binary(&x, &[0, 0, 0]).is_err());
    assert_eq!(validate_binary(&x, &[0, 1, 1]).expect("both classes"), 2);
}

#[test]
fn test_validate_binary_rejects_bad_labels() {
    let x = Matrix::from_vec(2, 1, vec![1.0, 2.0]).expect("2x1 matrix");
    assert!(validate_binary(&x, &[0, 2]).is_err());
    assert!(validate_binary(&x, &[0]).is_err());
}

#[test]
fn test_logistic_regression_builder() {
    let model = LogisticRegression::new()
        .with_c(0.5)
        .with_max_iter(200)
        .with_tolerance(1e-3);
    assert!(!model.is_fitted());
    assert_eq!(model.intercept(), 0.0);
}

#[test]
fn test_logistic_regression_symmetric_data() {
    let x = Matrix::from_vec(6, 1, vec![-3.0, -2.5, -2.0, 2.0, 2.5, 3.0]).expect("6x1 matrix");
    let y = vec![0, 0, 0, 1, 1, 1];

    let mut model = LogisticRegression::new().with_max_iter(200);
    model.fit(&x, &y).expect("fit should succeed");

    assert!(model.coefficients()[0] > 0.5);
    assert!(model.intercept().abs() < 1e-3);

    let probas = model.predict_proba(&x).expect("predict_proba");
    assert!(probas[0] < 0.1);
    assert!(probas[5] > 0.9);
    assert_eq!(model.predict(&x).expect("predict"), y);
}

#[test]
fn test_logistic_regression_regularization_shrinks_weights() {
    let x = Matrix::from_vec(6, 1, vec![-3.0, -2.5, -2.0, 2.0, 2.5, 3.0]).expect("6x1 matrix");
    let y = vec![0, 0, 0, 1, 1, 1];

    let mut strong = LogisticRegression::new().with_c(0.01);
    strong.fit(&x, &y).expect("fit");
    let mut weak = LogisticRegression::new().with_c(100.0);
    weak.fit(&x, &y).expect("fit");

    assert!(strong.coefficients()[0] < weak.coefficients()[0]);
    assert!(strong.coefficients()[0] > 0.0);
}

#[test]
fn test_logistic_regression_irrelevant_feature_gets_small_weight() {
    let (x, y) = two_clusters();
    // Keep only the first column and append a column that is constant.
    let mut data = Vec::new();
    for i in 0..x.n_rows() {
        data.push(x.get(i, 0));
        data.push(1.0);
    }
    let x = Matrix::from_vec(x.n_rows(), 2, data).expect("40x2 matrix");

    let mut model = LogisticRegression::new().with_max_iter(200);
    model.fit(&x, &y).expect("fit");
    let coef = model.coefficients();
    assert!(coef[0] > coef[1].abs());
}

#[test]
fn test_logistic_regression_gradient_vanishes_at_solution() {
    // Overlapping classes with a large spread in feature scale.
    let x = Matrix::from_vec(
        8,
        2,
        vec![
            0.1, 100.0, 0.4, 250.0, 0.9, 80.0, 1.2, 300.0, 0.3, 220.0, 1.0, 90.0, 1.5, 310.0, 2.0,
            150.0,
        ],
    )
    .expect("8x2 matrix");
    let y = vec![0, 0, 0, 0, 1, 1, 1, 1];

    let mut model = LogisticRegression::new().with_max_iter(200).with_tolerance(1e-8);
    model.fit(&x, &y).expect("fit");

    let coef: Vec<f64> = model.coefficients().iter().map(|&v| f64::from(v)).collect();
    let intercept = f64::from(model.intercept());
    let mut grad = coef.clone();
    let mut grad_intercept = 0.0;
    for (i, &label) in y.iter().enumerate() {
        let row = x.row_slice(i);
        let z = intercept + coef[0] * f64::from(row[0]) + coef[1] * f64::from(row[1]);
        let err = sigmoid(z) - label as f64;
        grad[0] += err * f64::from(row[0]);
        grad[1] += err * f64::from(row[1]);
        grad_intercept += err;
    }

    assert!(grad[0].abs() < 1e-2, "grad = {grad:?}");
    assert!(grad_intercept.abs() < 1e-2, "intercept grad = {grad_intercept}");
    // The large column turns tiny f32 weight errors into big gradients.
    assert!(grad[1].abs() < 1.0, "grad = {grad:?}");
}

#[test]
fn test_logistic_regression_single_class_errors() {
    let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("3x1 matrix");
    let mut model = LogisticRegression::new();
    assert!(model.fit(&x, &[1, 1, 1]).is_err());
    assert!(!model.is_fitted());
}

#[test]
fn test_logistic_regression_not_fitted() {
    let model = LogisticRegression::new();
    let x = Matrix::from_vec(1, 1, vec![1.0]).expect("1x1 matrix");
    assert!(model.predict_proba(&x).is_err());
}

#[test]
fn test_logistic_regression_width_mismatch() {
    let x = Matrix::from_vec(4, 1, vec![-2.0, -1.0, 1.0, 2.0]).expect("4x1 matrix");
    let mut model = LogisticRegression::new();
    model.fit(&x, &[0, 0, 1, 1]).expect("fit");

    let wide = Matrix::from_vec(1, 2, vec![1.0, 2.0]).expect("1x2 matrix");
    let err = model.predict_proba(&wide).unwrap_err();
    assert!(err.to_string().contains("dimension mismatch"));
}

#[test]
fn test_svc_separates_clusters() {
    let (x, y) = two_clusters();
    let mut model = Svc::new(0);
    model.fit(&x, &y).expect("fit should succeed");

    assert!(model.is_fitted());
    assert!(model.n_support() > 0);

    let probas = model.predict_proba(&x).expect("predict_proba");
    for (p, &label) in probas.iter().zip(&y) {
        assert!((0.0..=1.0).contains(p));
        if label == 1 {
            assert!(*p > 0.5, "positive sample got {p}");
        } else {
            assert!(*p < 0.5, "negative sample got {p}");
        }
    }

    let decision = model.decision_function(&x).expect("decision_function");
    assert!(decision[0] < 0.0);
    assert!(decision[39] > 0.0);
}

#[test]
fn test_svc_same_seed_same_probabilities() {
    let (x, y) = two_clusters();
    let mut a = Svc::new(7);
    let mut b = Svc::new(7);
    a.fit(&x, &y).expect("fit");
    b.fit(&x, &y).expect("fit");
    assert_eq!(
        a.predict_proba(&x).expect("predict"),
        b.predict_proba(&x).expect("predict")
    );
}

#[test]
fn test_svc_probability_is_monotone_in_distance() {
    let (x, y) = two_clusters();
    let mut model = Svc::new(0);
    model.fit(&x, &y).expect("fit");

    // Points moving from the negative cluster towards the positive one.
    let path = Matrix::from_vec(3, 2, vec![0.2, 0.2, 2.5, 2.5, 5.2, 5.2]).expect("3x2 matrix");
    let probas = model.predict_proba(&path).expect("predict");
    assert!(probas[0] < probas[2]);
}

#[test]
fn test_svc_invalid_gamma() {
    let (x, y) = two_clusters();
    let mut model = Svc::new(0).with_gamma(-1.0);
    assert!(model.fit(&x, &y).is_err());
}

#[test]
fn test_svc_not_fitted() {
    let model = Svc::new(0);
    let x = Matrix::from_vec(1, 2, vec![1.0, 2.0]).expect("1x2 matrix");
    assert!(model.predict_proba(&x).is_err());
    assert!(model.decision_function(&x).is_err());
    assert_eq!(model.n_support(), 0);
}

#[test]
fn test_svc_small_training_set() {
    // Fewer rows than folds still yields a usable model.
    let x = Matrix::from_vec(4, 1, vec![0.0, 0.1, 3.0, 3.1]).expect("4x1 matrix");
    let y = vec![0, 0, 1, 1];
    let mut model = Svc::new(0).with_gamma(1.0);
    model.fit(&x, &y).expect("fit");
    let probas = model.predict_proba(&x).expect("predict");
    assert_eq!(probas.len(), 4);
    assert!(probas.iter().all(|p| p.is_finite()));
}
