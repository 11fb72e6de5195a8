use super::*;
use proptest::prelude::*;

#[test]
fn test_robust_scaler_centers_on_median() {
    let data = Matrix::from_vec(5, 2, vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0, 5.0, 50.0])
        .expect("5x2 matrix");

    let mut scaler = RobustScaler::new();
    let scaled = scaler.fit_transform(&data).expect("fit_transform");

    assert_eq!(scaler.center(), &[3.0, 30.0]);
    // IQR of 1..5 with R-7 is 4 - 2 = 2
    assert!((scaler.scale()[0] - 2.0).abs() < 1e-6);
    assert!((scaler.scale()[1] - 20.0).abs() < 1e-5);
    assert!(scaled.get(2, 0).abs() < 1e-6);
    assert!((scaled.get(4, 0) - 1.0).abs() < 1e-6);
    assert!((scaled.get(0, 1) + 1.0).abs() < 1e-6);
}

#[test]
fn test_robust_scaler_ignores_extreme_value() {
    let data = Matrix::from_vec(5, 1, vec![1.0, 2.0, 3.0, 4.0, 1.0e6]).expect("5x1 matrix");
    let mut scaler = RobustScaler::new();
    scaler.fit(&data).expect("fit");
    assert!((scaler.center()[0] - 3.0).abs() < 1e-6);
    assert!((scaler.scale()[0] - 2.0).abs() < 1e-6);
}

#[test]
fn test_robust_scaler_constant_column() {
    let data = Matrix::from_vec(3, 1, vec![7.0, 7.0, 7.0]).expect("3x1 matrix");
    let mut scaler = RobustScaler::new();
    let scaled = scaler.fit_transform(&data).expect("fit_transform");
    assert!((scaler.scale()[0] - 1.0).abs() < 1e-6);
    assert!(scaled.as_slice().iter().all(|v| v.abs() < 1e-6));
}

#[test]
fn test_robust_scaler_not_fitted() {
    let scaler = RobustScaler::new();
    let data = Matrix::from_vec(1, 1, vec![1.0]).expect("1x1 matrix");
    assert!(!scaler.is_fitted());
    assert!(scaler.transform(&data).is_err());
}

#[test]
fn test_robust_scaler_dimension_mismatch() {
    let mut scaler = RobustScaler::new();
    scaler
        .fit(&Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).expect("2x2 matrix"))
        .expect("fit");
    let wrong = Matrix::from_vec(2, 1, vec![1.0, 2.0]).expect("2x1 matrix");
    let err = scaler.transform(&wrong).unwrap_err();
    assert!(err.to_string().contains("dimension mismatch"));
}

#[test]
fn test_robust_scaler_invalid_range() {
    let mut scaler = RobustScaler::new().with_quantile_range(0.8, 0.2);
    let data = Matrix::from_vec(2, 1, vec![1.0, 2.0]).expect("2x1 matrix");
    assert!(scaler.fit(&data).is_err());
}

#[test]
fn test_robust_scaler_empty() {
    let mut scaler = RobustScaler::new();
    let data = Matrix::from_vec(0, 3, vec![]).expect("0x3 matrix");
    assert!(scaler.fit(&data).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_scaled_median_is_zero(
        data in proptest::collection::vec(-500.0f32..500.0, 3..40),
    ) {
        let n = data.len();
        let x = Matrix::from_vec(n, 1, data).expect("n x 1 matrix");
        let mut scaler = RobustScaler::new();
        let scaled = scaler.fit_transform(&x).expect("fit_transform");
        let median = crate::stats::median(scaled.as_slice()).expect("non-empty");
        prop_assert!(median.abs() * scaler.scale()[0] < 1e-2);
    }
}
