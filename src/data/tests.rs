use super::*;
use std::io::Write;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create file");
    file.write_all(contents.as_bytes()).expect("write file");
    path
}

const ARFF: &str = "\
% outlier benchmark
@RELATION toy

@ATTRIBUTE 'att1' real
@ATTRIBUTE att2 numeric
@ATTRIBUTE 'id' integer
@ATTRIBUTE 'outlier' {'yes','no'}

@DATA
0.5,1.5,1,'no'
0.6,1.4,2,'no'
9.0,9.5,3,'yes'
";

#[test]
fn test_dataset_new_checks_labels() {
    let x = Matrix::from_vec(2, 1, vec![0.0, 1.0]).expect("2x1 matrix");
    assert!(Dataset::new(x.clone(), Some(vec![0])).is_err());
    assert!(Dataset::new(x.clone(), Some(vec![0, 2])).is_err());
    let dataset = Dataset::new(x, None).expect("unlabelled");
    assert_eq!(dataset.n_features(), 1);
    assert!(dataset.labels.is_none());
}

#[test]
fn test_parse_label() {
    assert_eq!(parse_label("1"), Some(1));
    assert_eq!(parse_label("0.0"), Some(0));
    assert_eq!(parse_label("Yes"), Some(1));
    assert_eq!(parse_label("'no'"), Some(0));
    assert_eq!(parse_label("TRUE"), Some(1));
    assert_eq!(parse_label("2"), None);
    assert_eq!(parse_label("maybe"), None);
}

#[test]
fn test_load_csv_with_index_and_label() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(
        &dir,
        "data.csv",
        "idx,a,b,label\n0,1.0,2.0,0\n1,1.5,2.5,no\n2,9.0,9.0,yes\n",
    );

    let dataset = Dataset::load(&path, Some("idx"), Some("label")).expect("load");

    assert_eq!(dataset.features.shape(), (3, 2));
    assert_eq!(dataset.feature_names, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(dataset.labels, Some(vec![0, 0, 1]));
    assert!((dataset.features.get(2, 1) - 9.0).abs() < 1e-6);
}

#[test]
fn test_load_csv_without_label_keeps_all_columns() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, "plain.csv", "a, b\n1, 2\n3, 4\n");

    let dataset = Dataset::load(&path, None, None).expect("load");
    assert_eq!(dataset.features.shape(), (2, 2));
    assert!(dataset.labels.is_none());
}

#[test]
fn test_load_csv_missing_column() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, "data.csv", "a,b\n1,2\n");

    let err = Dataset::load(&path, None, Some("label")).unwrap_err();
    match err {
        AutoOdError::MissingColumn { column, available } => {
            assert_eq!(column, "label");
            assert_eq!(available, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_load_csv_rejects_text_cells() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, "data.csv", "a,b\n1,2\nx,4\n");

    let err = Dataset::load(&path, None, None).unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("Cannot load data from file"));
    assert!(msg.contains("'x'"));
}

#[test]
fn test_load_csv_rejects_non_finite_cells() {
    let dir = TempDir::new().expect("temp dir");
    for cell in ["NaN", "inf", "-inf"] {
        let path = write_file(&dir, "data.csv", &format!("a,b\n1,2\n3,{cell}\n"));

        let err = Dataset::load(&path, None, None).unwrap_err();
        assert!(matches!(err, AutoOdError::DatasetLoad { .. }));
        let msg = err.to_string();
        assert!(msg.contains("row 2"), "{msg}");
        assert!(msg.contains("column 'b'"), "{msg}");
    }
}

#[test]
fn test_parse_arff_rejects_nan() {
    let err = arff::parse("@attribute a real\n@attribute b real\n@data\n1,2\nnan,4\n")
        .unwrap_err();
    assert!(err.contains("data row 2"));
    assert!(err.contains("'a'"));
}

#[test]
fn test_load_csv_without_rows() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, "empty.csv", "a,b\n");
    assert!(matches!(
        Dataset::load(&path, None, None),
        Err(AutoOdError::DatasetLoad { .. })
    ));
}

#[test]
fn test_load_arff_drops_id_and_reads_outlier() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, "toy.arff", ARFF);

    let dataset = Dataset::load(&path, None, None).expect("load");

    assert_eq!(dataset.features.shape(), (3, 2));
    assert_eq!(dataset.feature_names, vec!["att1".to_string(), "att2".to_string()]);
    assert_eq!(dataset.labels, Some(vec![0, 0, 1]));
}

#[test]
fn test_parse_arff_errors() {
    assert!(arff::parse("@data\n1,2\n").is_err());
    assert!(arff::parse("@attribute a real\n@data\n").is_err());
    assert!(arff::parse("@attribute a real\n@data\nfoo\n").is_err());
    assert!(arff::parse("@attribute a real\n@attribute b real\n@data\n1\n").is_err());
}

#[test]
fn test_load_unsupported_extension() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_file(&dir, "data.xlsx", "a,b\n1,2\n");

    let err = Dataset::load(&path, None, None).unwrap_err();
    assert!(err.to_string().contains("unsupported file type"));
}

#[test]
fn test_load_missing_file() {
    let err = Dataset::load("/nonexistent/data.csv", None, None).unwrap_err();
    assert!(matches!(err, AutoOdError::DatasetLoad { .. }));
}
