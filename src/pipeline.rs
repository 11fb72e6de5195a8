//! End-to-end AutoOD run.
//!
//! Loads a dataset, builds the detector matrix, scores the majority-vote
//! baseline, trains the ensemble and writes the predictions to disk.

use crate::config::AutoOdParameters;
use crate::data::Dataset;
use crate::ensemble::{majority_vote, AutoOdTrainer, ScoreMatrixBuilder, TrainingReport};
use crate::error::{AutoOdError, Result};
use crate::metrics::f1_score;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Summary of one run, as reported to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoOdResults {
    /// Best F1 of any single detector column.
    pub best_unsupervised_f1_score: f32,
    /// Methods reaching that F1.
    pub best_unsupervised_methods: Vec<String>,
    /// F1 of the majority vote.
    pub mv_f1_score: f32,
    /// F1 of the final AutoOD predictions.
    pub autood_f1_score: f32,
    /// File name of the prediction artifact.
    pub results_file_name: String,
    /// Non-empty only when the dataset could not be loaded.
    pub error_message: String,
    /// Training diagnostics, absent after a load failure.
    pub report: Option<TrainingReport>,
}

impl AutoOdResults {
    /// Result of a run that failed to load its input.
    #[must_use]
    pub fn load_failure(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            ..Self::default()
        }
    }

    /// True if the run stopped at loading.
    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.error_message.is_empty()
    }
}

/// Predictions and scores of [`AutoOd::detect`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// 0/1 label per instance.
    pub predictions: Vec<usize>,
    /// Training diagnostics.
    pub report: TrainingReport,
    /// Best single-method F1 and the methods reaching it.
    pub best_unsupervised: Option<(f32, Vec<String>)>,
    /// Majority-vote F1.
    pub majority_vote_f1: Option<f32>,
    /// F1 of `predictions`.
    pub autood_f1: Option<f32>,
}

/// The AutoOD pipeline.
#[derive(Debug, Clone)]
pub struct AutoOd {
    params: AutoOdParameters,
}

impl AutoOd {
    /// Creates a pipeline with the given parameters.
    #[must_use]
    pub fn new(params: AutoOdParameters) -> Self {
        Self { params }
    }

    /// The run parameters.
    #[must_use]
    pub fn params(&self) -> &AutoOdParameters {
        &self.params
    }

    /// Runs detection in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid, a detector fails, or
    /// training fails.
    pub fn detect(&self, dataset: &Dataset) -> Result<Detection> {
        self.params.validate()?;
        info!(
            rows = dataset.n_samples(),
            features = dataset.n_features(),
            labelled = dataset.labels.is_some(),
            "Dataset size"
        );
        let labels = dataset.labels.as_deref();

        let matrix = ScoreMatrixBuilder::new(self.params.clone()).build(&dataset.features, labels)?;
        let best_unsupervised = matrix.best_unsupervised();
        if let Some((f1, methods)) = &best_unsupervised {
            info!(f1, ?methods, "Best unsupervised F-1");
        }

        let majority_vote_f1 = labels
            .map(|y| f1_score(y, &majority_vote(&matrix.votes)))
            .transpose()?;
        if let Some(f1) = majority_vote_f1 {
            info!(f1, "F-1 for majority vote");
        }

        let outcome = AutoOdTrainer::new(&self.params, &dataset.features, labels)?.train(&matrix)?;
        let autood_f1 = labels
            .map(|y| f1_score(y, &outcome.predictions))
            .transpose()?;
        if let Some(f1) = autood_f1 {
            info!(f1, "Final AutoOD F-1");
        }

        Ok(Detection {
            predictions: outcome.predictions,
            report: outcome.report,
            best_unsupervised,
            majority_vote_f1,
            autood_f1,
        })
    }

    /// Runs detection and writes `results_<name>_<unix-seconds>.csv` into
    /// `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails or the artifact cannot be written.
    pub fn run(
        &self,
        dataset_name: &str,
        dataset: &Dataset,
        output_dir: impl AsRef<Path>,
    ) -> Result<AutoOdResults> {
        let detection = self.detect(dataset)?;

        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)?;
        let results_file_name = format!("results_{dataset_name}_{}.csv", unix_seconds());
        write_predictions(output_dir.join(&results_file_name), &detection.predictions)?;
        info!(
            file = %results_file_name,
            predictions = detection.predictions.len(),
            "Wrote prediction results"
        );

        let (best_f1, best_methods) = detection.best_unsupervised.unwrap_or_default();
        Ok(AutoOdResults {
            best_unsupervised_f1_score: best_f1,
            best_unsupervised_methods: best_methods,
            mv_f1_score: detection.majority_vote_f1.unwrap_or(0.0),
            autood_f1_score: detection.autood_f1.unwrap_or(0.0),
            results_file_name,
            error_message: String::new(),
            report: Some(detection.report),
        })
    }

    /// Loads `path` with the configured columns, then [`run`](Self::run)s
    /// under the file stem as dataset name.
    ///
    /// A load failure is not an error: it comes back as
    /// [`AutoOdResults::load_failure`].
    ///
    /// # Errors
    ///
    /// Returns an error if a stage after loading fails.
    pub fn run_from_path(
        &self,
        path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<AutoOdResults> {
        let path = path.as_ref();
        let dataset_name = path
            .file_stem()
            .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().into_owned());
        info!(dataset = %dataset_name, "Dataset name");

        let dataset = match Dataset::load(
            path,
            self.params.index_col.as_deref(),
            self.params.label_col.as_deref(),
        ) {
            Ok(dataset) => dataset,
            Err(err) => {
                let message = match err {
                    AutoOdError::DatasetLoad { .. } => err.to_string(),
                    other => format!("Cannot load data from file {}: {other}", path.display()),
                };
                warn!(%message, "Dataset load failed");
                return Ok(AutoOdResults::load_failure(message));
            }
        };
        self.run(&dataset_name, &dataset, output_dir)
    }
}

/// Writes one `index,value` row per prediction under a `,0` header.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_predictions(path: impl AsRef<Path>, predictions: &[usize]) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["", "0"])?;
    for (i, value) in predictions.iter().enumerate() {
        writer.write_record([i.to_string(), value.to_string()])?;
    }
    writer.flush()?;
    Ok(path.to_path_buf())
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::DetectionMethod;
    use crate::primitives::Matrix;
    use tempfile::TempDir;

    fn dataset() -> Dataset {
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            data.push(0.1 * (i % 8) as f32);
            data.push(0.1 * (i / 8) as f32);
            labels.push(0);
        }
        for i in 0..5 {
            data.push(7.0 + 0.1 * i as f32);
            data.push(7.0 - 0.1 * i as f32);
            labels.push(1);
        }
        Dataset::new(Matrix::from_vec(45, 2, data).expect("45x2 matrix"), Some(labels))
            .expect("dataset")
    }

    fn params() -> AutoOdParameters {
        AutoOdParameters::new()
            .with_methods(vec![DetectionMethod::Knn])
            .with_k_range(vec![3, 5])
            .with_n_range(vec![0.1, 0.12])
    }

    #[test]
    fn test_write_predictions_format() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_predictions(dir.path().join("out.csv"), &[0, 1, 0]).expect("write");
        let text = std::fs::read_to_string(path).expect("read back");
        assert_eq!(text, ",0\n0,0\n1,1\n2,0\n");
    }

    #[test]
    fn test_detect_reports_scores() {
        let detection = AutoOd::new(params()).detect(&dataset()).expect("detect");
        assert_eq!(detection.predictions.len(), 45);
        assert!(detection.predictions.iter().all(|&p| p <= 1));
        assert!(detection.majority_vote_f1.is_some());
        assert!(detection.autood_f1.is_some());
        let (best, methods) = detection.best_unsupervised.expect("labelled data");
        assert!(best > 0.5);
        assert_eq!(methods, vec!["KNN".to_string()]);
    }

    #[test]
    fn test_run_writes_artifact() {
        let dir = TempDir::new().expect("temp dir");
        let results = AutoOd::new(params())
            .run("toy", &dataset(), dir.path())
            .expect("run");

        assert!(!results.is_error());
        assert!(results.results_file_name.starts_with("results_toy_"));
        assert!(results.results_file_name.ends_with(".csv"));
        let text = std::fs::read_to_string(dir.path().join(&results.results_file_name))
            .expect("artifact exists");
        assert_eq!(text.lines().count(), 46);
        assert!(results.report.is_some());
    }

    #[test]
    fn test_run_from_path_load_failure() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("missing.csv");
        let results = AutoOd::new(params())
            .run_from_path(&missing, dir.path())
            .expect("load failures are reported in the results");

        assert!(results.is_error());
        assert!(results.error_message.starts_with("Cannot load data from file"));
        assert!(results.results_file_name.is_empty());
        assert!(results.report.is_none());
    }

    #[test]
    fn test_run_from_path_missing_label_column() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b\n1,2\n3,4\n").expect("write csv");
        let params = params().with_columns(None, Some("label".to_string()));

        let results = AutoOd::new(params)
            .run_from_path(&path, dir.path())
            .expect("reported in the results");
        assert!(results.error_message.contains("label"));
    }

    #[test]
    fn test_run_from_path_nan_cell_is_load_failure() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b\n1,2\nNaN,4\n5,6\n").expect("write csv");

        let results = AutoOd::new(params())
            .run_from_path(&path, dir.path())
            .expect("reported in the results");
        assert!(results.is_error());
        assert!(results.error_message.contains("not a finite number"));
        assert!(results.results_file_name.is_empty());
    }

    #[test]
    fn test_detect_rejects_invalid_params() {
        let params = AutoOdParameters::new().with_n_range(vec![]);
        assert!(AutoOd::new(params).detect(&dataset()).is_err());
    }
}
