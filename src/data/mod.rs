//! Dataset loading.
//!
//! Reads a feature matrix and optional ground-truth labels from CSV or ARFF.
//!
//! # Examples
//!
//! ```
//! use autood::data::Dataset;
//! use autood::primitives::Matrix;
//!
//! let x = Matrix::from_vec(3, 1, vec![0.0, 0.1, 9.0]).expect("3x1 matrix");
//! let dataset = Dataset::new(x, Some(vec![0, 0, 1])).expect("labels match rows");
//! assert_eq!(dataset.n_samples(), 3);
//! assert_eq!(dataset.feature_names, vec!["x0".to_string()]);
//! ```

mod arff;

use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;
use std::path::Path;
use tracing::info;

/// Features plus optional 0/1 labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// N × D feature matrix.
    pub features: Matrix<f32>,
    /// Ground truth, 1 for outliers.
    pub labels: Option<Vec<usize>>,
    /// One name per feature column.
    pub feature_names: Vec<String>,
}

impl Dataset {
    /// Wraps an in-memory matrix, naming the columns `x0`, `x1`, ...
    ///
    /// # Errors
    ///
    /// Returns an error if the label count differs from the row count or a
    /// label is not 0/1.
    pub fn new(features: Matrix<f32>, labels: Option<Vec<usize>>) -> Result<Self> {
        let names = (0..features.n_cols()).map(|j| format!("x{j}")).collect();
        Self::with_names(features, labels, names)
    }

    /// Like [`new`](Self::new) with explicit column names.
    ///
    /// # Errors
    ///
    /// Returns an error on a label or name count mismatch, or a non-binary
    /// label.
    pub fn with_names(
        features: Matrix<f32>,
        labels: Option<Vec<usize>>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if feature_names.len() != features.n_cols() {
            return Err(AutoOdError::dimension_mismatch(
                "feature names",
                features.n_cols(),
                feature_names.len(),
            ));
        }
        if let Some(y) = &labels {
            if y.len() != features.n_rows() {
                return Err(AutoOdError::dimension_mismatch("labels", features.n_rows(), y.len()));
            }
            if let Some(&bad) = y.iter().find(|&&v| v > 1) {
                return Err(AutoOdError::Other(format!("label {bad} is not 0 or 1")));
            }
        }
        Ok(Self {
            features,
            labels,
            feature_names,
        })
    }

    /// Number of instances.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.n_rows()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.features.n_cols()
    }

    /// Loads a `.csv` or `.arff` file.
    ///
    /// For CSV, `index_col` is dropped and `label_col` becomes the labels.
    /// ARFF files always drop `id` and read labels from `outlier`.
    ///
    /// # Errors
    ///
    /// Returns `DatasetLoad` for unreadable files, unsupported extensions
    /// and non-numeric or non-finite cells, or `MissingColumn` for an unknown column.
    pub fn load(
        path: impl AsRef<Path>,
        index_col: Option<&str>,
        label_col: Option<&str>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let dataset = match extension.as_deref() {
            Some("csv") => load_csv(path, index_col, label_col)?,
            Some("arff") => arff::load(path)?,
            _ => return Err(AutoOdError::dataset_load(path, "unsupported file type")),
        };
        info!(
            path = %path.display(),
            rows = dataset.n_samples(),
            features = dataset.n_features(),
            labelled = dataset.labels.is_some(),
            "Loaded dataset"
        );
        Ok(dataset)
    }
}

fn load_csv(path: &Path, index_col: Option<&str>, label_col: Option<&str>) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AutoOdError::dataset_load(path, e.to_string()))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AutoOdError::dataset_load(path, e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let position = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| AutoOdError::MissingColumn {
                column: column.to_string(),
                available: headers.clone(),
            })
    };
    let index_pos = index_col.map(position).transpose()?;
    let label_pos = label_col.map(position).transpose()?;

    let feature_cols: Vec<usize> = (0..headers.len())
        .filter(|&j| Some(j) != index_pos && Some(j) != label_pos)
        .collect();
    if feature_cols.is_empty() {
        return Err(AutoOdError::dataset_load(path, "no feature columns"));
    }

    let mut data = Vec::new();
    let mut labels = Vec::new();
    let mut n_rows = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| AutoOdError::dataset_load(path, e.to_string()))?;
        for &j in &feature_cols {
            let cell = record.get(j).unwrap_or("");
            let value = cell
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    AutoOdError::dataset_load(
                        path,
                        format!(
                            "row {}: column '{}' value '{cell}' is not a finite number",
                            row + 1,
                            headers[j]
                        ),
                    )
                })?;
            data.push(value);
        }
        if let Some(j) = label_pos {
            let cell = record.get(j).unwrap_or("");
            let label = parse_label(cell).ok_or_else(|| {
                AutoOdError::dataset_load(
                    path,
                    format!("row {}: label '{cell}' is not binary", row + 1),
                )
            })?;
            labels.push(label);
        }
        n_rows += 1;
    }
    if n_rows == 0 {
        return Err(AutoOdError::dataset_load(path, "no data rows"));
    }

    let features = Matrix::from_vec(n_rows, feature_cols.len(), data)
        .map_err(|e| AutoOdError::dataset_load(path, e))?;
    let names = feature_cols.iter().map(|&j| headers[j].clone()).collect();
    Dataset::with_names(features, label_pos.map(|_| labels), names)
}

/// Reads a 0/1 label written as a number, `yes`/`no` or `true`/`false`.
pub(crate) fn parse_label(cell: &str) -> Option<usize> {
    let cell = cell.trim().trim_matches(|c| c == '\'' || c == '"');
    match cell.to_ascii_lowercase().as_str() {
        "yes" | "true" => Some(1),
        "no" | "false" => Some(0),
        other => match other.parse::<f64>() {
            Ok(v) if v == 0.0 => Some(0),
            Ok(v) if v == 1.0 => Some(1),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests;
