//! Minimal ARFF reader for outlier benchmark files.
//!
//! Supports `@attribute` declarations and a dense `@data` section. The `id`
//! column is dropped and `outlier` (`yes`/`no`) becomes the labels.

use super::Dataset;
use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;
use std::path::Path;

const ID_COLUMN: &str = "id";
const LABEL_COLUMN: &str = "outlier";

pub(super) fn load(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AutoOdError::dataset_load(path, e.to_string()))?;
    parse(&text).map_err(|reason| AutoOdError::dataset_load(path, reason))
}

/// Parses ARFF text. Errors are plain messages; the caller adds the path.
pub(super) fn parse(text: &str) -> std::result::Result<Dataset, String> {
    let mut attributes = Vec::new();
    let mut lines = text.lines();

    for line in lines.by_ref() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("@attribute") {
            attributes.push(attribute_name(line["@attribute".len()..].trim())?);
        } else if lower.starts_with("@data") {
            break;
        } else if !lower.starts_with("@relation") {
            return Err(format!("unexpected header line '{line}'"));
        }
    }
    if attributes.is_empty() {
        return Err("no @attribute declarations".to_string());
    }

    let label_pos = attributes.iter().position(|a| a == LABEL_COLUMN);
    let feature_cols: Vec<usize> = (0..attributes.len())
        .filter(|&j| attributes[j] != ID_COLUMN && Some(j) != label_pos)
        .collect();
    if feature_cols.is_empty() {
        return Err("no feature attributes".to_string());
    }

    let body: String = lines
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('%'))
        .collect::<Vec<_>>()
        .join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .quote(b'\'')
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut data = Vec::new();
    let mut labels = Vec::new();
    let mut n_rows = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() != attributes.len() {
            return Err(format!(
                "data row {} has {} values, expected {}",
                row + 1,
                record.len(),
                attributes.len()
            ));
        }
        for &j in &feature_cols {
            let cell = &record[j];
            let value = cell
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    format!(
                        "data row {}: attribute '{}' value '{cell}' is not a finite number",
                        row + 1,
                        attributes[j]
                    )
                })?;
            data.push(value);
        }
        if let Some(j) = label_pos {
            labels.push(usize::from(record[j].trim_matches('"') == "yes"));
        }
        n_rows += 1;
    }
    if n_rows == 0 {
        return Err("no data rows".to_string());
    }

    let features =
        Matrix::from_vec(n_rows, feature_cols.len(), data).map_err(str::to_string)?;
    let names = feature_cols.iter().map(|&j| attributes[j].clone()).collect();
    Dataset::with_names(features, label_pos.map(|_| labels), names).map_err(|e| e.to_string())
}

/// Name of an `@attribute` declaration, with quotes removed.
fn attribute_name(declaration: &str) -> std::result::Result<String, String> {
    let mut chars = declaration.chars();
    match chars.next() {
        Some(quote @ ('\'' | '"')) => {
            let name: String = chars.by_ref().take_while(|&c| c != quote).collect();
            if name.is_empty() {
                return Err(format!("empty attribute name in '{declaration}'"));
            }
            Ok(name)
        }
        Some(_) => declaration
            .split_whitespace()
            .next()
            .map(str::to_string)
            .ok_or_else(|| format!("bad attribute '{declaration}'")),
        None => Err("empty @attribute declaration".to_string()),
    }
}
