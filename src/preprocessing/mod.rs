//! Preprocessing transformers.
//!
//! # Example
//!
//! ```
//! use autood::prelude::*;
//! use autood::preprocessing::RobustScaler;
//!
//! let data = Matrix::from_vec(5, 1, vec![1.0, 2.0, 3.0, 4.0, 100.0])
//!     .expect("valid matrix dimensions");
//!
//! let mut scaler = RobustScaler::new();
//! let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
//!
//! // The median maps to zero; the outlier does not drag the center.
//! assert!(scaled.get(2, 0).abs() < 1e-6);
//! ```

use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;
use crate::stats;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Scales features using statistics that are robust to outliers.
///
/// Each column is centered on its median and divided by its interquartile
/// range: `z = (x - median) / (Q3 - Q1)`. A column with zero IQR is only
/// centered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobustScaler {
    /// Median of each feature (computed during fit).
    center: Option<Vec<f32>>,
    /// Interquartile range of each feature (computed during fit).
    scale: Option<Vec<f32>>,
    /// Lower and upper quantiles defining the range, default (0.25, 0.75).
    quantile_range: (f64, f64),
}

impl Default for RobustScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl RobustScaler {
    /// Creates a new `RobustScaler` using the (25%, 75%) quantile range.
    #[must_use]
    pub fn new() -> Self {
        Self {
            center: None,
            scale: None,
            quantile_range: (0.25, 0.75),
        }
    }

    /// Sets the quantile range used for the scale.
    #[must_use]
    pub fn with_quantile_range(mut self, lower: f64, upper: f64) -> Self {
        self.quantile_range = (lower, upper);
        self
    }

    /// Returns the median of each feature.
    ///
    /// # Panics
    ///
    /// Panics if the scaler is not fitted.
    #[must_use]
    pub fn center(&self) -> &[f32] {
        self.center
            .as_ref()
            .expect("Scaler not fitted. Call fit() first.")
    }

    /// Returns the scale (IQR) of each feature.
    ///
    /// # Panics
    ///
    /// Panics if the scaler is not fitted.
    #[must_use]
    pub fn scale(&self) -> &[f32] {
        self.scale
            .as_ref()
            .expect("Scaler not fitted. Call fit() first.")
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.center.is_some()
    }
}

impl Transformer for RobustScaler {
    /// Computes the median and IQR of each feature.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();

        if n_samples == 0 {
            return Err("Cannot fit with zero samples".into());
        }
        let (lower, upper) = self.quantile_range;
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower > upper {
            return Err(AutoOdError::invalid_hyperparameter(
                "quantile_range",
                format!("({lower}, {upper})"),
                "0 <= lower <= upper <= 1",
            ));
        }

        let mut center = Vec::with_capacity(n_features);
        let mut scale = Vec::with_capacity(n_features);
        for j in 0..n_features {
            let column = x.column(j);
            center.push(stats::median(column.as_slice())?);
            let q_low = stats::quantile(column.as_slice(), lower)?;
            let q_high = stats::quantile(column.as_slice(), upper)?;
            let range = q_high - q_low;
            scale.push(if range.abs() > 1e-10 { range } else { 1.0 });
        }

        self.center = Some(center);
        self.scale = Some(scale);

        Ok(())
    }

    /// Centers and scales the data using fitted median and IQR.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let center = self
            .center
            .as_ref()
            .ok_or_else(|| AutoOdError::from("Scaler not fitted"))?;
        let scale = self
            .scale
            .as_ref()
            .ok_or_else(|| AutoOdError::from("Scaler not fitted"))?;

        let (n_samples, n_features) = x.shape();
        if n_features != center.len() {
            return Err(AutoOdError::dimension_mismatch(
                "features",
                center.len(),
                n_features,
            ));
        }

        let mut result = Vec::with_capacity(n_samples * n_features);
        for i in 0..n_samples {
            for j in 0..n_features {
                result.push((x.get(i, j) - center[j]) / scale[j]);
            }
        }

        Matrix::from_vec(n_samples, n_features, result).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests;
