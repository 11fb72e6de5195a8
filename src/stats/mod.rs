//! Descriptive statistics over `f32` slices.
//!
//! - Quantiles using the R-7 method (Hyndman & Fan 1996), the default of
//!   R, `NumPy` and Pandas
//! - Median and interquartile range (the robust-scaling statistics)
//! - Mean and population standard deviation
//! - Covariance matrices and Pearson correlation
//!
//! # Examples
//!
//! ```
//! use autood::stats::{quantile, median};
//!
//! let data = [1.0, 2.0, 3.0, 4.0, 5.0];
//! assert_eq!(median(&data).expect("non-empty"), 3.0);
//! assert_eq!(quantile(&data, 0.0).expect("non-empty"), 1.0);
//! assert_eq!(quantile(&data, 1.0).expect("non-empty"), 5.0);
//! ```

pub mod covariance;

pub use covariance::{corr, cov_matrix, pearson};

use crate::error::{AutoOdError, Result};

/// Compute a quantile using linear interpolation (R-7 method).
///
/// Uses `select_nth_unstable_by` so a single quantile costs O(n) on average.
///
/// # Errors
///
/// Returns error if the data is empty or `q` is not in [0, 1].
pub fn quantile(data: &[f32], q: f64) -> Result<f32> {
    if data.is_empty() {
        return Err(AutoOdError::empty_input("quantile"));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(AutoOdError::invalid_hyperparameter("q", q, "in [0, 1]"));
    }

    let n = data.len();
    if n == 1 {
        return Ok(data[0]);
    }

    // R-7: h = (n - 1) * q, 0-indexed position in the sorted data
    let h = (n - 1) as f64 * q;
    let h_floor = h.floor() as usize;
    let h_ceil = h.ceil() as usize;

    let mut working_copy = data.to_vec();
    working_copy.select_nth_unstable_by(h_floor, f32::total_cmp);
    let lower = working_copy[h_floor];

    if h_floor == h_ceil {
        return Ok(lower);
    }

    // Everything right of h_floor is >= lower, so the ceil element is the
    // minimum of that partition.
    let upper = working_copy[h_floor + 1..]
        .iter()
        .copied()
        .fold(f32::INFINITY, f32::min);

    let fraction = (h - h_floor as f64) as f32;
    Ok(lower + fraction * (upper - lower))
}

/// Median (50th percentile).
///
/// # Errors
///
/// Returns error if the data is empty.
pub fn median(data: &[f32]) -> Result<f32> {
    quantile(data, 0.5)
}

/// Interquartile range Q3 - Q1.
///
/// # Errors
///
/// Returns error if the data is empty.
pub fn iqr(data: &[f32]) -> Result<f32> {
    Ok(quantile(data, 0.75)? - quantile(data, 0.25)?)
}

/// Arithmetic mean, `0.0` for empty input.
#[must_use]
pub fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f32>() / data.len() as f32
}

/// Population standard deviation (divide by n), `0.0` for empty input.
#[must_use]
pub fn std(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let var = data.iter().map(|&x| (x - m) * (x - m)).sum::<f32>() / data.len() as f32;
    var.sqrt()
}
