//! Matrix type for 2D numeric data.

use super::Vector;
use serde::{Deserialize, Serialize};

/// A 2D matrix of values (row-major storage).
///
/// Vote matrices are `Matrix<u8>` and score/feature matrices are `Matrix<f32>`.
///
/// # Examples
///
/// ```
/// use autood::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("data length matches rows * cols");
/// assert_eq!(m.shape(), (2, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Matrix<T> {
    /// Creates a new matrix from a vector of data.
    ///
    /// # Errors
    ///
    /// Returns an error if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, &'static str> {
        if data.len() != rows * cols {
            return Err("Data length must equal rows * cols");
        }
        Ok(Self { data, rows, cols })
    }

    /// Builds a matrix from column vectors of equal length.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns differ in length.
    pub fn from_columns(rows: usize, columns: &[Vec<T>]) -> Result<Self, &'static str> {
        if columns.iter().any(|c| c.len() != rows) {
            return Err("All columns must have the same length");
        }
        let cols = columns.len();
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for column in columns {
                data.push(column[row]);
            }
        }
        Ok(Self { data, rows, cols })
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Returns a row as a slice.
    #[must_use]
    pub fn row_slice(&self, row_idx: usize) -> &[T] {
        let start = row_idx * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Returns a column as a Vector.
    #[must_use]
    pub fn column(&self, col_idx: usize) -> Vector<T> {
        let data: Vec<T> = (0..self.rows)
            .map(|row| self.data[row * self.cols + col_idx])
            .collect();
        Vector::from_vec(data)
    }

    /// Returns a new matrix holding the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &row in indices {
            data.extend_from_slice(self.row_slice(row));
        }
        Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    /// Returns a new matrix holding the given columns, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(self.rows * indices.len());
        for row in 0..self.rows {
            let base = row * self.cols;
            data.extend(indices.iter().map(|&col| self.data[base + col]));
        }
        Self {
            data,
            rows: self.rows,
            cols: indices.len(),
        }
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl Matrix<u8> {
    /// Sum of each row.
    #[must_use]
    pub fn row_sums(&self) -> Vec<usize> {
        (0..self.rows)
            .map(|row| self.row_slice(row).iter().map(|&v| usize::from(v)).sum())
            .collect()
    }
}

/// Dense linear algebra shared by the `f32` and `f64` matrices.
macro_rules! impl_float_matrix {
    ($t:ty) => {
        impl Matrix<$t> {
            /// Adds `value` to every diagonal element of a square matrix.
            #[must_use]
            pub fn add_diagonal(&self, value: $t) -> Self {
                let mut out = self.clone();
                for i in 0..self.rows.min(self.cols) {
                    out.data[i * self.cols + i] += value;
                }
                out
            }

            /// Solves the linear system Ax = b using Cholesky decomposition.
            ///
            /// The matrix must be symmetric positive definite.
            ///
            /// # Errors
            ///
            /// Returns an error if the matrix is not square or not positive definite.
            pub fn cholesky_solve(&self, b: &Vector<$t>) -> Result<Vector<$t>, &'static str> {
                if self.rows != self.cols {
                    return Err("Matrix must be square for Cholesky decomposition");
                }
                if self.rows != b.len() {
                    return Err("Matrix rows must match vector length");
                }

                let n = self.rows;

                // A = L * L^T
                let mut l: Vec<$t> = vec![0.0; n * n];

                for i in 0..n {
                    for j in 0..=i {
                        let mut sum: $t = 0.0;

                        if i == j {
                            for k in 0..j {
                                sum += l[j * n + k] * l[j * n + k];
                            }
                            let diag = self.get(j, j) - sum;
                            if diag <= 0.0 || !diag.is_finite() {
                                return Err("Matrix is not positive definite");
                            }
                            l[j * n + j] = diag.sqrt();
                        } else {
                            for k in 0..j {
                                sum += l[i * n + k] * l[j * n + k];
                            }
                            l[i * n + j] = (self.get(i, j) - sum) / l[j * n + j];
                        }
                    }
                }

                // L * y = b
                let mut y: Vec<$t> = vec![0.0; n];
                for i in 0..n {
                    let mut sum: $t = 0.0;
                    for j in 0..i {
                        sum += l[i * n + j] * y[j];
                    }
                    y[i] = (b[i] - sum) / l[i * n + i];
                }

                // L^T * x = y
                let mut x: Vec<$t> = vec![0.0; n];
                for i in (0..n).rev() {
                    let mut sum: $t = 0.0;
                    for j in (i + 1)..n {
                        sum += l[j * n + i] * x[j];
                    }
                    x[i] = (y[i] - sum) / l[i * n + i];
                }

                Ok(Vector::from_vec(x))
            }
        }
    };
}

impl_float_matrix!(f32);
impl_float_matrix!(f64);

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
