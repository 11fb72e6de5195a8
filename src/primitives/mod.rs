//! Core compute primitives (Vector, Matrix).
//!
//! Dense row-major storage for feature, score and vote matrices.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
