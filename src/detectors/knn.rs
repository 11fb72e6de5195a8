use super::{check_neighbors, nearest_neighbors};
use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;
use crate::traits::OutlierDetector;

/// Distance to the k-th nearest neighbour.
///
/// The query point is its own first neighbour, so `k = 1` scores every
/// point 0 and `k = 2` is the distance to the closest other point.
#[derive(Debug, Clone, Copy)]
pub struct KnnDistance {
    k: usize,
}

impl KnnDistance {
    /// Creates a detector for the given neighbour count.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    /// Neighbour count.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }
}

impl OutlierDetector for KnnDistance {
    fn name(&self) -> String {
        format!("KNN(k={})", self.k)
    }

    fn score(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        let n = x.n_rows();
        check_neighbors(self.k, n)?;
        if self.k > n {
            return Err(AutoOdError::invalid_hyperparameter(
                "k",
                self.k,
                "must not exceed the number of samples",
            ));
        }

        Ok(nearest_neighbors(x, self.k, true)
            .into_iter()
            .map(|neighbors| neighbors.last().map_or(0.0, |&(_, d)| d))
            .collect())
    }
}
