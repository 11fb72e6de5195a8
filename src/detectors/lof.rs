use super::{check_neighbors, nearest_neighbors};
use crate::error::Result;
use crate::primitives::Matrix;
use crate::traits::OutlierDetector;

/// Local Outlier Factor.
///
/// Compares the local reachability density of each point with that of its
/// k nearest neighbours (the point itself excluded). Scores near 1 are
/// inliers; larger values are increasingly isolated.
///
/// When `k` is at least the number of samples it is reduced to `n - 1`.
#[derive(Debug, Clone, Copy)]
pub struct LocalOutlierFactor {
    n_neighbors: usize,
}

impl LocalOutlierFactor {
    /// Creates a detector for the given neighbour count.
    #[must_use]
    pub fn new(n_neighbors: usize) -> Self {
        Self { n_neighbors }
    }

    /// Neighbour count as configured.
    #[must_use]
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }
}

impl OutlierDetector for LocalOutlierFactor {
    fn name(&self) -> String {
        format!("LOF(k={})", self.n_neighbors)
    }

    fn score(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        let n = x.n_rows();
        check_neighbors(self.n_neighbors, n.saturating_sub(1))?;
        let k = self.n_neighbors.min(n - 1);

        let neighbors = nearest_neighbors(x, k, false);
        let k_distance: Vec<f32> = neighbors
            .iter()
            .map(|nb| nb.last().map_or(0.0, |&(_, d)| d))
            .collect();

        // Local reachability density.
        let lrd: Vec<f32> = neighbors
            .iter()
            .map(|nb| {
                let reach_sum: f32 = nb.iter().map(|&(o, d)| d.max(k_distance[o])).sum();
                1.0 / (reach_sum / nb.len() as f32 + 1e-10)
            })
            .collect();

        Ok(neighbors
            .iter()
            .enumerate()
            .map(|(p, nb)| {
                let ratio_sum: f32 = nb.iter().map(|&(o, _)| lrd[o]).sum();
                ratio_sum / nb.len() as f32 / lrd[p]
            })
            .collect())
    }
}
