use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;
use crate::traits::OutlierDetector;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation Forest (Liu et al., 2008).
///
/// Anomalies are isolated by fewer random axis-aligned splits than normal
/// points. Each tree is grown on `max_samples` rows drawn without
/// replacement and a random subset of `max_features · D` columns.
///
/// The score is `2^(-E[h(x)] / c(ψ))`, in (0, 1]; values close to 1 are
/// anomalies and values well below 0.5 are normal.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    max_features: f32,
    n_estimators: usize,
    max_samples: usize,
    random_state: u64,
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl IsolationForest {
    /// Creates a forest with 100 trees of up to 256 samples each.
    #[must_use]
    pub fn new(max_features: f32) -> Self {
        Self {
            max_features,
            n_estimators: 100,
            max_samples: 256,
            random_state: 42,
        }
    }

    /// Sets the number of trees.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Sets the per-tree sample cap.
    #[must_use]
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Sets the seed from which every tree's RNG is derived.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self, n_samples: usize, n_features: usize) -> Result<()> {
        if !(self.max_features > 0.0 && self.max_features <= 1.0) {
            return Err(AutoOdError::invalid_hyperparameter(
                "max_features",
                self.max_features,
                "in (0, 1]",
            ));
        }
        if self.n_estimators == 0 {
            return Err(AutoOdError::invalid_hyperparameter("n_estimators", 0, ">= 1"));
        }
        if self.max_samples == 0 {
            return Err(AutoOdError::invalid_hyperparameter("max_samples", 0, ">= 1"));
        }
        if n_samples == 0 || n_features == 0 {
            return Err(AutoOdError::empty_input("IsolationForest"));
        }
        Ok(())
    }
}

impl OutlierDetector for IsolationForest {
    fn name(&self) -> String {
        format!("IF(max_features={})", self.max_features)
    }

    fn score(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        let (n_samples, n_features) = x.shape();
        self.validate(n_samples, n_features)?;

        let psi = self.max_samples.min(n_samples);
        let n_tree_features = ((self.max_features * n_features as f32) as usize).clamp(1, n_features);
        let max_depth = (psi as f64).log2().ceil().max(1.0) as usize;

        let mut master = StdRng::seed_from_u64(self.random_state);
        let seeds: Vec<u64> = (0..self.n_estimators).map(|_| master.gen()).collect();

        let trees: Vec<Node> = seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let rows = sample(&mut rng, n_samples, psi).into_vec();
                let features = sample(&mut rng, n_features, n_tree_features).into_vec();
                grow(x, rows, &features, 0, max_depth, &mut rng)
            })
            .collect();

        let normaliser = average_path_length(psi);
        Ok((0..n_samples)
            .into_par_iter()
            .map(|i| {
                let row = x.row_slice(i);
                let mean_depth = trees
                    .iter()
                    .map(|tree| path_length(tree, row, 0))
                    .sum::<f64>()
                    / trees.len() as f64;
                if normaliser > 0.0 {
                    2f64.powf(-mean_depth / normaliser) as f32
                } else {
                    0.5
                }
            })
            .collect())
    }
}

fn grow(
    x: &Matrix<f32>,
    rows: Vec<usize>,
    features: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if rows.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: rows.len() };
    }

    // Only features that still vary can split this node.
    let candidates: Vec<(usize, f32, f32)> = features
        .iter()
        .filter_map(|&f| {
            let (lo, hi) = rows.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &r| {
                let v = x.get(r, f);
                (lo.min(v), hi.max(v))
            });
            (hi > lo).then_some((f, lo, hi))
        })
        .collect();
    if candidates.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&r| x.get(r, feature) < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(x, left, features, depth + 1, max_depth, rng)),
        right: Box::new(grow(x, right, features, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, row: &[f32], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] < *threshold {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
pub(crate) fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
