use super::{sigmoid, validate_binary};
use crate::error::{AutoOdError, Result};
use crate::primitives::Matrix;
use crate::traits::ProbabilisticClassifier;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TAU: f64 = 1e-12;
const PROBABILITY_FOLDS: usize = 5;
/// Kernel cache budget per machine; six machines train per `fit`.
const KERNEL_CACHE_BYTES: usize = 32 << 20;

/// Support vector classifier with an RBF kernel.
///
/// The dual problem is solved by SMO using the maximal violating pair.
/// Probabilities come from a sigmoid (Platt scaling) fitted on decision
/// values obtained by 5-fold cross-validation, so `fit` trains six machines
/// in total. Fold assignment is drawn from the seeded RNG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Svc {
    c: f32,
    /// Kernel width; `None` means `1 / n_features`.
    gamma: Option<f32>,
    tol: f32,
    random_state: u64,
    fitted: Option<FittedSvc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedSvc {
    machine: Machine,
    sigmoid_a: f64,
    sigmoid_b: f64,
}

/// Support vectors with their signed dual coefficients.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Machine {
    support_vectors: Matrix<f32>,
    dual_coef: Vec<f64>,
    rho: f64,
    gamma: f64,
}

impl Machine {
    fn decision(&self, row: &[f32]) -> f64 {
        (0..self.support_vectors.n_rows())
            .map(|s| self.dual_coef[s] * rbf(self.support_vectors.row_slice(s), row, self.gamma))
            .sum::<f64>()
            - self.rho
    }
}

impl Svc {
    /// Creates a classifier with `C = 1`, `gamma = 1 / n_features` and the
    /// given seed.
    #[must_use]
    pub fn new(random_state: u64) -> Self {
        Self {
            c: 1.0,
            gamma: None,
            tol: 1e-3,
            random_state,
            fitted: None,
        }
    }

    /// Sets the penalty parameter.
    #[must_use]
    pub fn with_c(mut self, c: f32) -> Self {
        self.c = c;
        self
    }

    /// Sets an explicit kernel width.
    #[must_use]
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = Some(gamma);
        self
    }

    /// Sets the SMO stopping tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Returns true once `fit` has succeeded.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Number of support vectors of the final machine.
    #[must_use]
    pub fn n_support(&self) -> usize {
        self.fitted
            .as_ref()
            .map_or(0, |f| f.machine.support_vectors.n_rows())
    }

    /// Signed distance to the separating surface for every row.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or `x` has the wrong width.
    pub fn decision_function(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        let fitted = self.fitted()?;
        check_width(&fitted.machine, x)?;
        Ok(decisions(&fitted.machine, x)
            .into_iter()
            .map(|d| d as f32)
            .collect())
    }

    fn fitted(&self) -> Result<&FittedSvc> {
        self.fitted
            .as_ref()
            .ok_or_else(|| AutoOdError::from("Model not fitted yet"))
    }

    /// Cross-validated decision values for every training row.
    fn cross_validated_decisions(&self, x: &Matrix<f32>, y: &[usize], gamma: f64) -> Vec<f64> {
        let n = y.len();
        let mut perm: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.random_state);
        perm.shuffle(&mut rng);

        let folds: Vec<Vec<(usize, f64)>> = (0..PROBABILITY_FOLDS)
            .into_par_iter()
            .map(|fold| {
                let begin = fold * n / PROBABILITY_FOLDS;
                let end = (fold + 1) * n / PROBABILITY_FOLDS;
                let held_out = &perm[begin..end];
                let train: Vec<usize> = perm[..begin].iter().chain(&perm[end..]).copied().collect();

                let n_pos = train.iter().filter(|&&i| y[i] == 1).count();
                let constant = if train.is_empty() {
                    Some(0.0)
                } else if n_pos == train.len() {
                    Some(1.0)
                } else if n_pos == 0 {
                    Some(-1.0)
                } else {
                    None
                };

                match constant {
                    Some(value) => held_out.iter().map(|&i| (i, value)).collect(),
                    None => {
                        let x_train = x.select_rows(&train);
                        let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
                        let machine = train_machine(&x_train, &y_train, f64::from(self.c), gamma, f64::from(self.tol));
                        held_out
                            .iter()
                            .map(|&i| (i, machine.decision(x.row_slice(i))))
                            .collect()
                    }
                }
            })
            .collect();

        let mut values = vec![0.0; n];
        for (i, value) in folds.into_iter().flatten() {
            values[i] = value;
        }
        values
    }
}

impl ProbabilisticClassifier for Svc {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        validate_binary(x, y)?;
        let n_features = x.n_cols();
        let gamma = match self.gamma {
            Some(g) if g > 0.0 => f64::from(g),
            Some(g) => return Err(AutoOdError::invalid_hyperparameter("gamma", g, "> 0")),
            None => 1.0 / n_features.max(1) as f64,
        };
        if self.c <= 0.0 {
            return Err(AutoOdError::invalid_hyperparameter("C", self.c, "> 0"));
        }

        let cv_decisions = self.cross_validated_decisions(x, y, gamma);
        let (sigmoid_a, sigmoid_b) = platt_scaling(&cv_decisions, y);
        let machine = train_machine(x, y, f64::from(self.c), gamma, f64::from(self.tol));

        self.fitted = Some(FittedSvc {
            machine,
            sigmoid_a,
            sigmoid_b,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix<f32>) -> Result<Vec<f32>> {
        let fitted = self.fitted()?;
        check_width(&fitted.machine, x)?;
        Ok(decisions(&fitted.machine, x)
            .into_iter()
            .map(|f| sigmoid(-(fitted.sigmoid_a * f + fitted.sigmoid_b)) as f32)
            .collect())
    }
}

fn check_width(machine: &Machine, x: &Matrix<f32>) -> Result<()> {
    let expected = machine.support_vectors.n_cols();
    if x.n_cols() != expected {
        return Err(AutoOdError::dimension_mismatch("features", expected, x.n_cols()));
    }
    Ok(())
}

fn decisions(machine: &Machine, x: &Matrix<f32>) -> Vec<f64> {
    (0..x.n_rows())
        .into_par_iter()
        .map(|i| machine.decision(x.row_slice(i)))
        .collect()
}

fn rbf(a: &[f32], b: &[f32], gamma: f64) -> f64 {
    let dist: f64 = a
        .iter()
        .zip(b)
        .map(|(&u, &v)| {
            let d = f64::from(u) - f64::from(v);
            d * d
        })
        .sum();
    (-gamma * dist).exp()
}

/// Solves the C-SVC dual with SMO.
///
/// Labels 1 map to `+1`, labels 0 to `-1`. Both classes must be present.
fn train_machine(x: &Matrix<f32>, y: &[usize], c: f64, gamma: f64, tol: f64) -> Machine {
    train_machine_with_cache(x, y, c, gamma, tol, KERNEL_CACHE_BYTES)
}

fn train_machine_with_cache(
    x: &Matrix<f32>,
    y: &[usize],
    c: f64,
    gamma: f64,
    tol: f64,
    cache_bytes: usize,
) -> Machine {
    let n = y.len();
    let sign: Vec<f64> = y.iter().map(|&l| if l == 1 { 1.0 } else { -1.0 }).collect();

    let mut kernel = KernelCache::new(x, gamma, cache_bytes);
    let mut alpha = vec![0.0_f64; n];
    let mut grad = vec![-1.0_f64; n];
    let max_iter = (100 * n).max(100_000);

    for _ in 0..max_iter {
        // i maximises -y G over I_up, j minimises it over I_low.
        let mut g_max = f64::NEG_INFINITY;
        let mut g_min = f64::INFINITY;
        let mut i_sel = None;
        let mut j_sel = None;
        for t in 0..n {
            let v = -sign[t] * grad[t];
            let up = (sign[t] > 0.0 && alpha[t] < c) || (sign[t] < 0.0 && alpha[t] > 0.0);
            let low = (sign[t] > 0.0 && alpha[t] > 0.0) || (sign[t] < 0.0 && alpha[t] < c);
            if up && v > g_max {
                g_max = v;
                i_sel = Some(t);
            }
            if low && v < g_min {
                g_min = v;
                j_sel = Some(t);
            }
        }
        let (Some(i), Some(j)) = (i_sel, j_sel) else {
            break;
        };
        if g_max - g_min < tol {
            break;
        }

        let (old_i, old_j) = (alpha[i], alpha[j]);
        let k_ij = kernel.row(i)[j];
        if y[i] != y[j] {
            let mut quad = 2.0 + 2.0 * k_ij;
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (-grad[i] - grad[j]) / quad;
            let diff = alpha[i] - alpha[j];
            alpha[i] += delta;
            alpha[j] += delta;
            if diff > 0.0 {
                if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = diff;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = -diff;
            }
            if diff > 0.0 {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = c - diff;
                }
            } else if alpha[j] > c {
                alpha[j] = c;
                alpha[i] = c + diff;
            }
        } else {
            let mut quad = 2.0 - 2.0 * k_ij;
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (grad[i] - grad[j]) / quad;
            let sum = alpha[i] + alpha[j];
            alpha[i] -= delta;
            alpha[j] += delta;
            if sum > c {
                if alpha[i] > c {
                    alpha[i] = c;
                    alpha[j] = sum - c;
                }
            } else if alpha[j] < 0.0 {
                alpha[j] = 0.0;
                alpha[i] = sum;
            }
            if sum > c {
                if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = sum - c;
                }
            } else if alpha[i] < 0.0 {
                alpha[i] = 0.0;
                alpha[j] = sum;
            }
        }

        for (s, delta) in [(i, alpha[i] - old_i), (j, alpha[j] - old_j)] {
            if delta == 0.0 {
                continue;
            }
            let scale = sign[s] * delta;
            for ((g, &k), &y_t) in grad.iter_mut().zip(kernel.row(s)).zip(&sign) {
                *g += y_t * k * scale;
            }
        }
    }

    let rho = compute_rho(&alpha, &grad, &sign, c);

    let support: Vec<usize> = (0..n).filter(|&t| alpha[t] > 0.0).collect();
    Machine {
        support_vectors: x.select_rows(&support),
        dual_coef: support.iter().map(|&t| alpha[t] * sign[t]).collect(),
        rho,
        gamma,
    }
}

/// RBF kernel rows computed on demand, least recently used evicted first.
struct KernelCache<'a> {
    x: &'a Matrix<f32>,
    gamma: f64,
    capacity: usize,
    rows: HashMap<usize, (Vec<f64>, u64)>,
    clock: u64,
}

impl<'a> KernelCache<'a> {
    fn new(x: &'a Matrix<f32>, gamma: f64, budget_bytes: usize) -> Self {
        let n = x.n_rows().max(1);
        let per_row = n * std::mem::size_of::<f64>();
        Self {
            x,
            gamma,
            capacity: (budget_bytes / per_row).clamp(2, n.max(2)),
            rows: HashMap::new(),
            clock: 0,
        }
    }

    fn row(&mut self, i: usize) -> &[f64] {
        self.clock += 1;
        if !self.rows.contains_key(&i) && self.rows.len() >= self.capacity {
            let oldest = self
                .rows
                .iter()
                .min_by_key(|(_, (_, used))| *used)
                .map(|(&key, _)| key);
            if let Some(key) = oldest {
                self.rows.remove(&key);
            }
        }
        let (x, gamma, clock) = (self.x, self.gamma, self.clock);
        let entry = self.rows.entry(i).or_insert_with(|| {
            let xi = x.row_slice(i);
            let values = (0..x.n_rows())
                .map(|t| rbf(xi, x.row_slice(t), gamma))
                .collect();
            (values, clock)
        });
        entry.1 = clock;
        &entry.0
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Offset from free support vectors, or the midpoint of the feasible
/// interval when every multiplier sits at a bound.
fn compute_rho(alpha: &[f64], grad: &[f64], sign: &[f64], c: f64) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut sum_free = 0.0;
    let mut n_free = 0usize;

    for t in 0..alpha.len() {
        let yg = sign[t] * grad[t];
        if alpha[t] >= c {
            if sign[t] < 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else if alpha[t] <= 0.0 {
            if sign[t] > 0.0 {
                upper = upper.min(yg);
            } else {
                lower = lower.max(yg);
            }
        } else {
            n_free += 1;
            sum_free += yg;
        }
    }

    if n_free > 0 {
        sum_free / n_free as f64
    } else {
        (upper + lower) / 2.0
    }
}

/// Fits `P(y = 1 | f) = 1 / (1 + exp(A f + B))` by Newton's method with
/// backtracking, using regularised targets.
fn platt_scaling(decision: &[f64], y: &[usize]) -> (f64, f64) {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = y.iter().filter(|&&l| l == 1).count() as f64;
    let prior0 = y.len() as f64 - prior1;
    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let target: Vec<f64> = y
        .iter()
        .map(|&l| if l == 1 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        decision
            .iter()
            .zip(&target)
            .map(|(&f, &t)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    t * f_apb + (1.0 + (-f_apb).exp()).ln()
                } else {
                    (t - 1.0) * f_apb + (1.0 + f_apb.exp()).ln()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    for _ in 0..MAX_ITER {
        let (mut h11, mut h22, mut h21, mut g1, mut g2) = (SIGMA, SIGMA, 0.0, 0.0, 0.0);
        for (&f, &t) in decision.iter().zip(&target) {
            let f_apb = f * a + b;
            let (p, q) = if f_apb >= 0.0 {
                let e = (-f_apb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_apb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let d_a = -(h22 * g1 - h21 * g2) / det;
        let d_b = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * d_a + g2 * d_b;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let new_a = a + step * d_a;
            let new_b = b + step * d_b;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 1e-4 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }
        if step < MIN_STEP {
            tracing::debug!("Platt scaling line search failed");
            break;
        }
    }

    (a, b)
}
