//! Exact t-distributed stochastic neighbor embedding (t-SNE) to 2D.
//!
//! # Algorithm
//!
//! 1. Squared Euclidean distances between all points
//! 2. Per-point Gaussian bandwidth found by binary search so the conditional
//!    distribution has the requested perplexity
//! 3. Symmetrised joint probabilities P
//! 4. Gradient descent on KL(P || Q) with a Student-t kernel in 2D, early
//!    exaggeration, momentum and per-coordinate adaptive gains

use crate::error::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MACHINE_EPSILON: f64 = f64::EPSILON;
const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const BINARY_SEARCH_STEPS: usize = 100;
const EXPLORATION_ITERATIONS: usize = 250;
const MIN_GAIN: f64 = 0.01;
const ERROR_CHECK_INTERVAL: usize = 50;
const INIT_SCALE: f64 = 1e-4;

/// Initialisation of the low-dimensional coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TsneInit {
    /// Top two principal component scores
    #[default]
    Pca,
    /// Small isotropic Gaussian noise
    Random,
}

/// t-SNE configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsneConfig {
    /// Effective number of neighbours, must be smaller than the number of points
    pub perplexity: f64,
    /// Factor applied to P during the exploration phase
    pub early_exaggeration: f64,
    /// Step size; `None` picks `max(n / early_exaggeration / 4, 50)`
    pub learning_rate: Option<f64>,
    /// Maximum number of gradient steps, exploration included
    pub max_iter: usize,
    /// Stop when the gradient norm falls below this value
    pub min_grad_norm: f64,
    /// Stop after this many iterations without improving the error
    pub n_iter_without_progress: usize,
    /// Initialisation scheme
    pub init: TsneInit,
    /// Seed for the random number generator
    pub seed: Option<u64>,
}

impl Default for TsneConfig {
    fn default() -> Self {
        Self {
            perplexity: 30.0,
            early_exaggeration: 12.0,
            learning_rate: None,
            max_iter: 1000,
            min_grad_norm: 1e-7,
            n_iter_without_progress: 300,
            init: TsneInit::Pca,
            seed: None,
        }
    }
}

impl TsneConfig {
    /// Set the perplexity
    pub fn with_perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the initialisation scheme
    pub fn with_init(mut self, init: TsneInit) -> Self {
        self.init = init;
        self
    }

    /// Set the maximum number of iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Check the configuration against the number of points to embed
    pub fn validate(&self, n_points: usize) -> Result<()> {
        if !(self.perplexity > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "perplexity must be positive, got {}",
                self.perplexity
            )));
        }
        if self.perplexity >= n_points as f64 {
            return Err(Error::InvalidConfig(format!(
                "perplexity ({}) must be less than the number of points ({})",
                self.perplexity, n_points
            )));
        }
        if !(self.early_exaggeration >= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "early_exaggeration must be at least 1, got {}",
                self.early_exaggeration
            )));
        }
        if let Some(rate) = self.learning_rate {
            if !(rate > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "learning_rate must be positive, got {}",
                    rate
                )));
            }
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidConfig("max_iter must be positive".to_string()));
        }
        Ok(())
    }

    fn effective_learning_rate(&self, n_points: usize) -> f64 {
        self.learning_rate
            .unwrap_or_else(|| (n_points as f64 / self.early_exaggeration / 4.0).max(50.0))
    }
}

/// Reduce `data` (points x features, no missing values) to 2D coordinates.
pub fn reduce_to_2d(data: &Array2<f64>, config: &TsneConfig) -> Result<Array2<f64>> {
    let n = data.nrows();
    if n == 0 {
        return Ok(Array2::zeros((0, 2)));
    }
    config.validate(n)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let distances = squared_distances(data);
    let p = joint_probabilities(&distances, config.perplexity);

    let init = match config.init {
        TsneInit::Pca => pca_init(data).unwrap_or_else(|| random_init(n, &mut rng)),
        TsneInit::Random => random_init(n, &mut rng),
    };

    let learning_rate = config.effective_learning_rate(n);
    debug!(
        points = n,
        features = data.ncols(),
        perplexity = config.perplexity,
        learning_rate,
        "Fitting t-SNE"
    );

    Ok(optimize(&p, init, config, learning_rate))
}

fn squared_distances(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let mut distances = Array2::zeros((n, n));

    for i in 0..n {
        for j in (i + 1)..n {
            let d: f64 = data
                .row(i)
                .iter()
                .zip(data.row(j).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }

    distances
}

/// Conditional probabilities with per-row bandwidth matching the perplexity
fn conditional_probabilities(distances: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n = distances.nrows();
    let desired_entropy = perplexity.ln();
    let mut p = Array2::zeros((n, n));

    for i in 0..n {
        let mut beta = 1.0;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;

        for _ in 0..BINARY_SEARCH_STEPS {
            let mut sum_p = 0.0;
            for j in 0..n {
                let value = if i == j {
                    0.0
                } else {
                    (-distances[[i, j]] * beta).exp()
                };
                p[[i, j]] = value;
                sum_p += value;
            }
            if sum_p == 0.0 {
                sum_p = 1e-8;
            }

            let mut sum_dist_p = 0.0;
            for j in 0..n {
                p[[i, j]] /= sum_p;
                sum_dist_p += distances[[i, j]] * p[[i, j]];
            }

            let entropy_diff = sum_p.ln() + beta * sum_dist_p - desired_entropy;
            if entropy_diff.abs() <= PERPLEXITY_TOLERANCE {
                break;
            }

            if entropy_diff > 0.0 {
                beta_min = beta;
                beta = if beta_max == f64::INFINITY {
                    beta * 2.0
                } else {
                    (beta + beta_max) / 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min == f64::NEG_INFINITY {
                    beta / 2.0
                } else {
                    (beta + beta_min) / 2.0
                };
            }
        }
    }

    p
}

fn joint_probabilities(distances: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n = distances.nrows();
    let conditional = conditional_probabilities(distances, perplexity);

    let mut joint = &conditional + &conditional.t();
    let total = joint.sum().max(MACHINE_EPSILON);

    for i in 0..n {
        for j in 0..n {
            joint[[i, j]] = if i == j {
                0.0
            } else {
                (joint[[i, j]] / total).max(MACHINE_EPSILON)
            };
        }
    }

    joint
}

fn random_init(n: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_fn((n, 2), |_| INIT_SCALE * rng.sample::<f64, _>(StandardNormal))
}

/// Top two principal component scores, scaled so the first has std 1e-4.
///
/// Uses power iteration on the Gram matrix of the centered points. Returns
/// `None` when the points have no spread.
fn pca_init(data: &Array2<f64>) -> Option<Array2<f64>> {
    let n = data.nrows();
    let mean = data.mean_axis(ndarray::Axis(0))?;
    let centered = data - &mean;
    let gram = centered.dot(&centered.t());

    let mut scores = Array2::zeros((n, 2));
    let mut components: Vec<Vec<f64>> = Vec::with_capacity(2);

    for k in 0..2 {
        let mut v: Vec<f64> = (0..n).map(|i| 1.0 / (i + 1) as f64).collect();
        let mut eigenvalue = 0.0;

        for _ in 0..1000 {
            let mut w: Vec<f64> = (0..n)
                .map(|i| (0..n).map(|j| gram[[i, j]] * v[j]).sum())
                .collect();
            for u in &components {
                let dot: f64 = u.iter().zip(&w).map(|(a, b)| a * b).sum();
                for (wi, ui) in w.iter_mut().zip(u) {
                    *wi -= dot * ui;
                }
            }

            let norm = w.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm < 1e-300 {
                eigenvalue = 0.0;
                break;
            }
            let next: Vec<f64> = w.iter().map(|x| x / norm).collect();
            let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
            v = next;
            eigenvalue = norm;
            if delta < 1e-12 {
                break;
            }
        }

        // deterministic sign: largest loading positive
        let pivot = v
            .iter()
            .copied()
            .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        if pivot < 0.0 {
            v.iter_mut().for_each(|x| *x = -*x);
        }

        let scale = eigenvalue.max(0.0).sqrt();
        for i in 0..n {
            scores[[i, k]] = v[i] * scale;
        }
        components.push(v);
    }

    let first = scores.column(0);
    let std = first.std(0.0);
    if !(std > 1e-12) {
        return None;
    }

    Some(scores.mapv(|x| x / std * INIT_SCALE))
}

/// Gradient of KL(P || Q) and the KL value
fn kl_gradient(p: &Array2<f64>, y: &Array2<f64>, exaggeration: f64) -> (Array2<f64>, f64) {
    let n = y.nrows();
    let mut kernel = Array2::zeros((n, n));
    let mut kernel_sum = 0.0;

    for i in 0..n {
        for j in (i + 1)..n {
            let dx = y[[i, 0]] - y[[j, 0]];
            let dy = y[[i, 1]] - y[[j, 1]];
            let w = 1.0 / (1.0 + dx * dx + dy * dy);
            kernel[[i, j]] = w;
            kernel[[j, i]] = w;
            kernel_sum += 2.0 * w;
        }
    }

    let mut grad = Array2::zeros((n, 2));
    let mut kl = 0.0;

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let p_ij = p[[i, j]] * exaggeration;
            let q_ij = (kernel[[i, j]] / kernel_sum).max(MACHINE_EPSILON);
            kl += p_ij * (p_ij.max(MACHINE_EPSILON) / q_ij).ln();

            let mult = (p_ij - q_ij) * kernel[[i, j]];
            grad[[i, 0]] += mult * (y[[i, 0]] - y[[j, 0]]);
            grad[[i, 1]] += mult * (y[[i, 1]] - y[[j, 1]]);
        }
    }

    grad.mapv_inplace(|g| 4.0 * g);
    (grad, kl)
}

fn optimize(p: &Array2<f64>, init: Array2<f64>, config: &TsneConfig, learning_rate: f64) -> Array2<f64> {
    let n = init.nrows();
    let mut y = init;
    let mut update = Array2::<f64>::zeros((n, 2));
    let mut gains = Array2::<f64>::ones((n, 2));

    let mut best_error = f64::INFINITY;
    let mut best_iter = 0;

    for iter in 0..config.max_iter {
        let exploring = iter < EXPLORATION_ITERATIONS;
        let (exaggeration, momentum) = if exploring {
            (config.early_exaggeration, 0.5)
        } else {
            (1.0, 0.8)
        };

        let (mut grad, error) = kl_gradient(p, &y, exaggeration);

        for ((g, u), gain) in grad.iter_mut().zip(update.iter()).zip(gains.iter_mut()) {
            if *u * *g < 0.0 {
                *gain += 0.2;
            } else {
                *gain *= 0.8;
            }
            *gain = gain.max(MIN_GAIN);
            *g *= *gain;
        }

        update = &update * momentum - &grad * learning_rate;
        y = &y + &update;

        let grad_norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();

        if exploring {
            continue;
        }

        if (iter + 1) % ERROR_CHECK_INTERVAL == 0 {
            debug!(iteration = iter + 1, error, grad_norm, "t-SNE progress");
            if error < best_error {
                best_error = error;
                best_iter = iter;
            } else if iter - best_iter > config.n_iter_without_progress {
                debug!(iteration = iter + 1, "t-SNE stopped without progress");
                break;
            }
        }
        if grad_norm <= config.min_grad_norm {
            debug!(iteration = iter + 1, grad_norm, "t-SNE converged");
            break;
        }
    }

    y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_clusters() -> Array2<f64> {
        let mut data = Array2::zeros((12, 5));
        for i in 0..12 {
            let offset = if i < 6 { 0.0 } else { 10.0 };
            for j in 0..5 {
                data[[i, j]] = offset + ((i * 7 + j * 3) % 5) as f64 * 0.1;
            }
        }
        data
    }

    #[test]
    fn test_conditional_rows_sum_to_one() {
        let data = two_clusters();
        let distances = squared_distances(&data);
        let p = conditional_probabilities(&distances, 3.0);

        for i in 0..data.nrows() {
            let row_sum: f64 = p.row(i).sum();
            assert!((row_sum - 1.0).abs() < 1e-8);
            assert_eq!(p[[i, i]], 0.0);
        }
    }

    #[test]
    fn test_joint_is_symmetric_and_normalised() {
        let data = two_clusters();
        let p = joint_probabilities(&squared_distances(&data), 3.0);

        assert!((p.sum() - 1.0).abs() < 1e-6);
        for i in 0..data.nrows() {
            for j in 0..data.nrows() {
                assert!((p[[i, j]] - p[[j, i]]).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn test_perplexity_must_be_below_point_count() {
        let data = two_clusters();
        let config = TsneConfig::default();
        assert!(matches!(
            reduce_to_2d(&data, &config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_clusters_are_separated() {
        let data = two_clusters();
        let config = TsneConfig::default().with_perplexity(3.0).with_seed(0);
        let y = reduce_to_2d(&data, &config).unwrap();

        assert_eq!(y.dim(), (12, 2));

        let dist = |a: usize, b: usize| {
            ((y[[a, 0]] - y[[b, 0]]).powi(2) + (y[[a, 1]] - y[[b, 1]]).powi(2)).sqrt()
        };

        let mut within = 0.0;
        let mut between = 0.0;
        for a in 0..12 {
            for b in 0..12 {
                if a == b {
                    continue;
                }
                if (a < 6) == (b < 6) {
                    within += dist(a, b) / 60.0;
                } else {
                    between += dist(a, b) / 72.0;
                }
            }
        }
        assert!(between > within);
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let data = two_clusters();
        let config = TsneConfig::default()
            .with_perplexity(4.0)
            .with_init(TsneInit::Random)
            .with_seed(42)
            .with_max_iter(300);

        let a = reduce_to_2d(&data, &config).unwrap();
        let b = reduce_to_2d(&data, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pca_init_scale() {
        let data = two_clusters();
        let init = pca_init(&data).unwrap();
        assert!((init.column(0).std(0.0) - INIT_SCALE).abs() < 1e-12);
    }

    #[test]
    fn test_pca_init_degenerate() {
        let data = Array2::from_elem((5, 3), 2.0);
        assert!(pca_init(&data).is_none());
    }
}
