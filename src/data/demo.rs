//! Synthetic observation tables for demos and tests.

use super::ObservationTable;
use crate::error::Result;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Multivariate normal data with a random covariance.
///
/// Draws `A` (p x p) and `Z` (n x p) from a standard normal and returns
/// `X = Z A^T`, so the columns have covariance `A A^T`. Columns are named
/// `x_01`, `x_02`, ...
pub fn multivariate_normal(n: usize, p: usize, seed: u64) -> Result<ObservationTable> {
    let mut rng = StdRng::seed_from_u64(seed);

    let a = Array2::from_shape_fn((p, p), |_| rng.sample::<f64, _>(StandardNormal));
    let z = Array2::from_shape_fn((n, p), |_| rng.sample::<f64, _>(StandardNormal));
    let x = z.dot(&a.t());

    let width = p.to_string().len().max(2);
    let columns = (1..=p).map(|i| format!("x_{:0>width$}", i, width = width)).collect();

    ObservationTable::new(columns, x)
}

/// Three variables: `x1` standard normal, `x2 = 2 x1 + noise`, `x3` independent noise.
pub fn linear_pair(n: usize, seed: u64) -> Result<ObservationTable> {
    let mut rng = StdRng::seed_from_u64(seed);

    let x1: Vec<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
    let x2: Vec<f64> = x1
        .iter()
        .map(|&v| 2.0 * v + 0.5 * rng.sample::<f64, _>(StandardNormal))
        .collect();
    let x3: Vec<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();

    ObservationTable::from_columns(
        vec!["x1".to_string(), "x2".to_string(), "x3".to_string()],
        vec![x1, x2, x3],
    )
}
