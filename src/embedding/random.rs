//! Random layout.

use super::{Embedder, Embedding};
use crate::correlation::CorrelationMatrix;
use crate::data::ObservationTable;
use crate::error::Result;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Draws each coordinate independently from a standard normal distribution
#[derive(Debug, Clone, Default)]
pub struct RandomEmbedder {
    seed: Option<u64>,
}

impl RandomEmbedder {
    /// Create an embedder; without a seed every call gives new positions
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    /// Create a seeded embedder
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl Embedder for RandomEmbedder {
    fn embed(&self, table: &ObservationTable, _correlations: &CorrelationMatrix) -> Result<Embedding> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let n = table.n_variables();
        let coordinates = Array2::from_shape_fn((n, 2), |_| rng.sample::<f64, _>(StandardNormal));

        Ok(Embedding::new(table.columns().to_vec(), coordinates)?.with_axes("random_1", "random_2"))
    }

    fn name(&self) -> &str {
        "random"
    }
}
