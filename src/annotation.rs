//! Per-variable annotations computed outside the pairwise pipeline.

use crate::correlation::{CorrelationMatrix, CorrelationMethod};
use crate::data::ObservationTable;
use crate::error::{Error, Result};
use std::fmt;
use tracing::debug;

/// Computes one scalar per variable
pub trait Annotator: fmt::Debug + Send + Sync {
    /// One value per table column, in column order
    fn annotate(&self, table: &ObservationTable, correlations: &CorrelationMatrix) -> Result<Vec<f64>>;
}

/// Correlation of every variable against an external target vector
#[derive(Debug, Clone)]
pub struct TargetCorrelationAnnotator {
    target: Vec<f64>,
    method: CorrelationMethod,
}

impl TargetCorrelationAnnotator {
    /// Create an annotator for `target` using Pearson correlation
    pub fn new(target: Vec<f64>) -> Self {
        Self {
            target,
            method: CorrelationMethod::Pearson,
        }
    }

    /// Set the correlation method
    pub fn with_method(mut self, method: CorrelationMethod) -> Self {
        self.method = method;
        self
    }

    /// The target vector
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// `(statistic, pvalue)` per variable against the target
    pub fn correlations(&self, table: &ObservationTable) -> Result<Vec<(f64, f64)>> {
        if self.target.len() != table.n_samples() {
            return Err(Error::LengthMismatch {
                expected: table.n_samples(),
                actual: self.target.len(),
            });
        }

        debug!(method = self.method.name(), variables = table.n_variables(), "Annotating against target");
        Ok(table
            .column_vectors()
            .iter()
            .map(|column| self.method.correlate(column, &self.target))
            .collect())
    }
}

impl Annotator for TargetCorrelationAnnotator {
    fn annotate(&self, table: &ObservationTable, _correlations: &CorrelationMatrix) -> Result<Vec<f64>> {
        Ok(self
            .correlations(table)?
            .into_iter()
            .map(|(statistic, _)| statistic)
            .collect())
    }
}
