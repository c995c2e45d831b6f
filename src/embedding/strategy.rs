//! t-SNE layouts built from pluggable feature preparation.

use super::tsne::{reduce_to_2d, TsneConfig};
use super::{Diagnostic, Embedder, Embedding};
use crate::correlation::CorrelationMatrix;
use crate::data::{fill_missing, ObservationTable};
use crate::error::{Error, Result};
use ndarray::Array2;
use std::fmt;
use tracing::{debug, info, warn};

/// Prepares one feature row per variable for the 2D reduction
pub trait FeatureStrategy: fmt::Debug + Send + Sync {
    /// Features matrix (variables x features), rows in table column order
    fn prepare(&self, table: &ObservationTable, correlations: &CorrelationMatrix) -> Result<Array2<f64>>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Each variable is a point in sample space
#[derive(Debug, Clone)]
pub struct VariableValues {
    /// Scale every column to zero mean and unit variance first
    pub standardize: bool,
}

impl FeatureStrategy for VariableValues {
    fn prepare(&self, table: &ObservationTable, _correlations: &CorrelationMatrix) -> Result<Array2<f64>> {
        let values = if self.standardize {
            debug!("Standardizing table before t-SNE");
            table.standardized().values().clone()
        } else {
            table.values().clone()
        };
        Ok(values.t().as_standard_layout().into_owned())
    }

    fn name(&self) -> &str {
        "var_tsne"
    }
}

/// Each variable is its row of correlation statistics against all variables
#[derive(Debug, Clone)]
pub struct CorrelationProfile {
    /// Use absolute correlation values
    pub use_abs: bool,
}

impl FeatureStrategy for CorrelationProfile {
    fn prepare(&self, table: &ObservationTable, correlations: &CorrelationMatrix) -> Result<Array2<f64>> {
        if correlations.variables() != table.columns() {
            return Err(Error::MalformedCorrelationMatrix(format!(
                "matrix variables {:?} do not match table columns {:?}",
                correlations.variables(),
                table.columns()
            )));
        }

        let statistics = correlations.statistics();
        Ok(if self.use_abs {
            statistics.mapv(f64::abs)
        } else {
            statistics
        })
    }

    fn name(&self) -> &str {
        "correl_tsne"
    }
}

/// t-SNE layout over the features produced by a [`FeatureStrategy`]
#[derive(Debug)]
pub struct TsneEmbedder {
    strategy: Box<dyn FeatureStrategy>,
    config: TsneConfig,
}

impl TsneEmbedder {
    /// Combine a feature strategy with a reduction configuration
    pub fn new(strategy: Box<dyn FeatureStrategy>, config: TsneConfig) -> Self {
        Self { strategy, config }
    }

    /// Layout from the raw variable values
    pub fn var_tsne(standardize: bool, config: TsneConfig) -> Self {
        Self::new(Box::new(VariableValues { standardize }), config)
    }

    /// Layout from the correlation profiles
    pub fn correl_tsne(use_abs: bool, config: TsneConfig) -> Self {
        Self::new(Box::new(CorrelationProfile { use_abs }), config)
    }

    /// Reduction configuration
    pub fn config(&self) -> &TsneConfig {
        &self.config
    }
}

impl Embedder for TsneEmbedder {
    fn embed(&self, table: &ObservationTable, correlations: &CorrelationMatrix) -> Result<Embedding> {
        let features = self.strategy.prepare(table, correlations)?;

        let mut diagnostics = Vec::new();
        let (features, replaced) = fill_missing(&features, 0.0);
        if replaced > 0 {
            warn!(count = replaced, "Replacing missing values with 0 for t-SNE");
            diagnostics.push(Diagnostic::MissingValuesReplaced {
                count: replaced,
                replacement: 0.0,
            });
        }

        info!(strategy = self.strategy.name(), points = features.nrows(), "Fitting t-SNE");
        let coordinates = reduce_to_2d(&features, &self.config)?;

        Ok(Embedding::new(table.columns().to_vec(), coordinates)?
            .with_axes("tsne_1", "tsne_2")
            .with_diagnostics(diagnostics))
    }

    fn name(&self) -> &str {
        self.strategy.name()
    }
}
