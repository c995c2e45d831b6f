//! 2D positions for the variables of a correlation network.
//!
//! Three built-in layouts:
//! - Random: independent standard normal coordinates
//! - Variable t-SNE: each variable is a point in sample space
//! - Correlation t-SNE: each variable is its row of correlation statistics
//!
//! Both t-SNE layouts share one reduction step ([`reduce_to_2d`]) and differ
//! only in the [`FeatureStrategy`] that prepares its input.

mod random;
mod strategy;
mod tsne;

pub use random::RandomEmbedder;
pub use strategy::{CorrelationProfile, FeatureStrategy, TsneEmbedder, VariableValues};
pub use tsne::{reduce_to_2d, TsneConfig, TsneInit};

use crate::correlation::CorrelationMatrix;
use crate::data::ObservationTable;
use crate::error::{Error, Result};
use ndarray::Array2;
use std::fmt;
use std::str::FromStr;

/// Computes a 2D position per variable
pub trait Embedder: fmt::Debug + Send + Sync {
    /// Embed the variables of `table`; `correlations` is in the same variable order
    fn embed(&self, table: &ObservationTable, correlations: &CorrelationMatrix) -> Result<Embedding>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Non-fatal event reported while embedding
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Missing cells were substituted before the reduction
    MissingValuesReplaced { count: usize, replacement: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValuesReplaced { count, replacement } => write!(
                f,
                "replaced {} missing values with {} before embedding",
                count, replacement
            ),
        }
    }
}

/// Variable positions, one (x, y) row per variable
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    variables: Vec<String>,
    coordinates: Array2<f64>,
    axes: [String; 2],
    diagnostics: Vec<Diagnostic>,
}

impl Embedding {
    /// Create an embedding from an n x 2 coordinate matrix
    pub fn new(variables: Vec<String>, coordinates: Array2<f64>) -> Result<Self> {
        if coordinates.ncols() != 2 {
            return Err(Error::InvalidConfig(format!(
                "embedding needs 2 coordinates per variable, got {}",
                coordinates.ncols()
            )));
        }
        if coordinates.nrows() != variables.len() {
            return Err(Error::LengthMismatch {
                expected: variables.len(),
                actual: coordinates.nrows(),
            });
        }

        Ok(Self {
            variables,
            coordinates,
            axes: ["dim_1".to_string(), "dim_2".to_string()],
            diagnostics: Vec::new(),
        })
    }

    /// Name the two axes, e.g. `tsne_1`, `tsne_2`
    pub fn with_axes(mut self, x: &str, y: &str) -> Self {
        self.axes = [x.to_string(), y.to_string()];
        self
    }

    /// Attach diagnostics raised while computing the embedding
    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Variable names in row order
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Coordinate matrix (n x 2)
    pub fn coordinates(&self) -> &Array2<f64> {
        &self.coordinates
    }

    /// Axis names
    pub fn axes(&self) -> &[String; 2] {
        &self.axes
    }

    /// Non-fatal events reported while embedding
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of embedded variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether no variable is embedded
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Position of the i-th variable
    pub fn position(&self, i: usize) -> Option<(f64, f64)> {
        (i < self.len()).then(|| (self.coordinates[[i, 0]], self.coordinates[[i, 1]]))
    }

    /// Position of a variable by name
    pub fn position_of(&self, name: &str) -> Option<(f64, f64)> {
        let i = self.variables.iter().position(|v| v == name)?;
        self.position(i)
    }

    /// All positions in row order
    pub fn positions(&self) -> Vec<(f64, f64)> {
        self.coordinates
            .rows()
            .into_iter()
            .map(|row| (row[0], row[1]))
            .collect()
    }

    /// Reorder rows to follow `order`; every name must be present
    pub fn reordered(&self, order: &[String]) -> Result<Self> {
        let rows = order
            .iter()
            .map(|name| {
                self.variables.iter().position(|v| v == name).ok_or_else(|| {
                    Error::InvalidConfig(format!("variable '{}' missing from embedding", name))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            variables: order.to_vec(),
            coordinates: self.coordinates.select(ndarray::Axis(0), &rows),
            axes: self.axes.clone(),
            diagnostics: self.diagnostics.clone(),
        })
    }
}

/// Built-in embedding variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingMethod {
    /// Standard normal coordinates
    Random,
    /// t-SNE on the (optionally standardized) variable values
    #[default]
    VarTsne,
    /// t-SNE on each variable's correlation profile
    CorrelTsne,
}

impl EmbeddingMethod {
    /// Canonical variant name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::VarTsne => "var_tsne",
            Self::CorrelTsne => "correl_tsne",
        }
    }
}

impl fmt::Display for EmbeddingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EmbeddingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "random" => Ok(Self::Random),
            "var_tsne" => Ok(Self::VarTsne),
            "correl_tsne" => Ok(Self::CorrelTsne),
            _ => Err(Error::InvalidEmbeddingMethod(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_embedding_positions() {
        let embedding =
            Embedding::new(names(), array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]]).unwrap();

        assert_eq!(embedding.len(), 3);
        assert_eq!(embedding.position(1), Some((2.0, 3.0)));
        assert_eq!(embedding.position(3), None);
        assert_eq!(embedding.position_of("c"), Some((4.0, 5.0)));
        assert_eq!(embedding.positions()[0], (0.0, 1.0));
    }

    #[test]
    fn test_embedding_shape_checks() {
        assert!(Embedding::new(names(), array![[0.0, 1.0, 2.0]]).is_err());
        assert!(Embedding::new(names(), array![[0.0, 1.0]]).is_err());
    }

    #[test]
    fn test_reordered() {
        let embedding =
            Embedding::new(names(), array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]]).unwrap();
        let order = vec!["c".to_string(), "a".to_string(), "b".to_string()];
        let reordered = embedding.reordered(&order).unwrap();

        assert_eq!(reordered.position(0), Some((4.0, 5.0)));
        assert_eq!(reordered.position_of("b"), Some((2.0, 3.0)));
        assert!(embedding.reordered(&["z".to_string()]).is_err());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("random".parse::<EmbeddingMethod>().unwrap(), EmbeddingMethod::Random);
        assert_eq!("var_tsne".parse::<EmbeddingMethod>().unwrap(), EmbeddingMethod::VarTsne);
        assert_eq!(
            "correl-tsne".parse::<EmbeddingMethod>().unwrap(),
            EmbeddingMethod::CorrelTsne
        );
        assert!(matches!(
            "umap".parse::<EmbeddingMethod>(),
            Err(Error::InvalidEmbeddingMethod(_))
        ));
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::MissingValuesReplaced {
            count: 3,
            replacement: 0.0,
        };
        assert_eq!(
            diagnostic.to_string(),
            "replaced 3 missing values with 0 before embedding"
        );
    }
}
