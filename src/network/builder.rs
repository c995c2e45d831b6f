//! Network builder: correlation, correction and embedding in one pass.

use super::{validate_alpha, Network};
use crate::correction::{correct, Correction};
use crate::correlation::{CorrelationEngine, CorrelationMethod};
use crate::data::ObservationTable;
use crate::embedding::{Embedder, EmbeddingMethod, RandomEmbedder, TsneConfig, TsneEmbedder};
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builder for correlation networks
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    /// Correlation method to use
    method: CorrelationMethod,
    /// Multiple-testing procedure, `None` to keep raw p-values
    correction: Option<Correction>,
    /// Built-in layout, used when no custom embedder is set
    embedding: EmbeddingMethod,
    /// Caller-supplied layout
    embedder: Option<Arc<dyn Embedder>>,
    /// Significance threshold for edges
    alpha: f64,
    /// Seed shared by every randomised step
    seed: Option<u64>,
    /// t-SNE settings
    tsne: TsneConfig,
    /// Standardize columns before variable t-SNE
    standardize: bool,
    /// Use absolute statistics for correlation t-SNE
    use_abs: bool,
    /// Compute the upper triangle only for symmetric methods
    exploit_symmetry: bool,
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self {
            method: CorrelationMethod::Pearson,
            correction: Some(Correction::Bonferroni),
            embedding: EmbeddingMethod::VarTsne,
            embedder: None,
            alpha: 0.05,
            seed: None,
            tsne: TsneConfig::default(),
            standardize: true,
            use_abs: true,
            exploit_symmetry: false,
        }
    }

    /// Set the correlation method
    pub fn with_method(mut self, method: CorrelationMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the correction procedure; `None` disables correction
    pub fn with_correction(mut self, correction: Option<Correction>) -> Self {
        self.correction = correction;
        self
    }

    /// Use one of the built-in layouts
    pub fn with_embedding(mut self, embedding: EmbeddingMethod) -> Self {
        self.embedding = embedding;
        self.embedder = None;
        self
    }

    /// Use a caller-supplied layout instead of the built-in ones
    pub fn with_embedder<E: Embedder + 'static>(mut self, embedder: E) -> Self {
        self.embedder = Some(Arc::new(embedder));
        self
    }

    /// Set the significance threshold; must lie in [0, 1]
    pub fn with_alpha(mut self, alpha: f64) -> Result<Self> {
        self.alpha = validate_alpha(alpha)?;
        Ok(self)
    }

    /// Fix the random seed for reproducible layouts
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the t-SNE configuration; a seed set here wins over [`with_seed`](Self::with_seed)
    pub fn with_tsne_config(mut self, config: TsneConfig) -> Self {
        self.tsne = config;
        self
    }

    /// Standardize columns before variable t-SNE
    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    /// Use absolute statistics for correlation t-SNE
    pub fn with_use_abs(mut self, use_abs: bool) -> Self {
        self.use_abs = use_abs;
        self
    }

    /// Compute only the upper triangle for symmetric built-in methods
    pub fn exploit_symmetry(mut self, enabled: bool) -> Self {
        self.exploit_symmetry = enabled;
        self
    }

    /// Configured correlation method
    pub fn method(&self) -> &CorrelationMethod {
        &self.method
    }

    /// Configured correction procedure
    pub fn correction(&self) -> Option<Correction> {
        self.correction
    }

    /// Configured threshold
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// t-SNE configuration after seed propagation
    pub fn tsne_config(&self) -> TsneConfig {
        let mut config = self.tsne.clone();
        if config.seed.is_none() {
            config.seed = self.seed;
        }
        config
    }

    fn resolve_embedder(&self) -> Arc<dyn Embedder> {
        if let Some(embedder) = &self.embedder {
            return Arc::clone(embedder);
        }

        match self.embedding {
            EmbeddingMethod::Random => Arc::new(RandomEmbedder::new(self.seed)),
            EmbeddingMethod::VarTsne => {
                Arc::new(TsneEmbedder::var_tsne(self.standardize, self.tsne_config()))
            }
            EmbeddingMethod::CorrelTsne => {
                Arc::new(TsneEmbedder::correl_tsne(self.use_abs, self.tsne_config()))
            }
        }
    }

    /// Build the network for a table
    pub fn build(&self, table: &ObservationTable) -> Result<Network> {
        let alpha = validate_alpha(self.alpha)?;
        if table.n_variables() == 0 {
            return Err(Error::InsufficientData("table has no columns".to_string()));
        }

        info!(
            variables = table.n_variables(),
            samples = table.n_samples(),
            method = self.method.name(),
            "Building correlation network"
        );

        let mut matrix = CorrelationEngine::new(self.method.clone())
            .exploit_symmetry(self.exploit_symmetry)
            .compute(table)?;

        match self.correction {
            Some(procedure) => {
                debug!(procedure = procedure.name(), tests = matrix.len(), "Correcting p-values");
                let corrected = correct(&matrix.pvalues(), Some(procedure));
                matrix.set_pvalues(&corrected)?;
            }
            None => debug!("Multiple-testing correction disabled"),
        }

        let embedder = self.resolve_embedder();
        debug!(embedder = embedder.name(), "Embedding variables");
        let embedding = embedder.embed(table, &matrix)?;
        for diagnostic in embedding.diagnostics() {
            warn!(%diagnostic, "Embedding diagnostic");
        }

        let network = Network::new(matrix, embedding, alpha, self.method.name())?;
        info!(
            edges = network.undirected_edges().len(),
            alpha,
            "Network assembled"
        );

        Ok(network)
    }
}

/// Layout settings for [`correlnet`]
#[derive(Debug, Clone)]
pub struct CorrelnetOptions {
    /// Seed shared by every randomised step
    pub seed: Option<u64>,
    /// t-SNE settings for `var_tsne` and `correl_tsne`
    pub tsne: TsneConfig,
    /// Standardize columns before variable t-SNE
    pub standardize: bool,
    /// Use absolute statistics for correlation t-SNE
    pub use_abs: bool,
}

impl Default for CorrelnetOptions {
    fn default() -> Self {
        Self {
            seed: None,
            tsne: TsneConfig::default(),
            standardize: true,
            use_abs: true,
        }
    }
}

impl CorrelnetOptions {
    /// Fix the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the t-SNE configuration
    pub fn with_tsne_config(mut self, tsne: TsneConfig) -> Self {
        self.tsne = tsne;
        self
    }

    /// Standardize columns before variable t-SNE
    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    /// Use absolute statistics for correlation t-SNE
    pub fn with_use_abs(mut self, use_abs: bool) -> Self {
        self.use_abs = use_abs;
        self
    }
}

/// Build a network from string settings, resolving every name up front.
///
/// `pos` is `random`, `var_tsne` or `correl_tsne`; `correction` of `None`
/// disables correction.
pub fn correlnet(
    table: &ObservationTable,
    pos: &str,
    method: &str,
    correction: Option<&str>,
    alpha: f64,
    options: &CorrelnetOptions,
) -> Result<Network> {
    let embedding: EmbeddingMethod = pos.parse()?;
    let method: CorrelationMethod = method.parse()?;
    let correction = Correction::parse_optional(correction)?;

    let mut builder = NetworkBuilder::new()
        .with_method(method)
        .with_correction(correction)
        .with_embedding(embedding)
        .with_alpha(alpha)?
        .with_tsne_config(options.tsne.clone())
        .with_standardize(options.standardize)
        .with_use_abs(options.use_abs);
    if let Some(seed) = options.seed {
        builder = builder.with_seed(seed);
    }

    builder.build(table)
}
