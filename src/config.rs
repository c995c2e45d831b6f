//! Configuration management
//!
//! Network settings as a TOML document. Every field has a default, so a file
//! only needs the keys it changes:
//!
//! ```toml
//! method = "spearman"
//! correction = "fdr_bh"   # "" disables correction
//! embedding = "correl_tsne"
//! alpha = 0.01
//! seed = 19
//!
//! [tsne]
//! perplexity = 10.0
//! ```

use crate::correction::Correction;
use crate::correlation::CorrelationMethod;
use crate::embedding::{EmbeddingMethod, TsneConfig};
use crate::error::Result;
use crate::network::NetworkBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seed used when neither the command line nor the file sets one
pub const DEFAULT_SEED: u64 = 19;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub method: String,
    pub correction: Option<String>,
    pub embedding: String,
    pub alpha: f64,
    pub standardize: bool,
    pub use_abs: bool,
    pub seed: Option<u64>,
    pub exploit_symmetry: bool,
    pub tsne: TsneConfig,
    pub logging: LoggingConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            method: "pearson".to_string(),
            correction: Some("bonferroni".to_string()),
            embedding: "var_tsne".to_string(),
            alpha: 0.05,
            standardize: true,
            use_abs: true,
            seed: None,
            exploit_symmetry: false,
            tsne: TsneConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NetworkConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NetworkConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply a command-line seed; without one, keep the file's seed or fall
    /// back to [`DEFAULT_SEED`]
    pub fn override_seed(&mut self, seed: Option<u64>) {
        self.seed = seed.or(self.seed).or(Some(DEFAULT_SEED));
    }

    /// Resolve every name and return a configured builder
    pub fn builder(&self) -> Result<NetworkBuilder> {
        let method: CorrelationMethod = self.method.parse()?;
        let embedding: EmbeddingMethod = self.embedding.parse()?;
        let correction = Correction::parse_optional(self.correction.as_deref())?;

        let mut builder = NetworkBuilder::new()
            .with_method(method)
            .with_correction(correction)
            .with_embedding(embedding)
            .with_alpha(self.alpha)?
            .with_standardize(self.standardize)
            .with_use_abs(self.use_abs)
            .with_tsne_config(self.tsne.clone())
            .exploit_symmetry(self.exploit_symmetry);
        if let Some(seed) = self.seed {
            builder = builder.with_seed(seed);
        }

        Ok(builder)
    }
}
