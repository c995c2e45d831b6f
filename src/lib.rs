//! # Correlnet
//!
//! Turns a table of numeric observations (rows = samples, columns = variables)
//! into a correlation network: every variable becomes a node placed in a 2D
//! layout, and statistically significant pairwise correlations become edges.
//!
//! ## Features
//!
//! - **Data Module**: observation tables, CSV loading and demo data
//! - **Correlation Module**: Pearson, Spearman, Kendall or custom statistics with p-values
//! - **Correction Module**: Bonferroni, Holm, Benjamini-Hochberg and friends
//! - **Embedding Module**: random, raw-value t-SNE and correlation-profile t-SNE layouts
//! - **Network Module**: assembly, edge filtering and graph views
//! - **Annotation Module**: per-variable correlation against an external target
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use correlnet::{
//!     data::{CsvOptions, ObservationTable},
//!     correlation::CorrelationMethod,
//!     embedding::EmbeddingMethod,
//!     network::NetworkBuilder,
//! };
//!
//! fn main() -> correlnet::Result<()> {
//!     let table = ObservationTable::from_csv("data.csv", &CsvOptions::default())?;
//!
//!     let network = NetworkBuilder::new()
//!         .with_method(CorrelationMethod::Spearman)
//!         .with_embedding(EmbeddingMethod::CorrelTsne)
//!         .with_alpha(0.05)?
//!         .with_seed(19)
//!         .build(&table)?;
//!
//!     for edge in network.undirected_edges() {
//!         println!("{} -- {}: {:.3}", edge.source, edge.target, edge.statistic);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod annotation;
pub mod config;
pub mod correction;
pub mod correlation;
pub mod data;
pub mod embedding;
pub mod error;
pub mod network;
pub mod render;

// Re-export commonly used types
pub use correction::Correction;
pub use correlation::{CorrelationEngine, CorrelationMatrix, CorrelationMethod, PairwiseResult};
pub use data::ObservationTable;
pub use embedding::{Embedder, Embedding, EmbeddingMethod};
pub use error::{Error, Result};
pub use network::{Network, NetworkBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
