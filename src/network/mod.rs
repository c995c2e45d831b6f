//! Assembled correlation network.
//!
//! A [`Network`] owns the variable ordering, the corrected pairwise matrix,
//! the embedding and the significance threshold. Edges are never stored:
//! they are derived on demand from the matrix with [`passes_filter`], so
//! changing `alpha` only refilters.

mod builder;
mod graph;

pub use builder::{correlnet, CorrelnetOptions, NetworkBuilder};
pub use graph::GraphView;

use crate::correlation::{CorrelationMatrix, PairwiseResult};
use crate::embedding::Embedding;
use crate::error::{Error, Result};
use crate::render::RenderData;

/// Whether the ordered pair (i, j) is a significant edge at `alpha`.
///
/// Self-pairs never pass; NaN p-values never pass.
pub fn passes_filter(i: usize, j: usize, result: &PairwiseResult, alpha: f64) -> bool {
    i != j && result.pvalue <= alpha
}

/// Check that a threshold lies in [0, 1]
pub(crate) fn validate_alpha(alpha: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(alpha)
    } else {
        Err(Error::InvalidThreshold(alpha))
    }
}

/// One edge between two variables
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Name of the first variable
    pub source: String,
    /// Name of the second variable
    pub target: String,
    /// Index of the first variable in the network ordering
    pub source_index: usize,
    /// Index of the second variable in the network ordering
    pub target_index: usize,
    /// Signed correlation statistic
    pub statistic: f64,
    /// Corrected p-value
    pub pvalue: f64,
}

impl Edge {
    /// Edge for the ordered pair (i, j)
    pub(crate) fn ordered(names: &[String], i: usize, j: usize, result: &PairwiseResult) -> Self {
        Self {
            source: names[i].clone(),
            target: names[j].clone(),
            source_index: i,
            target_index: j,
            statistic: result.statistic,
            pvalue: result.pvalue,
        }
    }

    /// Edge for the unordered pair {i, j}, smaller index first
    pub(crate) fn undirected(names: &[String], i: usize, j: usize, result: &PairwiseResult) -> Self {
        Self::ordered(names, i.min(j), i.max(j), result)
    }
}

/// Variables placed in 2D and linked by significant correlations
#[derive(Debug, Clone)]
pub struct Network {
    matrix: CorrelationMatrix,
    embedding: Embedding,
    alpha: f64,
    method_name: String,
}

impl Network {
    /// Assemble a network from its parts.
    ///
    /// The embedding is reordered to the matrix variable order; it must
    /// contain exactly the same variables.
    pub fn new(
        matrix: CorrelationMatrix,
        embedding: Embedding,
        alpha: f64,
        method_name: impl Into<String>,
    ) -> Result<Self> {
        let alpha = validate_alpha(alpha)?;
        if embedding.len() != matrix.n_variables() {
            return Err(Error::LengthMismatch {
                expected: matrix.n_variables(),
                actual: embedding.len(),
            });
        }
        let embedding = if embedding.variables() == matrix.variables() {
            embedding
        } else {
            embedding.reordered(matrix.variables())?
        };

        Ok(Self {
            matrix,
            embedding,
            alpha,
            method_name: method_name.into(),
        })
    }

    /// Variable names in the network ordering
    pub fn variables(&self) -> &[String] {
        self.matrix.variables()
    }

    /// Number of variables
    pub fn n_variables(&self) -> usize {
        self.matrix.n_variables()
    }

    /// Position of a variable in the ordering
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variables().iter().position(|v| v == name)
    }

    /// Corrected pairwise matrix
    pub fn matrix(&self) -> &CorrelationMatrix {
        &self.matrix
    }

    /// Result for the ordered pair (i, j)
    pub fn result(&self, i: usize, j: usize) -> Option<&PairwiseResult> {
        self.matrix.get(i, j)
    }

    /// Result for the ordered pair of named variables
    pub fn result_by_name(&self, var_1: &str, var_2: &str) -> Option<&PairwiseResult> {
        self.matrix.get_by_name(var_1, var_2)
    }

    /// Variable positions
    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    /// (x, y) per variable, in the network ordering
    pub fn positions(&self) -> Vec<(f64, f64)> {
        self.embedding.positions()
    }

    /// Name of the correlation method
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Current significance threshold
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Change the threshold; later queries refilter the stored matrix
    pub fn set_alpha(&mut self, alpha: f64) -> Result<()> {
        self.alpha = validate_alpha(alpha)?;
        Ok(())
    }

    /// Ordered pairs passing the filter at the current threshold, row-major
    pub fn edges(&self) -> Vec<Edge> {
        self.collect_edges(self.alpha, false)
    }

    /// Ordered pairs passing the filter at `alpha`, without changing the network
    pub fn edges_at(&self, alpha: f64) -> Result<Vec<Edge>> {
        Ok(self.collect_edges(validate_alpha(alpha)?, false))
    }

    /// One edge per unordered pair passing the filter, listed with the
    /// smaller index first.
    ///
    /// Each pair {i, j} with i < j is represented by its (j, i) entry, the
    /// one written last in row-major order.
    pub fn undirected_edges(&self) -> Vec<Edge> {
        self.collect_edges(self.alpha, true)
    }

    /// Filtered undirected view for graph queries
    pub fn graph(&self) -> GraphView<'_> {
        GraphView::filtered(self, self.alpha)
    }

    /// Undirected view over every pair, self-pairs included
    pub fn graph_unfiltered(&self) -> GraphView<'_> {
        GraphView::unfiltered(self)
    }

    /// Shapes handed to an external renderer
    pub fn render_data(&self) -> RenderData {
        let edges = self.edges();
        RenderData {
            positions: self.positions(),
            edge_list: edges
                .iter()
                .map(|e| (e.source_index, e.target_index))
                .collect(),
            edge_statistics: edges.iter().map(|e| e.statistic).collect(),
            colorbar_label: self.method_name.clone(),
            labels: self.variables().to_vec(),
            axes: self.embedding.axes().clone(),
        }
    }

    fn collect_edges(&self, alpha: f64, undirected: bool) -> Vec<Edge> {
        let names = self.variables();
        self.matrix
            .iter()
            .filter(|&(i, j, _)| !undirected || i > j)
            .filter(|&(i, j, result)| passes_filter(i, j, result, alpha))
            .map(|(i, j, result)| {
                if undirected {
                    Edge::undirected(names, i, j, result)
                } else {
                    Edge::ordered(names, i, j, result)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// a-b strongly related, c unrelated
    pub(crate) fn sample_network(alpha: f64) -> Network {
        let results = vec![
            PairwiseResult::new(1.0, 0.0),
            PairwiseResult::new(0.9, 0.001),
            PairwiseResult::new(0.1, 0.4),
            PairwiseResult::new(0.9, 0.001),
            PairwiseResult::new(1.0, 0.0),
            PairwiseResult::new(-0.2, 0.2),
            PairwiseResult::new(0.1, 0.4),
            PairwiseResult::new(-0.2, 0.2),
            PairwiseResult::new(1.0, 0.0),
        ];
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let matrix = CorrelationMatrix::new(names.clone(), results).unwrap();
        let embedding =
            Embedding::new(names, array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
        Network::new(matrix, embedding, alpha, "pearson").unwrap()
    }

    /// Only the (b, a) entry is significant
    pub(crate) fn asymmetric_network() -> Network {
        let results = vec![
            PairwiseResult::new(1.0, 0.0),
            PairwiseResult::new(0.3, 0.9),
            PairwiseResult::new(-0.7, 0.01),
            PairwiseResult::new(1.0, 0.0),
        ];
        let names = vec!["a".to_string(), "b".to_string()];
        let matrix = CorrelationMatrix::new(names.clone(), results).unwrap();
        let embedding = Embedding::new(names, array![[0.0, 0.0], [1.0, 0.0]]).unwrap();
        Network::new(matrix, embedding, 0.05, "asymmetric").unwrap()
    }

    #[test]
    fn test_filter_predicate() {
        let significant = PairwiseResult::new(0.5, 0.01);
        assert!(passes_filter(0, 1, &significant, 0.05));
        assert!(!passes_filter(1, 1, &significant, 1.0));
        assert!(!passes_filter(0, 1, &significant, 0.001));
        assert!(!passes_filter(0, 1, &PairwiseResult::new(f64::NAN, f64::NAN), 1.0));
    }

    #[test]
    fn test_edges_are_ordered_pairs() {
        let network = sample_network(0.05);
        let edges = network.edges();

        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].source_index, edges[0].target_index), (0, 1));
        assert_eq!((edges[1].source_index, edges[1].target_index), (1, 0));

        let undirected = network.undirected_edges();
        assert_eq!(undirected.len(), 1);
        assert_eq!(undirected[0].source, "a");
        assert_eq!(undirected[0].target, "b");
    }

    #[test]
    fn test_set_alpha_refilters() {
        let mut network = sample_network(0.05);
        assert_eq!(network.undirected_edges().len(), 1);

        network.set_alpha(0.3).unwrap();
        assert_eq!(network.undirected_edges().len(), 2);

        network.set_alpha(1.0).unwrap();
        assert_eq!(network.edges().len(), 6);

        network.set_alpha(0.0).unwrap();
        assert!(network.edges().is_empty());

        assert!(matches!(network.set_alpha(1.5), Err(Error::InvalidThreshold(_))));
        assert_eq!(network.alpha(), 0.0);
    }

    #[test]
    fn test_edges_at_leaves_alpha() {
        let network = sample_network(0.05);
        assert_eq!(network.edges_at(0.3).unwrap().len(), 4);
        assert_eq!(network.edges_at(0.5).unwrap().len(), 6);
        assert_eq!(network.alpha(), 0.05);
        assert!(network.edges_at(-0.1).is_err());
    }

    #[test]
    fn test_undirected_edges_use_lower_entry() {
        let network = asymmetric_network();

        let edges = network.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].source_index, edges[0].target_index), (1, 0));

        let undirected = network.undirected_edges();
        assert_eq!(undirected.len(), 1);
        assert_eq!((undirected[0].source.as_str(), undirected[0].target.as_str()), ("a", "b"));
        assert_eq!(undirected[0].statistic, -0.7);
        assert_eq!(undirected[0].pvalue, 0.01);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let names = vec!["a".to_string()];
        let matrix =
            CorrelationMatrix::new(names.clone(), vec![PairwiseResult::new(1.0, 0.0)]).unwrap();
        let embedding = Embedding::new(names, array![[0.0, 0.0]]).unwrap();
        assert!(matches!(
            Network::new(matrix, embedding, f64::NAN, "pearson"),
            Err(Error::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_embedding_follows_matrix_order() {
        let names = vec!["a".to_string(), "b".to_string()];
        let matrix = CorrelationMatrix::new(
            names,
            vec![PairwiseResult::new(1.0, 0.0); 4],
        )
        .unwrap();
        let embedding = Embedding::new(
            vec!["b".to_string(), "a".to_string()],
            array![[5.0, 5.0], [1.0, 1.0]],
        )
        .unwrap();

        let network = Network::new(matrix, embedding, 0.05, "pearson").unwrap();
        assert_eq!(network.positions(), vec![(1.0, 1.0), (5.0, 5.0)]);
    }

    #[test]
    fn test_render_data() {
        let data = sample_network(0.05).render_data();

        assert_eq!(data.positions.len(), 3);
        assert_eq!(data.edge_list, vec![(0, 1), (1, 0)]);
        assert_eq!(data.edge_statistics, vec![0.9, 0.9]);
        assert_eq!(data.colorbar_label, "pearson");
        assert_eq!(data.labels, vec!["a", "b", "c"]);
    }
}
