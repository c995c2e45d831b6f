//! Undirected graph view over a network's pairwise matrix.

use super::{passes_filter, Edge, Network};
use crate::correlation::PairwiseResult;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;

/// Borrowed, lazily filtered undirected view of a [`Network`].
///
/// Each unordered pair {i, j} with i < j contributes at most one edge, taken
/// from the (j, i) entry of the matrix, the one written last in row-major
/// order. Asymmetric methods are resolved the same way by every view and by
/// [`Network::undirected_edges`]. The filtered view applies
/// [`passes_filter`] at the captured threshold; the unfiltered view keeps
/// every pair and the self-loops.
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a> {
    network: &'a Network,
    alpha: Option<f64>,
}

impl<'a> GraphView<'a> {
    pub(super) fn filtered(network: &'a Network, alpha: f64) -> Self {
        Self {
            network,
            alpha: Some(alpha),
        }
    }

    pub(super) fn unfiltered(network: &'a Network) -> Self {
        Self {
            network,
            alpha: None,
        }
    }

    /// Threshold applied by this view, `None` when unfiltered
    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    fn keeps(&self, i: usize, j: usize, result: &PairwiseResult) -> bool {
        match self.alpha {
            Some(alpha) => i > j && passes_filter(i, j, result, alpha),
            None => i >= j,
        }
    }

    /// Kept pairs as (smaller index, larger index, result)
    fn edge_iter(&self) -> impl Iterator<Item = (usize, usize, &'a PairwiseResult)> + '_ {
        self.network
            .matrix()
            .iter()
            .filter(move |&(i, j, result)| self.keeps(i, j, result))
            .map(|(i, j, result)| (j, i, result))
    }

    /// Number of nodes (all variables, connected or not)
    pub fn node_count(&self) -> usize {
        self.network.n_variables()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.edge_iter().count()
    }

    /// Edges with source index <= target index
    pub fn edges(&self) -> Vec<Edge> {
        let names = self.network.variables();
        self.edge_iter()
            .map(|(i, j, result)| Edge::undirected(names, i, j, result))
            .collect()
    }

    /// Names of the variables linked to `name`
    pub fn neighbors(&self, name: &str) -> Vec<String> {
        let Some(node) = self.network.index_of(name) else {
            return Vec::new();
        };
        let names = self.network.variables();

        self.edge_iter()
            .filter_map(|(i, j, _)| match (i == node, j == node) {
                (true, _) => Some(j),
                (false, true) => Some(i),
                _ => None,
            })
            .map(|k| names[k].clone())
            .collect()
    }

    /// Number of edges incident to `name`
    pub fn degree(&self, name: &str) -> usize {
        self.neighbors(name).len()
    }

    /// Edge count relative to the n(n-1)/2 possible edges
    pub fn density(&self) -> f64 {
        let n = self.node_count() as f64;
        if n <= 1.0 {
            return 0.0;
        }

        let links = self.edge_iter().filter(|&(i, j, _)| i != j).count();
        let max_edges = n * (n - 1.0) / 2.0;
        links as f64 / max_edges
    }

    /// Connected components, each listed in variable order, ordered by their first member
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        let n = self.node_count();
        let mut sets = UnionFind::<usize>::new(n);
        for (i, j, _) in self.edge_iter() {
            sets.union(i, j);
        }

        let names = self.network.variables();
        let mut components: Vec<Vec<String>> = Vec::new();
        let mut slot_of_root: Vec<Option<usize>> = vec![None; n];

        for k in 0..n {
            let root = sets.find(k);
            let slot = match slot_of_root[root] {
                Some(slot) => slot,
                None => {
                    components.push(Vec::new());
                    slot_of_root[root] = Some(components.len() - 1);
                    components.len() - 1
                }
            };
            components[slot].push(names[k].clone());
        }

        components
    }

    /// Materialise the view as a petgraph graph; node k is variable k
    pub fn to_petgraph(&self) -> UnGraph<String, PairwiseResult> {
        let mut graph = UnGraph::with_capacity(self.node_count(), 0);
        for name in self.network.variables() {
            graph.add_node(name.clone());
        }
        for (i, j, result) in self.edge_iter() {
            graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), *result);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{asymmetric_network, sample_network};

    #[test]
    fn test_filtered_view() {
        let network = sample_network(0.05);
        let graph = network.graph();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.neighbors("a"), vec!["b"]);
        assert_eq!(graph.degree("c"), 0);
        assert_eq!(graph.degree("missing"), 0);
        assert!((graph.density() - 1.0 / 3.0).abs() < 1e-10);
        assert_eq!(
            graph.connected_components(),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
    }

    #[test]
    fn test_view_tracks_alpha() {
        let mut network = sample_network(0.05);
        assert_eq!(network.graph().edge_count(), 1);

        network.set_alpha(0.5).unwrap();
        let graph = network.graph();
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.connected_components().len(), 1);
        assert!((graph.density() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_unfiltered_view_keeps_self_loops() {
        let network = sample_network(0.0);
        let graph = network.graph_unfiltered();

        assert_eq!(graph.alpha(), None);
        assert_eq!(graph.edge_count(), 6);
        assert!((graph.density() - 1.0).abs() < 1e-10);
        assert_eq!(network.graph().edge_count(), 0);
    }

    #[test]
    fn test_to_petgraph() {
        let network = sample_network(0.3);
        let graph = network.graph().to_petgraph();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(petgraph::algo::connected_components(&graph), 1);

        let weights: Vec<f64> = graph.edge_weights().map(|r| r.statistic).collect();
        assert_eq!(weights, vec![0.9, -0.2]);
    }

    #[test]
    fn test_asymmetric_pair_uses_lower_entry() {
        let network = asymmetric_network();

        assert_eq!(network.edges().len(), 1);
        let graph = network.graph();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.neighbors("a"), vec!["b"]);

        let edges = graph.edges();
        assert_eq!((edges[0].source_index, edges[0].target_index), (0, 1));
        assert_eq!(edges[0].pvalue, 0.01);
        assert_eq!(edges[0].statistic, -0.7);

        let exported = graph.to_petgraph();
        assert_eq!(exported.edge_count(), 1);
        assert_eq!(exported.edge_weights().next().map(|r| r.pvalue), Some(0.01));
    }
}
