//! Strong (and, separately, weak) connectivity of a road graph.
//!
//! # Metrics
//!
//! [`ConnectivityMetrics`] summarizes a component partition with three
//! numbers:
//!
//! - **component_count**: number of components.
//! - **largest_component_size**: vertex count of the biggest component.
//! - **disconnected_pair_count**: unordered vertex pairs that do not share a
//!   component, `C(N,2) - sum C(|Ci|,2)`.
//!
//! [`compute_metrics`] always uses strongly connected components.
//! [`compute_weak_metrics`] is the weakly connected variant and is reported
//! under its own name; the two are never mixed.

use petgraph::{algo::tarjan_scc, graph::NodeIndex, unionfind::UnionFind, visit::EdgeRef};
use serde::{Deserialize, Serialize};

use gridlock_core::graph::{RoadGraph, VertexId};

/// Component summary of one graph state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectivityMetrics {
    pub component_count: usize,
    pub largest_component_size: usize,
    pub disconnected_pair_count: u64,
}

impl ConnectivityMetrics {
    /// Summarize a partition given only its component sizes.
    ///
    /// An empty slice yields the all-zero metrics of the empty graph.
    #[must_use]
    pub fn from_sizes(sizes: &[usize]) -> Self {
        let n: u64 = sizes.iter().map(|&s| s as u64).sum();
        let together: u64 = sizes.iter().map(|&s| pairs(s as u64)).sum();
        Self {
            component_count: sizes.len(),
            largest_component_size: sizes.iter().copied().max().unwrap_or(0),
            disconnected_pair_count: pairs(n) - together,
        }
    }
}

const fn pairs(n: u64) -> u64 {
    if n < 2 { 0 } else { n * (n - 1) / 2 }
}

// ---------------------------------------------------------------------------
// Strong components
// ---------------------------------------------------------------------------

/// Strongly connected components as node-index groups (Tarjan, linear time).
///
/// Component order is unspecified; membership is deterministic.
#[must_use]
pub fn strong_component_indices(graph: &RoadGraph) -> Vec<Vec<NodeIndex>> {
    tarjan_scc(graph.petgraph())
}

/// Strongly connected components as vertex-id groups.
///
/// Each group is sorted ascending and groups are ordered by their smallest
/// vertex id.
#[must_use]
pub fn compute_strong_components(graph: &RoadGraph) -> Vec<Vec<VertexId>> {
    let mut components: Vec<Vec<VertexId>> = strong_component_indices(graph)
        .into_iter()
        .map(|scc| {
            let mut ids: Vec<VertexId> = scc.into_iter().map(|idx| graph.id_of(idx)).collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    components.sort_unstable_by_key(|c| c.first().copied());
    components
}

/// Vertices of the largest strongly connected component.
///
/// Ties go to the component holding the smallest vertex id. Empty for an
/// empty graph.
#[must_use]
pub fn largest_strong_component(graph: &RoadGraph) -> Vec<VertexId> {
    let mut best: Vec<VertexId> = Vec::new();
    for component in compute_strong_components(graph) {
        if component.len() > best.len() {
            best = component;
        }
    }
    best
}

/// Strong-component metrics of `graph`; all zero for an empty graph.
#[must_use]
pub fn compute_metrics(graph: &RoadGraph) -> ConnectivityMetrics {
    let sizes: Vec<usize> = strong_component_indices(graph)
        .iter()
        .map(Vec::len)
        .collect();
    ConnectivityMetrics::from_sizes(&sizes)
}

// ---------------------------------------------------------------------------
// Weak components
// ---------------------------------------------------------------------------

/// Sizes of the weakly connected components (edges taken as undirected).
#[must_use]
pub fn weak_component_sizes(graph: &RoadGraph) -> Vec<usize> {
    let g = graph.petgraph();
    let mut sets = UnionFind::<usize>::new(g.node_count());
    for edge in g.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }

    let mut counts = vec![0_usize; g.node_count()];
    for v in 0..g.node_count() {
        counts[sets.find_mut(v)] += 1;
    }
    counts.retain(|&c| c > 0);
    counts
}

/// Weak-component metrics of `graph`; all zero for an empty graph.
#[must_use]
pub fn compute_weak_metrics(graph: &RoadGraph) -> ConnectivityMetrics {
    ConnectivityMetrics::from_sizes(&weak_component_sizes(graph))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_core::graph::{Edge, Vertex};

    fn graph(n: u64, edges: &[(u64, u64)]) -> RoadGraph {
        RoadGraph::build(
            (0..n).map(|v| Vertex::bare(VertexId(v))),
            edges.iter().map(|&(a, b)| Edge::new(a, b)),
        )
        .expect("valid graph")
    }

    #[test]
    fn empty_graph_is_all_zero() {
        assert_eq!(compute_metrics(&graph(0, &[])), ConnectivityMetrics::default());
        assert_eq!(compute_weak_metrics(&graph(0, &[])), ConnectivityMetrics::default());
        assert!(largest_strong_component(&graph(0, &[])).is_empty());
    }

    #[test]
    fn isolated_and_self_looped_vertices_are_singletons() {
        let g = graph(3, &[(1, 1)]);
        let m = compute_metrics(&g);
        assert_eq!(m.component_count, 3);
        assert_eq!(m.largest_component_size, 1);
        assert_eq!(m.disconnected_pair_count, 3);
    }

    #[test]
    fn directed_cycle_is_one_component() {
        let g = graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let m = compute_metrics(&g);
        assert_eq!(
            m,
            ConnectivityMetrics {
                component_count: 1,
                largest_component_size: 4,
                disconnected_pair_count: 0,
            }
        );
    }

    #[test]
    fn directed_path_splits_strongly_but_not_weakly() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        assert_eq!(compute_metrics(&g).component_count, 3);
        assert_eq!(compute_metrics(&g).disconnected_pair_count, 3);

        let weak = compute_weak_metrics(&g);
        assert_eq!(weak.component_count, 1);
        assert_eq!(weak.largest_component_size, 3);
        assert_eq!(weak.disconnected_pair_count, 0);
    }

    #[test]
    fn two_cycles_joined_by_one_edge() {
        let g = graph(6, &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)]);
        let m = compute_metrics(&g);
        assert_eq!(m.component_count, 2);
        assert_eq!(m.largest_component_size, 3);
        assert_eq!(m.disconnected_pair_count, 9);
    }

    #[test]
    fn largest_component_tie_goes_to_smallest_id() {
        let g = graph(6, &[(3, 4), (4, 5), (5, 3), (0, 1), (1, 2), (2, 0)]);
        assert_eq!(
            largest_strong_component(&g),
            vec![VertexId(0), VertexId(1), VertexId(2)]
        );
    }

    #[test]
    fn components_are_sorted_groups() {
        let g = graph(4, &[(2, 3), (3, 2)]);
        assert_eq!(
            compute_strong_components(&g),
            vec![
                vec![VertexId(0)],
                vec![VertexId(1)],
                vec![VertexId(2), VertexId(3)],
            ]
        );
    }

    #[test]
    fn from_sizes_matches_pair_formula() {
        let m = ConnectivityMetrics::from_sizes(&[4, 3, 1]);
        // C(8,2) - C(4,2) - C(3,2) = 28 - 6 - 3
        assert_eq!(m.disconnected_pair_count, 19);
        assert_eq!(m.largest_component_size, 4);
    }
}
