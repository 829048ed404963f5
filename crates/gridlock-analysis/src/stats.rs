//! Basic statistics for a road graph.
//!
//! - **vertex_count** / **edge_count**: sizes after parallel-edge collapse.
//! - **density**: `edge_count / (vertex_count * (vertex_count - 1))`; zero
//!   for graphs with fewer than two vertices.
//! - **strong_component_count** / **weak_component_count**: component counts
//!   under each connectivity notion.
//! - **largest_strong_component**: size of the subgraph analyzed for strong
//!   bridges.
//! - **loop_segment_edge_count**: edges flagged as closed-loop bypasses.
//! - **isolated_vertex_count**: vertices with no incident edges.
//! - **max_in_degree** / **max_out_degree**.

use petgraph::visit::IntoNodeIdentifiers;
use serde::{Deserialize, Serialize};

use gridlock_core::graph::RoadGraph;

use crate::connectivity::{compute_metrics, compute_weak_metrics};
use crate::metrics::degree::compute_in_out_degree;

/// Summary statistics for a road graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub strong_component_count: usize,
    pub largest_strong_component: usize,
    pub weak_component_count: usize,
    pub loop_segment_edge_count: usize,
    pub isolated_vertex_count: usize,
    pub max_in_degree: usize,
    pub max_out_degree: usize,
}

impl GraphStats {
    /// Compute statistics for `graph`.
    #[must_use]
    pub fn from_graph(graph: &RoadGraph) -> Self {
        let g = graph.petgraph();
        let vertex_count = g.node_count();
        let edge_count = g.edge_count();

        let strong = compute_metrics(graph);
        let weak = compute_weak_metrics(graph);

        let (in_degree, out_degree) = compute_in_out_degree(graph);

        let isolated_vertex_count = g
            .node_identifiers()
            .filter(|&idx| in_degree[idx.index()] == 0 && out_degree[idx.index()] == 0)
            .count();

        Self {
            vertex_count,
            edge_count,
            density: compute_density(vertex_count, edge_count),
            strong_component_count: strong.component_count,
            largest_strong_component: strong.largest_component_size,
            weak_component_count: weak.component_count,
            loop_segment_edge_count: g.edge_weights().filter(|e| e.loop_segment).count(),
            isolated_vertex_count,
            max_in_degree: in_degree.into_iter().max().unwrap_or(0),
            max_out_degree: out_degree.into_iter().max().unwrap_or(0),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn compute_density(vertex_count: usize, edge_count: usize) -> f64 {
    if vertex_count < 2 {
        return 0.0;
    }
    edge_count as f64 / (vertex_count * (vertex_count - 1)) as f64
}
