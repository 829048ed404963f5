//! Degree centrality.

use petgraph::{Direction, visit::IntoNodeIdentifiers};

use gridlock_core::graph::RoadGraph;

/// Total degree (in + out) per node index.
///
/// Direction is preserved: an edge and its reverse count as two incident
/// edges. A self-loop counts twice.
#[must_use]
pub fn compute_degree(graph: &RoadGraph) -> Vec<usize> {
    let g = graph.petgraph();
    g.node_identifiers()
        .map(|idx| {
            g.edges_directed(idx, Direction::Incoming).count()
                + g.edges_directed(idx, Direction::Outgoing).count()
        })
        .collect()
}

/// Split in-degree and out-degree per node index.
#[must_use]
pub fn compute_in_out_degree(graph: &RoadGraph) -> (Vec<usize>, Vec<usize>) {
    let g = graph.petgraph();
    g.node_identifiers()
        .map(|idx| {
            (
                g.edges_directed(idx, Direction::Incoming).count(),
                g.edges_directed(idx, Direction::Outgoing).count(),
            )
        })
        .unzip()
}
