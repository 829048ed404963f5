//! Vertex removal policies.
//!
//! Both policies derive a new graph from the one passed in; the input is
//! never modified, so concurrent trials can share a single baseline.

use rand::Rng;
use rand::seq::index;

use gridlock_core::error::GraphError;
use gridlock_core::graph::RoadGraph;
use petgraph::graph::NodeIndex;

use crate::ranking::Ranking;

/// Delete the top `k` vertices of `ranking`. `k = 0` returns an identical
/// copy of `graph`.
///
/// # Errors
///
/// Returns [`GraphError::UnknownVertex`] if the ranking names a vertex that
/// is not in `graph`.
pub fn remove_by_ranking(
    graph: &RoadGraph,
    ranking: &Ranking,
    k: usize,
) -> Result<RoadGraph, GraphError> {
    graph.delete_vertices(ranking.top(k))
}

/// Delete `k` vertices drawn uniformly without replacement from the whole
/// vertex set of `graph`. `k` is clamped to the vertex count.
#[must_use]
pub fn remove_random<R: Rng + ?Sized>(graph: &RoadGraph, k: usize, rng: &mut R) -> RoadGraph {
    let n = graph.vertex_count();
    let picked: Vec<NodeIndex> = index::sample(rng, n, k.min(n))
        .into_iter()
        .map(NodeIndex::new)
        .collect();
    graph.delete_indices(&picked)
}
