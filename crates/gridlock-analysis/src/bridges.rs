//! Strong bridges from forward and reverse dominator trees.
//!
//! A strong bridge is an edge whose removal increases the number of strongly
//! connected components. The detector works inside the largest strongly
//! connected subgraph `H`:
//!
//! 1. `H` = largest SCC of the input (ties: component with the smallest id).
//! 2. Root `s` = smallest vertex id in `H`.
//! 3. `DE` = edge dominators of `H` from `s`.
//! 4. `DER` = edge dominators of `reverse(H)` from `s`.
//! 5. Flip `DER` back to the original orientation.
//! 6. Bridges = `DE` union flipped `DER`.
//! 7. Drop loop-segment edges (roundabouts and similar closed-loop bypasses)
//!    when configured.
//!
//! In [`BridgeMode::Exact`] an edge dominator `(u, v)` is kept only when `v`
//! dominates every other predecessor of `v`, so that every path from `s` to
//! `v` really uses the edge. [`BridgeMode::EdgeDominators`] keeps the plain
//! `idom(v) = u` sets.

use std::collections::BTreeSet;
use std::time::Instant;

use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use gridlock_core::config::{BridgeConfig, BridgeMode};
use gridlock_core::error::GraphError;
use gridlock_core::graph::{RoadGraph, VertexId};

use crate::connectivity::largest_strong_component;
use crate::dominators::{DominatorTree, compute_immediate_dominators, edge_dominators_in};

/// Strong-bridge analysis result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongBridgeSet {
    /// Vertex count of the analyzed subgraph `H`.
    pub component_size: usize,
    /// Root used for both dominator trees; `None` for an empty input.
    pub root: Option<VertexId>,
    /// Bridges as `(source, target)` pairs, sorted.
    pub bridges: Vec<(VertexId, VertexId)>,
    /// Candidate bridges dropped because they are loop-segment edges.
    pub excluded_loop_edges: Vec<(VertexId, VertexId)>,
}

impl StrongBridgeSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    #[must_use]
    pub fn contains(&self, source: VertexId, target: VertexId) -> bool {
        self.bridges.binary_search(&(source, target)).is_ok()
    }
}

/// Finds strong bridges of the largest strongly connected subgraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrongBridgeDetector {
    config: BridgeConfig,
}

impl StrongBridgeDetector {
    #[must_use]
    pub const fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// Run the seven-step detection on `graph`.
    ///
    /// # Errors
    ///
    /// Propagates [`GraphError`] from subgraph or dominator computation;
    /// neither occurs for a well-formed graph.
    #[instrument(skip(self, graph), fields(vertices = graph.vertex_count(), mode = ?self.config.mode))]
    pub fn detect(&self, graph: &RoadGraph) -> Result<StrongBridgeSet, GraphError> {
        let started = Instant::now();

        let members = largest_strong_component(graph);
        let Some(&root) = members.first() else {
            return Ok(StrongBridgeSet::default());
        };
        let h = graph.induced_subgraph(&members)?;
        let hr = h.reverse();
        debug!(component_size = h.vertex_count(), %root, "analyzing largest strong component");

        let forward = compute_immediate_dominators(&h, root)?;
        let backward = compute_immediate_dominators(&hr, root)?;

        let mut candidates: BTreeSet<(VertexId, VertexId)> = self.dominator_edges(&h, &forward);
        candidates.extend(
            self.dominator_edges(&hr, &backward)
                .into_iter()
                .map(|(u, v)| (v, u)),
        );

        let mut bridges = Vec::with_capacity(candidates.len());
        let mut excluded_loop_edges = Vec::new();
        for (u, v) in candidates {
            let data = h.edge_data(u, v)?;
            if self.config.exclude_loop_edges && data.loop_segment {
                excluded_loop_edges.push((u, v));
            } else {
                bridges.push((u, v));
            }
        }

        info!(
            bridges = bridges.len(),
            excluded = excluded_loop_edges.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "strong bridges computed"
        );
        Ok(StrongBridgeSet {
            component_size: h.vertex_count(),
            root: Some(root),
            bridges,
            excluded_loop_edges,
        })
    }

    /// Edge dominators of `g`, refined per the configured mode.
    fn dominator_edges(
        &self,
        g: &RoadGraph,
        tree: &DominatorTree,
    ) -> BTreeSet<(VertexId, VertexId)> {
        let mut edges = edge_dominators_in(g, tree);
        if self.config.mode == BridgeMode::Exact {
            edges.retain(|&(u, v)| is_sole_entry(g, tree, u, v));
        }
        edges
    }
}

/// True when every predecessor of `v` other than `u` is dominated by `v`,
/// so every path from the root into `v` enters through `u -> v`.
fn is_sole_entry(g: &RoadGraph, tree: &DominatorTree, u: VertexId, v: VertexId) -> bool {
    let (Some(u), Some(v)) = (g.index_of(u), g.index_of(v)) else {
        return false;
    };
    g.petgraph()
        .neighbors_directed(v, Direction::Incoming)
        .all(|w| w == u || tree.dominates_index(v.index(), w.index()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
