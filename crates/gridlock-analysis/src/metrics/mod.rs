//! Per-vertex centrality metrics.
//!
//! # Overview
//!
//! [`compute_centrality`] produces a [`CentralityTable`] with three scores per
//! vertex:
//!
//! - **degree** (`degree`): incident edges, in plus out.
//! - **closeness** (`closeness`): inverse mean shortest-path distance to the
//!   reachable set.
//! - **betweenness** (`betweenness`): Brandes accumulation over all ordered
//!   pairs of shortest paths.
//!
//! Betweenness dominates the cost (O(V * E) hops, O(V * E log V) weighted),
//! so the table is meant to be computed once per graph and shared read-only.
//!
//! # Determinism
//!
//! Parallel runs split the work into fixed-size chunks of sources whose
//! partial results are combined in chunk order. Parallel and sequential runs
//! therefore produce bit-identical tables.

pub mod betweenness;
pub mod closeness;
pub mod degree;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use gridlock_core::config::{CentralityConfig, ClosenessMode, PathMetric};
use gridlock_core::graph::{RoadGraph, VertexId};

pub use betweenness::compute_betweenness;
pub use closeness::compute_closeness;
pub use degree::compute_degree;

// ---------------------------------------------------------------------------
// Metric names
// ---------------------------------------------------------------------------

/// One of the three centrality scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralityMetric {
    Degree,
    Closeness,
    Betweenness,
}

impl CentralityMetric {
    pub const ALL: [Self; 3] = [Self::Degree, Self::Closeness, Self::Betweenness];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Degree => "degree",
            Self::Closeness => "closeness",
            Self::Betweenness => "betweenness",
        }
    }
}

impl fmt::Display for CentralityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CentralityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degree" => Ok(Self::Degree),
            "closeness" => Ok(Self::Closeness),
            "betweenness" => Ok(Self::Betweenness),
            other => Err(format!("unknown centrality metric `{other}`")),
        }
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Scores for one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentralityRow {
    pub vertex: VertexId,
    pub degree: usize,
    pub closeness: f64,
    pub betweenness: f64,
}

impl CentralityRow {
    /// Score for `metric` as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, metric: CentralityMetric) -> f64 {
        match metric {
            CentralityMetric::Degree => self.degree as f64,
            CentralityMetric::Closeness => self.closeness,
            CentralityMetric::Betweenness => self.betweenness,
        }
    }
}

/// Centrality scores for every vertex, in canonical vertex order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralityTable {
    rows: Vec<CentralityRow>,
}

impl CentralityTable {
    /// Assemble a table from per-node-index score vectors.
    ///
    /// # Panics
    ///
    /// Panics if the vectors do not all have one entry per vertex of `graph`.
    #[must_use]
    pub fn from_parts(
        graph: &RoadGraph,
        degree: &[usize],
        closeness: &[f64],
        betweenness: &[f64],
    ) -> Self {
        let n = graph.vertex_count();
        assert!(
            degree.len() == n && closeness.len() == n && betweenness.len() == n,
            "score vectors must cover every vertex"
        );
        let rows = graph
            .vertex_ids()
            .iter()
            .enumerate()
            .map(|(i, &vertex)| CentralityRow {
                vertex,
                degree: degree[i],
                closeness: closeness[i],
                betweenness: betweenness[i],
            })
            .collect();
        Self { rows }
    }

    /// Rows in canonical (ascending vertex id) order.
    #[must_use]
    pub fn rows(&self) -> &[CentralityRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Scores of a single vertex.
    #[must_use]
    pub fn get(&self, vertex: VertexId) -> Option<&CentralityRow> {
        self.rows
            .binary_search_by_key(&vertex, |row| row.vertex)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// One metric for every vertex, in canonical order.
    #[must_use]
    pub fn scores(&self, metric: CentralityMetric) -> Vec<f64> {
        self.rows.iter().map(|row| row.score(metric)).collect()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Knobs for [`compute_centrality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralityOptions {
    pub path_metric: PathMetric,
    pub closeness_mode: ClosenessMode,
    pub parallel: bool,
}

impl Default for CentralityOptions {
    fn default() -> Self {
        Self {
            path_metric: PathMetric::Hops,
            closeness_mode: ClosenessMode::Undirected,
            parallel: true,
        }
    }
}

impl CentralityOptions {
    #[must_use]
    pub const fn from_config(config: &CentralityConfig, parallel: bool) -> Self {
        Self {
            path_metric: config.path_metric,
            closeness_mode: config.closeness_mode,
            parallel,
        }
    }
}

/// Compute degree, closeness, and betweenness for every vertex.
#[must_use]
#[instrument(skip(graph), fields(vertices = graph.vertex_count(), edges = graph.edge_count()))]
pub fn compute_centrality(graph: &RoadGraph, options: CentralityOptions) -> CentralityTable {
    let started = Instant::now();

    let degree = compute_degree(graph);
    let closeness = compute_closeness(
        graph,
        options.path_metric,
        options.closeness_mode,
        options.parallel,
    );
    let betweenness = compute_betweenness(graph, options.path_metric, options.parallel);

    let table = CentralityTable::from_parts(graph, &degree, &closeness, &betweenness);
    info!(
        vertices = table.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "centrality computed"
    );
    table
}

// ---------------------------------------------------------------------------
// Shared adjacency
// ---------------------------------------------------------------------------

/// Index-based adjacency lists with per-edge traversal cost.
#[derive(Debug, Clone)]
pub(crate) struct Adjacency {
    lists: Vec<Vec<(usize, f64)>>,
}

impl Adjacency {
    fn cost(metric: PathMetric, weight: f64) -> f64 {
        match metric {
            PathMetric::Hops => 1.0,
            PathMetric::Length => weight,
        }
    }

    /// Successor lists.
    pub(crate) fn outgoing(graph: &RoadGraph, metric: PathMetric) -> Self {
        let g = graph.petgraph();
        let mut lists = vec![Vec::new(); g.node_count()];
        for edge in g.edge_references() {
            lists[edge.source().index()]
                .push((edge.target().index(), Self::cost(metric, edge.weight().weight)));
        }
        Self { lists }
    }

    /// Successors and predecessors merged, edges usable in either direction.
    pub(crate) fn undirected(graph: &RoadGraph, metric: PathMetric) -> Self {
        let g = graph.petgraph();
        let mut lists = vec![Vec::new(); g.node_count()];
        for edge in g.edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            let cost = Self::cost(metric, edge.weight().weight);
            lists[a].push((b, cost));
            if a != b {
                lists[b].push((a, cost));
            }
        }
        Self { lists }
    }

    pub(crate) fn len(&self) -> usize {
        self.lists.len()
    }

    pub(crate) fn neighbors(&self, v: usize) -> &[(usize, f64)] {
        &self.lists[v]
    }
}

/// Min-heap entry ordered by distance, then node index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HeapEntry {
    pub(crate) dist: f64,
    pub(crate) node: usize,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Number of sources per work unit for `n` vertices; depends only on `n`.
pub(crate) fn chunk_len(n: usize) -> usize {
    (n / 64).max(32)
}

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
    fn metric_names_round_trip() {
        for metric in CentralityMetric::ALL {
            assert_eq!(metric.as_str().parse::<CentralityMetric>(), Ok(metric));
        }
        assert!("pagerank".parse::<CentralityMetric>().is_err());
    }

    #[test]
    fn table_lookup_by_vertex() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let table = compute_centrality(&g, CentralityOptions::default());
        assert_eq!(table.len(), 3);
        let middle = table.get(VertexId(1)).expect("row");
        assert_eq!(middle.degree, 2);
        assert!((middle.betweenness - 1.0).abs() < 1e-12);
        assert!(table.get(VertexId(9)).is_none());
    }

    #[test]
    fn parallel_and_sequential_tables_match() {
        let edges: Vec<(u64, u64)> = (0..200)
            .flat_map(|v| [(v, (v * 7 + 3) % 200), (v, (v + 1) % 200)])
            .collect();
        let g = graph(200, &edges);
        let seq = compute_centrality(
            &g,
            CentralityOptions {
                parallel: false,
                ..CentralityOptions::default()
            },
        );
        let par = compute_centrality(&g, CentralityOptions::default());
        assert_eq!(seq, par);
    }

    #[test]
    fn heap_pops_smallest_distance_first() {
        let mut heap = std::collections::BinaryHeap::new();
        heap.push(HeapEntry { dist: 3.0, node: 0 });
        heap.push(HeapEntry { dist: 1.0, node: 5 });
        heap.push(HeapEntry { dist: 1.0, node: 2 });
        assert_eq!(heap.pop().map(|e| e.node), Some(2));
        assert_eq!(heap.pop().map(|e| e.node), Some(5));
        assert_eq!(heap.pop().map(|e| e.node), Some(0));
    }
}
