//! Betweenness centrality via Brandes' algorithm.
//!
//! # Algorithm
//!
//! 1. For each source `s`, find shortest paths (BFS for hops, Dijkstra for
//!    lengths), recording path counts `sigma` and predecessor lists.
//! 2. Pop vertices in reverse settle order, accumulating the dependency
//!    `delta[v] += sigma[v] / sigma[w] * (1 + delta[w])`.
//! 3. Sum the dependencies over all sources.
//!
//! Scores count ordered pairs and are not normalized. For a directed path
//! `a -> b -> c` the middle vertex scores `1.0`.
//!
//! Complexity: O(V * E) for hops, O(V * E log V) for lengths.

use std::collections::{BinaryHeap, VecDeque};

use rayon::prelude::*;
use tracing::{debug, instrument};

use gridlock_core::config::PathMetric;
use gridlock_core::graph::RoadGraph;

use crate::metrics::{Adjacency, HeapEntry, chunk_len};

/// Betweenness per node index.
#[must_use]
#[instrument(skip(graph), fields(vertices = graph.vertex_count()))]
pub fn compute_betweenness(graph: &RoadGraph, metric: PathMetric, parallel: bool) -> Vec<f64> {
    let adjacency = Adjacency::outgoing(graph, metric);
    let n = adjacency.len();
    if n == 0 {
        return Vec::new();
    }

    let sources: Vec<usize> = (0..n).collect();
    let chunks: Vec<&[usize]> = sources.chunks(chunk_len(n)).collect();
    debug!(chunks = chunks.len(), parallel, "betweenness work split");

    let run = |chunk: &&[usize]| {
        let mut brandes = Brandes::new(n);
        let mut partial = vec![0.0; n];
        for &s in *chunk {
            brandes.accumulate(&adjacency, metric, s, &mut partial);
        }
        partial
    };

    let partials: Vec<Vec<f64>> = if parallel {
        chunks.par_iter().map(run).collect()
    } else {
        chunks.iter().map(run).collect()
    };

    let mut cb = vec![0.0; n];
    for partial in partials {
        for (total, value) in cb.iter_mut().zip(partial) {
            *total += value;
        }
    }
    cb
}

/// Reusable per-source state.
struct Brandes {
    stack: Vec<usize>,
    predecessors: Vec<Vec<usize>>,
    sigma: Vec<f64>,
    dist: Vec<f64>,
    delta: Vec<f64>,
    settled: Vec<bool>,
    queue: VecDeque<usize>,
    heap: BinaryHeap<HeapEntry>,
}

impl Brandes {
    fn new(n: usize) -> Self {
        Self {
            stack: Vec::with_capacity(n),
            predecessors: vec![Vec::new(); n],
            sigma: vec![0.0; n],
            dist: vec![f64::INFINITY; n],
            delta: vec![0.0; n],
            settled: vec![false; n],
            queue: VecDeque::new(),
            heap: BinaryHeap::new(),
        }
    }

    fn accumulate(&mut self, adjacency: &Adjacency, metric: PathMetric, s: usize, cb: &mut [f64]) {
        self.sigma[s] = 1.0;
        self.dist[s] = 0.0;

        match metric {
            PathMetric::Hops => self.bfs(adjacency, s),
            PathMetric::Length => self.dijkstra(adjacency, s),
        }

        // Accumulate dependencies in reverse settle order.
        while let Some(w) = self.stack.pop() {
            for &v in &self.predecessors[w] {
                if self.sigma[w] > 0.0 {
                    self.delta[v] += (self.sigma[v] / self.sigma[w]) * (1.0 + self.delta[w]);
                }
            }
            if w != s {
                cb[w] += self.delta[w];
            }

            self.predecessors[w].clear();
            self.sigma[w] = 0.0;
            self.dist[w] = f64::INFINITY;
            self.delta[w] = 0.0;
            self.settled[w] = false;
        }
    }

    fn bfs(&mut self, adjacency: &Adjacency, s: usize) {
        self.queue.push_back(s);
        while let Some(v) = self.queue.pop_front() {
            self.stack.push(v);
            let next = self.dist[v] + 1.0;
            for &(w, _) in adjacency.neighbors(v) {
                // First visit to w?
                if self.dist[w].is_infinite() {
                    self.dist[w] = next;
                    self.queue.push_back(w);
                }
                // Shortest path to w via v?
                if (self.dist[w] - next).abs() < f64::EPSILON {
                    self.sigma[w] += self.sigma[v];
                    self.predecessors[w].push(v);
                }
            }
        }
    }

    fn dijkstra(&mut self, adjacency: &Adjacency, s: usize) {
        self.heap.push(HeapEntry { dist: 0.0, node: s });
        while let Some(HeapEntry { dist, node: v }) = self.heap.pop() {
            if self.settled[v] || dist > self.dist[v] {
                continue;
            }
            self.settled[v] = true;
            self.stack.push(v);

            for &(w, cost) in adjacency.neighbors(v) {
                if self.settled[w] {
                    continue;
                }
                let candidate = dist + cost;
                if candidate < self.dist[w] {
                    self.dist[w] = candidate;
                    self.sigma[w] = self.sigma[v];
                    self.predecessors[w].clear();
                    self.predecessors[w].push(v);
                    self.heap.push(HeapEntry {
                        dist: candidate,
                        node: w,
                    });
                } else if candidate.total_cmp(&self.dist[w]).is_eq() {
                    self.sigma[w] += self.sigma[v];
                    self.predecessors[w].push(v);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_core::graph::{Edge, Vertex, VertexId};

    fn graph(n: u64, edges: &[(u64, u64)]) -> RoadGraph {
        RoadGraph::build(
            (0..n).map(|v| Vertex::bare(VertexId(v))),
            edges.iter().map(|&(a, b)| Edge::new(a, b)),
        )
        .expect("valid graph")
    }

    fn assert_scores(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < 1e-10, "vertex {i}: got {a}, want {e}");
        }
    }

    #[test]
    fn empty_graph_returns_empty() {
        assert!(compute_betweenness(&graph(0, &[]), PathMetric::Hops, false).is_empty());
    }

    #[test]
    fn single_node_zero_betweenness() {
        let scores = compute_betweenness(&graph(1, &[]), PathMetric::Hops, false);
        assert_scores(&scores, &[0.0]);
    }

    #[test]
    fn linear_chain_middle_node_has_betweenness() {
        // 0 -> 1 -> 2
        let bc = compute_betweenness(&graph(3, &[(0, 1), (1, 2)]), PathMetric::Hops, false);
        assert_scores(&bc, &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn chain_of_four_betweenness() {
        // 1 is on 0->2, 0->3; 2 is on 0->3, 1->3.
        let bc = compute_betweenness(
            &graph(4, &[(0, 1), (1, 2), (2, 3)]),
            PathMetric::Hops,
            false,
        );
        assert_scores(&bc, &[0.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn diamond_splits_paths_evenly() {
        // 0 -> {1, 2} -> 3: each middle vertex carries half of 0->3.
        let bc = compute_betweenness(
            &graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]),
            PathMetric::Hops,
            false,
        );
        assert_scores(&bc, &[0.0, 0.5, 0.5, 0.0]);
    }

    #[test]
    fn directed_cycle_is_symmetric() {
        // In a 4-cycle every vertex is interior to 3 ordered pairs' paths.
        let bc = compute_betweenness(
            &graph(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]),
            PathMetric::Hops,
            false,
        );
        assert_scores(&bc, &[3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn star_sink_has_zero_betweenness() {
        let bc = compute_betweenness(
            &graph(4, &[(0, 3), (1, 3), (2, 3)]),
            PathMetric::Hops,
            false,
        );
        assert_scores(&bc, &[0.0; 4]);
    }

    #[test]
    fn weighted_paths_avoid_expensive_shortcut() {
        // 0 -> 2 costs 10 directly, 3 via 1: vertex 1 carries 0->2.
        let g = RoadGraph::build(
            (0..3).map(|v| Vertex::bare(VertexId(v))),
            [
                Edge::new(0_u64, 1_u64).with_weight(1.0),
                Edge::new(1_u64, 2_u64).with_weight(2.0),
                Edge::new(0_u64, 2_u64).with_weight(10.0),
            ],
        )
        .expect("valid graph");

        let by_length = compute_betweenness(&g, PathMetric::Length, false);
        let by_hops = compute_betweenness(&g, PathMetric::Hops, false);
        assert_scores(&by_length, &[0.0, 1.0, 0.0]);
        assert_scores(&by_hops, &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn weighted_ties_split_like_hops() {
        let g = graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_scores(
            &compute_betweenness(&g, PathMetric::Length, false),
            &compute_betweenness(&g, PathMetric::Hops, false),
        );
    }

    #[test]
    fn parallel_matches_sequential_bitwise() {
        let edges: Vec<(u64, u64)> = (0..300)
            .flat_map(|v| [(v, (v + 1) % 300), (v, (v * 13 + 7) % 300)])
            .collect();
        let g = graph(300, &edges);
        assert_eq!(
            compute_betweenness(&g, PathMetric::Hops, false),
            compute_betweenness(&g, PathMetric::Hops, true)
        );
    }
}
