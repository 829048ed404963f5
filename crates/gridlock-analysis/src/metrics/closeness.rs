//! Closeness centrality over the reachable set.
//!
//! For a vertex `v` reaching `r > 0` other vertices with total shortest-path
//! distance `d`, closeness is `r / d` (the inverse of the mean distance).
//! Unreachable vertices are left out of the mean, so disconnected graphs are
//! fine. A vertex that reaches nothing scores `0.0`.

use std::collections::{BinaryHeap, VecDeque};

use rayon::prelude::*;

use gridlock_core::config::{ClosenessMode, PathMetric};
use gridlock_core::graph::RoadGraph;

use crate::metrics::{Adjacency, HeapEntry};

/// Closeness per node index.
#[must_use]
pub fn compute_closeness(
    graph: &RoadGraph,
    metric: PathMetric,
    mode: ClosenessMode,
    parallel: bool,
) -> Vec<f64> {
    let adjacency = match mode {
        ClosenessMode::Undirected => Adjacency::undirected(graph, metric),
        ClosenessMode::Outgoing => Adjacency::outgoing(graph, metric),
    };
    let n = adjacency.len();

    if parallel {
        (0..n)
            .into_par_iter()
            .map_init(
                || Scratch::new(n),
                |scratch, s| closeness_from(&adjacency, metric, s, scratch),
            )
            .collect()
    } else {
        let mut scratch = Scratch::new(n);
        (0..n)
            .map(|s| closeness_from(&adjacency, metric, s, &mut scratch))
            .collect()
    }
}

struct Scratch {
    dist: Vec<f64>,
    touched: Vec<usize>,
    queue: VecDeque<usize>,
    heap: BinaryHeap<HeapEntry>,
}

impl Scratch {
    fn new(n: usize) -> Self {
        Self {
            dist: vec![f64::INFINITY; n],
            touched: Vec::new(),
            queue: VecDeque::new(),
            heap: BinaryHeap::new(),
        }
    }

    fn reset(&mut self) {
        for &v in &self.touched {
            self.dist[v] = f64::INFINITY;
        }
        self.touched.clear();
        self.queue.clear();
        self.heap.clear();
    }
}

#[allow(clippy::cast_precision_loss)]
fn closeness_from(
    adjacency: &Adjacency,
    metric: PathMetric,
    s: usize,
    scratch: &mut Scratch,
) -> f64 {
    scratch.dist[s] = 0.0;
    scratch.touched.push(s);

    match metric {
        PathMetric::Hops => {
            scratch.queue.push_back(s);
            while let Some(v) = scratch.queue.pop_front() {
                let next = scratch.dist[v] + 1.0;
                for &(w, _) in adjacency.neighbors(v) {
                    if scratch.dist[w].is_infinite() {
                        scratch.dist[w] = next;
                        scratch.touched.push(w);
                        scratch.queue.push_back(w);
                    }
                }
            }
        }
        PathMetric::Length => {
            scratch.heap.push(HeapEntry { dist: 0.0, node: s });
            while let Some(HeapEntry { dist, node: v }) = scratch.heap.pop() {
                if dist > scratch.dist[v] {
                    continue;
                }
                for &(w, cost) in adjacency.neighbors(v) {
                    let candidate = dist + cost;
                    if candidate < scratch.dist[w] {
                        if scratch.dist[w].is_infinite() {
                            scratch.touched.push(w);
                        }
                        scratch.dist[w] = candidate;
                        scratch.heap.push(HeapEntry {
                            dist: candidate,
                            node: w,
                        });
                    }
                }
            }
        }
    }

    let reached = scratch.touched.len() - 1;
    let total: f64 = scratch.touched.iter().map(|&v| scratch.dist[v]).sum();
    scratch.reset();

    if reached == 0 || total <= 0.0 {
        0.0
    } else {
        reached as f64 / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_core::graph::{Edge, Vertex, VertexId};

    fn graph(n: u64, edges: &[(u64, u64, f64)]) -> RoadGraph {
        RoadGraph::build(
            (0..n).map(|v| Vertex::bare(VertexId(v))),
            edges
                .iter()
                .map(|&(a, b, w)| Edge::new(a, b).with_weight(w)),
        )
        .expect("valid graph")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn path_closeness_undirected() {
        // 0 -> 1 -> 2 treated as an undirected path.
        let g = graph(3, &[(0, 1, 1.0), (1, 2, 1.0)]);
        let c = compute_closeness(&g, PathMetric::Hops, ClosenessMode::Undirected, false);
        assert!(close(c[0], 2.0 / 3.0), "{c:?}");
        assert!(close(c[1], 1.0), "{c:?}");
        assert!(close(c[2], 2.0 / 3.0), "{c:?}");
    }

    #[test]
    fn path_closeness_outgoing_uses_reachable_set_only() {
        let g = graph(3, &[(0, 1, 1.0), (1, 2, 1.0)]);
        let c = compute_closeness(&g, PathMetric::Hops, ClosenessMode::Outgoing, false);
        assert!(close(c[0], 2.0 / 3.0), "{c:?}");
        assert!(close(c[1], 1.0), "{c:?}");
        assert!(close(c[2], 0.0), "sink reaches nothing: {c:?}");
    }

    #[test]
    fn isolated_vertex_scores_zero() {
        let g = graph(3, &[(0, 1, 1.0)]);
        let c = compute_closeness(&g, PathMetric::Hops, ClosenessMode::Undirected, false);
        assert!(close(c[2], 0.0));
        assert!(close(c[0], 1.0));
    }

    #[test]
    fn length_metric_follows_cheapest_route() {
        // 0 -> 2 directly costs 10, via 1 costs 3.
        let g = graph(3, &[(0, 1, 1.0), (1, 2, 2.0), (0, 2, 10.0)]);
        let c = compute_closeness(&g, PathMetric::Length, ClosenessMode::Outgoing, false);
        // distances from 0: 1 and 3.
        assert!(close(c[0], 2.0 / 4.0), "{c:?}");
    }

    #[test]
    fn parallel_matches_sequential() {
        let edges: Vec<(u64, u64, f64)> = (0..120)
            .map(|v| (v, (v * 11 + 5) % 120, 1.0 + (v % 7) as f64))
            .collect();
        let g = graph(120, &edges);
        for metric in [PathMetric::Hops, PathMetric::Length] {
            let seq = compute_closeness(&g, metric, ClosenessMode::Undirected, false);
            let par = compute_closeness(&g, metric, ClosenessMode::Undirected, true);
            assert_eq!(seq, par);
        }
    }
}
