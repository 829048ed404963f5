use std::collections::BTreeSet;

use petgraph::algo::dominators::simple_fast;
use proptest::prelude::*;

use gridlock_analysis::bridges::StrongBridgeDetector;
use gridlock_analysis::connectivity::{compute_metrics, compute_weak_metrics};
use gridlock_analysis::dominators::{compute_immediate_dominators, edge_dominators};
use gridlock_core::config::{BridgeConfig, BridgeMode};
use gridlock_core::graph::{Edge, RoadGraph, Vertex, VertexId};

fn arb_graph(max_vertices: u64) -> impl Strategy<Value = RoadGraph> {
    (1..=max_vertices).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..=(n as usize * 3)).prop_map(move |pairs| {
            RoadGraph::build(
                (0..n).map(|v| Vertex::bare(VertexId(v))),
                pairs.into_iter().map(|(a, b)| Edge::new(a, b)),
            )
            .expect("endpoints come from the vertex range")
        })
    })
}

fn without_edge(graph: &RoadGraph, pair: (VertexId, VertexId)) -> RoadGraph {
    RoadGraph::build(
        graph.vertices().cloned(),
        graph.edges().filter(|e| e.pair() != pair),
    )
    .expect("subset of a valid graph")
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn metric_invariants(graph in arb_graph(16)) {
        let n = graph.vertex_count();
        let m = compute_metrics(&graph);
        prop_assert!(m.component_count >= 1);
        prop_assert!(m.largest_component_size <= n);
        let all_pairs = (n * (n - 1) / 2) as u64;
        prop_assert!(m.disconnected_pair_count <= all_pairs);
        if m.component_count == n {
            prop_assert_eq!(m.disconnected_pair_count, all_pairs);
        }

        // Weak components are unions of strong ones.
        let weak = compute_weak_metrics(&graph);
        prop_assert!(weak.component_count <= m.component_count);
        prop_assert!(weak.disconnected_pair_count <= m.disconnected_pair_count);
    }

    #[test]
    fn dominators_match_petgraph(graph in arb_graph(14)) {
        let root = graph.vertex_ids()[0];
        let tree = compute_immediate_dominators(&graph, root).expect("root exists");
        let root_idx = graph.index_of(root).expect("root exists");
        let reference = simple_fast(graph.petgraph(), root_idx);

        for (i, &id) in graph.vertex_ids().iter().enumerate() {
            let expected = reference
                .immediate_dominator(petgraph::graph::NodeIndex::new(i))
                .map(|d| graph.id_of(d));
            prop_assert_eq!(tree.immediate_dominator(id), expected, "vertex {}", id);
        }
    }

    #[test]
    fn edge_dominators_are_idempotent(graph in arb_graph(12)) {
        let root = graph.vertex_ids()[0];
        let first = edge_dominators(&graph, root).expect("root exists");
        let second = edge_dominators(&graph, root).expect("root exists");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn strong_bridges_match_brute_force_removal(graph in arb_graph(10)) {
        let detector = StrongBridgeDetector::new(BridgeConfig {
            exclude_loop_edges: true,
            mode: BridgeMode::Exact,
        });
        let set = detector.detect(&graph).expect("detect");

        let Some(root) = set.root else {
            return Ok(());
        };
        let members: Vec<VertexId> =
            gridlock_analysis::connectivity::largest_strong_component(&graph);
        prop_assert_eq!(members.first().copied(), Some(root));
        let h = graph.induced_subgraph(&members).expect("members exist");
        let h_edges: BTreeSet<(VertexId, VertexId)> = h.edges().map(|e| e.pair()).collect();

        for bridge in &set.bridges {
            prop_assert!(h_edges.contains(bridge), "{:?} not in H", bridge);
        }
        for &pair in &h_edges {
            let components = compute_metrics(&without_edge(&h, pair)).component_count;
            if set.contains(pair.0, pair.1) {
                prop_assert!(components > 1, "{:?} reported but H stays connected", pair);
            } else {
                prop_assert_eq!(components, 1, "{:?} missed", pair);
            }
        }
    }

    #[test]
    fn literal_mode_is_a_superset_of_exact(graph in arb_graph(10)) {
        let exact = StrongBridgeDetector::new(BridgeConfig {
            exclude_loop_edges: true,
            mode: BridgeMode::Exact,
        })
        .detect(&graph)
        .expect("detect");
        let literal = StrongBridgeDetector::new(BridgeConfig {
            exclude_loop_edges: true,
            mode: BridgeMode::EdgeDominators,
        })
        .detect(&graph)
        .expect("detect");

        for (a, b) in &exact.bridges {
            prop_assert!(literal.contains(*a, *b));
        }
    }
}
