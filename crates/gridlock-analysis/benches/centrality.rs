use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use gridlock_analysis::bridges::StrongBridgeDetector;
use gridlock_analysis::metrics::betweenness::compute_betweenness;
use gridlock_core::config::PathMetric;
use gridlock_core::graph::{Edge, RoadGraph, Vertex, VertexId};

/// Square street grid; every third row is one-way eastbound.
fn street_grid(side: u64) -> RoadGraph {
    let id = |r: u64, c: u64| r * side + c;
    let mut edges = Vec::new();
    for r in 0..side {
        for c in 0..side {
            if c + 1 < side {
                edges.push(Edge::new(id(r, c), id(r, c + 1)).with_weight(80.0));
                if r % 3 != 0 {
                    edges.push(Edge::new(id(r, c + 1), id(r, c)).with_weight(80.0));
                }
            }
            if r + 1 < side {
                edges.push(Edge::new(id(r, c), id(r + 1, c)).with_weight(120.0));
                edges.push(Edge::new(id(r + 1, c), id(r, c)).with_weight(120.0));
            }
        }
    }
    RoadGraph::build((0..side * side).map(|v| Vertex::bare(VertexId(v))), edges)
        .expect("grid endpoints are in range")
}

fn bench_centrality(c: &mut Criterion) {
    let mut group = c.benchmark_group("centrality.grid");
    group.sample_size(10);

    for side in [20_u64, 40] {
        let graph = street_grid(side);
        group.throughput(Throughput::Elements(graph.vertex_count() as u64));

        group.bench_with_input(BenchmarkId::new("betweenness.hops", side), &graph, |b, g| {
            b.iter(|| black_box(compute_betweenness(g, PathMetric::Hops, true)));
        });
        group.bench_with_input(BenchmarkId::new("betweenness.length", side), &graph, |b, g| {
            b.iter(|| black_box(compute_betweenness(g, PathMetric::Length, true)));
        });
        group.bench_with_input(BenchmarkId::new("strong_bridges", side), &graph, |b, g| {
            let detector = StrongBridgeDetector::default();
            b.iter(|| black_box(detector.detect(g)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_centrality);
criterion_main!(benches);
