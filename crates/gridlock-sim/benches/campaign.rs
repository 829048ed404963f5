use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use gridlock_analysis::metrics::{CentralityOptions, compute_centrality};
use gridlock_core::config::SimulationConfig;
use gridlock_core::graph::{Edge, RoadGraph, Vertex, VertexId};
use gridlock_sim::{Campaign, Rankings};

fn street_grid(side: u64) -> RoadGraph {
    let id = |r: u64, c: u64| r * side + c;
    let mut edges = Vec::new();
    for r in 0..side {
        for c in 0..side {
            if c + 1 < side {
                edges.push(Edge::new(id(r, c), id(r, c + 1)));
                edges.push(Edge::new(id(r, c + 1), id(r, c)));
            }
            if r + 1 < side {
                edges.push(Edge::new(id(r, c), id(r + 1, c)));
                if c % 2 == 0 {
                    edges.push(Edge::new(id(r + 1, c), id(r, c)));
                }
            }
        }
    }
    RoadGraph::build((0..side * side).map(|v| Vertex::bare(VertexId(v))), edges)
        .expect("grid endpoints are in range")
}

fn bench_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("campaign.level");
    group.sample_size(10);

    for side in [20_u64, 40] {
        let graph = street_grid(side);
        let table = compute_centrality(&graph, CentralityOptions::default());
        let rankings = Rankings::from_table(&table);
        let config = SimulationConfig {
            fractions: vec![10],
            trial_counts: vec![10, 20],
            ..SimulationConfig::default()
        };
        let campaign = Campaign::new(&graph, &rankings, &config);
        let k = graph.vertex_count() / 10;

        group.bench_with_input(BenchmarkId::new("k=10%", side), &k, |b, &k| {
            b.iter(|| black_box(campaign.run_level(k, &[10])));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_levels);
criterion_main!(benches);
