//! Attack orders derived from centrality scores.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use gridlock_analysis::metrics::{CentralityMetric, CentralityTable};
use gridlock_core::graph::VertexId;

/// Vertices in removal order for one metric, highest score first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub metric: CentralityMetric,
    pub order: Vec<VertexId>,
}

impl Ranking {
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The first `k` vertices, clamped to the ranking length.
    #[must_use]
    pub fn top(&self, k: usize) -> &[VertexId] {
        &self.order[..k.min(self.order.len())]
    }
}

/// Order every vertex of `table` by `metric`, descending.
///
/// Ties are broken by ascending vertex id, so equal inputs always produce
/// the same ranking.
#[must_use]
pub fn build_ranking(table: &CentralityTable, metric: CentralityMetric) -> Ranking {
    let mut scored: Vec<(f64, VertexId)> = table
        .rows()
        .iter()
        .map(|row| (row.score(metric), row.vertex))
        .collect();
    scored.sort_by(|a, b| descending(a.0, b.0).then_with(|| a.1.cmp(&b.1)));
    Ranking {
        metric,
        order: scored.into_iter().map(|(_, v)| v).collect(),
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// One ranking per centrality metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rankings {
    pub degree: Ranking,
    pub closeness: Ranking,
    pub betweenness: Ranking,
}

impl Rankings {
    #[must_use]
    pub fn from_table(table: &CentralityTable) -> Self {
        Self {
            degree: build_ranking(table, CentralityMetric::Degree),
            closeness: build_ranking(table, CentralityMetric::Closeness),
            betweenness: build_ranking(table, CentralityMetric::Betweenness),
        }
    }

    #[must_use]
    pub const fn get(&self, metric: CentralityMetric) -> &Ranking {
        match metric {
            CentralityMetric::Degree => &self.degree,
            CentralityMetric::Closeness => &self.closeness,
            CentralityMetric::Betweenness => &self.betweenness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_analysis::metrics::{CentralityOptions, compute_centrality};
    use gridlock_core::graph::{Edge, RoadGraph, Vertex};

    fn graph(ids: &[u64], edges: &[(u64, u64)]) -> RoadGraph {
        RoadGraph::build(
            ids.iter().map(|&v| Vertex::bare(VertexId(v))),
            edges.iter().map(|&(a, b)| Edge::new(a, b)),
        )
        .expect("valid graph")
    }

    #[test]
    fn highest_score_comes_first() {
        // 5 -> 1 -> 9: vertex 1 has the only non-zero betweenness.
        let g = graph(&[1, 5, 9], &[(5, 1), (1, 9)]);
        let table = compute_centrality(&g, CentralityOptions::default());
        let ranking = build_ranking(&table, CentralityMetric::Betweenness);
        assert_eq!(ranking.order, vec![VertexId(1), VertexId(5), VertexId(9)]);
    }

    #[test]
    fn ties_fall_back_to_ascending_id() {
        // Directed 4-cycle: every vertex has identical scores.
        let g = graph(&[40, 10, 30, 20], &[(10, 20), (20, 30), (30, 40), (40, 10)]);
        let table = compute_centrality(&g, CentralityOptions::default());
        for metric in CentralityMetric::ALL {
            assert_eq!(
                build_ranking(&table, metric).order,
                vec![VertexId(10), VertexId(20), VertexId(30), VertexId(40)],
                "{metric}"
            );
        }
    }

    #[test]
    fn top_clamps_to_length() {
        let ranking = Ranking {
            metric: CentralityMetric::Degree,
            order: vec![VertexId(2), VertexId(1)],
        };
        assert_eq!(ranking.top(0), &[] as &[VertexId]);
        assert_eq!(ranking.top(1), &[VertexId(2)]);
        assert_eq!(ranking.top(5).len(), 2);
    }

    #[test]
    fn rankings_cover_every_metric() {
        let g = graph(&[1, 2, 3], &[(1, 2), (2, 3), (3, 1), (1, 3)]);
        let rankings = Rankings::from_table(&compute_centrality(&g, CentralityOptions::default()));
        for metric in CentralityMetric::ALL {
            assert_eq!(rankings.get(metric).metric, metric);
            assert_eq!(rankings.get(metric).len(), 3);
        }
    }
}
