//! The immutable [`RoadGraph`] value and its derivations.

use std::collections::BTreeMap;

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use tracing::instrument;

use crate::error::GraphError;
use crate::graph::{Edge, EdgeData, Vertex, VertexId};

/// Stable identifier of an edge inside one [`RoadGraph`] value.
///
/// Ids are dense (`0..edge_count`) and are renumbered by every derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub usize);

/// A directed weighted road graph, immutable once built.
///
/// Nodes are stored in ascending [`VertexId`] order, so `NodeIndex(i)` is the
/// `i`-th vertex of the canonical order. At most one edge exists per ordered
/// pair of vertices.
#[derive(Debug, Clone, Default)]
pub struct RoadGraph {
    graph: DiGraph<Vertex, EdgeData>,
    /// `ids[i]` is the id of `NodeIndex(i)`; sorted ascending.
    ids: Vec<VertexId>,
}

impl RoadGraph {
    /// Build a graph from a vertex set and an edge collection.
    ///
    /// Duplicate vertex ids keep the first occurrence. Parallel edges between
    /// the same ordered pair collapse into one logical edge that keeps the
    /// minimum weight and the OR of the loop-segment flags.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidGraph`] if an edge references a vertex id
    /// that is not in `vertices`, and [`GraphError::InvalidWeight`] if an edge
    /// weight is negative or not finite.
    #[instrument(skip_all)]
    pub fn build(
        vertices: impl IntoIterator<Item = Vertex>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<Self, GraphError> {
        let mut by_id: BTreeMap<VertexId, Vertex> = BTreeMap::new();
        for vertex in vertices {
            by_id.entry(vertex.id).or_insert(vertex);
        }

        let mut merged: BTreeMap<(VertexId, VertexId), EdgeData> = BTreeMap::new();
        for edge in edges {
            for endpoint in [edge.source, edge.target] {
                if !by_id.contains_key(&endpoint) {
                    return Err(GraphError::InvalidGraph {
                        source_id: edge.source,
                        target_id: edge.target,
                        missing: endpoint,
                    });
                }
            }
            let weight = edge.data.weight;
            if !weight.is_finite() || weight < 0.0 {
                return Err(GraphError::InvalidWeight {
                    source_id: edge.source,
                    target_id: edge.target,
                    weight: weight.to_string(),
                });
            }
            merged
                .entry(edge.pair())
                .and_modify(|data| {
                    data.weight = data.weight.min(edge.data.weight);
                    data.loop_segment |= edge.data.loop_segment;
                })
                .or_insert(edge.data);
        }

        let mut graph = DiGraph::with_capacity(by_id.len(), merged.len());
        let ids: Vec<VertexId> = by_id.keys().copied().collect();
        for vertex in by_id.into_values() {
            graph.add_node(vertex);
        }

        for ((source, target), data) in merged {
            // Both endpoints were validated above.
            let (Ok(a), Ok(b)) = (ids.binary_search(&source), ids.binary_search(&target)) else {
                continue;
            };
            graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), data);
        }

        Ok(Self { graph, ids })
    }

    /// Return the number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// True when the graph has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The underlying petgraph storage, for algorithms that walk indices.
    #[must_use]
    pub const fn petgraph(&self) -> &DiGraph<Vertex, EdgeData> {
        &self.graph
    }

    /// Vertex ids in canonical (ascending) order.
    #[must_use]
    pub fn vertex_ids(&self) -> &[VertexId] {
        &self.ids
    }

    /// Iterate over vertices in canonical order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.graph.node_weights()
    }

    /// Iterate over edges in storage order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_references().map(|e| Edge {
            source: self.ids[e.source().index()],
            target: self.ids[e.target().index()],
            data: *e.weight(),
        })
    }

    /// True when `id` is a vertex of this graph.
    #[must_use]
    pub fn contains(&self, id: VertexId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Look up the `NodeIndex` for a vertex id.
    #[must_use]
    pub fn index_of(&self, id: VertexId) -> Option<NodeIndex> {
        self.ids.binary_search(&id).ok().map(NodeIndex::new)
    }

    /// Return the vertex id stored at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds for this graph.
    #[must_use]
    pub fn id_of(&self, idx: NodeIndex) -> VertexId {
        self.ids[idx.index()]
    }

    fn require(&self, id: VertexId) -> Result<NodeIndex, GraphError> {
        self.index_of(id).ok_or(GraphError::UnknownVertex(id))
    }

    /// Total number of incident edges (in + out) of `v`.
    ///
    /// A self-loop counts twice, once per endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownVertex`] if `v` is not in the graph.
    pub fn degree(&self, v: VertexId) -> Result<usize, GraphError> {
        let idx = self.require(v)?;
        Ok(self.degree_at(idx))
    }

    /// Total degree by node index.
    #[must_use]
    pub fn degree_at(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
            + self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Out-neighbours (successors) of `v`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownVertex`] if `v` is not in the graph.
    pub fn neighbors(&self, v: VertexId) -> Result<Vec<VertexId>, GraphError> {
        let idx = self.require(v)?;
        let mut out: Vec<VertexId> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.ids[n.index()])
            .collect();
        out.sort_unstable();
        Ok(out)
    }

    /// Id of the edge `u -> v`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EdgeNotFound`] if either endpoint is missing or
    /// there is no such edge.
    pub fn edge_index(&self, u: VertexId, v: VertexId) -> Result<EdgeId, GraphError> {
        let not_found = GraphError::EdgeNotFound {
            source_id: u,
            target_id: v,
        };
        let (Some(a), Some(b)) = (self.index_of(u), self.index_of(v)) else {
            return Err(not_found);
        };
        self.graph
            .find_edge(a, b)
            .map(|e| EdgeId(e.index()))
            .ok_or(not_found)
    }

    /// Data stored on the edge `u -> v`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`RoadGraph::edge_index`].
    pub fn edge_data(&self, u: VertexId, v: VertexId) -> Result<EdgeData, GraphError> {
        let id = self.edge_index(u, v)?;
        self.graph
            .edge_weight(petgraph::graph::EdgeIndex::new(id.0))
            .copied()
            .ok_or(GraphError::EdgeNotFound {
                source_id: u,
                target_id: v,
            })
    }

    /// New graph with every edge flipped. Vertex order is unchanged.
    #[must_use]
    pub fn reverse(&self) -> Self {
        let mut graph = self.graph.clone();
        graph.reverse();
        Self {
            graph,
            ids: self.ids.clone(),
        }
    }

    /// New graph without the given vertices and their incident edges.
    ///
    /// Runs in O(V + E). An empty `removed` slice yields an identical copy.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownVertex`] for the first id not in the graph.
    pub fn delete_vertices(&self, removed: &[VertexId]) -> Result<Self, GraphError> {
        let mut drop = vec![false; self.vertex_count()];
        for &id in removed {
            drop[self.require(id)?.index()] = true;
        }
        Ok(self.retain_mask(|i| !drop[i]))
    }

    /// Like [`RoadGraph::delete_vertices`], addressed by node index.
    ///
    /// Indices outside the graph are ignored.
    #[must_use]
    pub fn delete_indices(&self, removed: &[NodeIndex]) -> Self {
        let mut drop = vec![false; self.vertex_count()];
        for idx in removed {
            if let Some(slot) = drop.get_mut(idx.index()) {
                *slot = true;
            }
        }
        self.retain_mask(|i| !drop[i])
    }

    /// New graph restricted to `keep` and the edges with both endpoints in it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownVertex`] for the first id not in the graph.
    pub fn induced_subgraph(&self, keep: &[VertexId]) -> Result<Self, GraphError> {
        let mut mask = vec![false; self.vertex_count()];
        for &id in keep {
            mask[self.require(id)?.index()] = true;
        }
        Ok(self.retain_mask(|i| mask[i]))
    }

    /// Induced subgraph over the vertices matching `predicate`.
    #[must_use]
    pub fn retain_vertices(&self, predicate: impl Fn(&Vertex) -> bool) -> Self {
        let mask: Vec<bool> = self.graph.node_weights().map(&predicate).collect();
        self.retain_mask(|i| mask[i])
    }

    fn retain_mask(&self, keep: impl Fn(usize) -> bool) -> Self {
        let graph = self.graph.filter_map(
            |idx, vertex| keep(idx.index()).then(|| vertex.clone()),
            |_, data| Some(*data),
        );
        let ids = graph.node_weights().map(|v| v.id).collect();
        Self { graph, ids }
    }

    /// BLAKE3 fingerprint of the vertex and edge sets, `blake3:<hex>`.
    ///
    /// Independent of storage order; any change to a vertex id, an edge
    /// endpoint, a weight, or a loop-segment flag changes the fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut edges: Vec<Edge> = self.edges().collect();
        edges.sort_by_key(Edge::pair);

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"vertices\x00");
        for id in &self.ids {
            hasher.update(&id.0.to_le_bytes());
        }
        hasher.update(b"edges\x00");
        for edge in &edges {
            hasher.update(&edge.source.0.to_le_bytes());
            hasher.update(&edge.target.0.to_le_bytes());
            hasher.update(&edge.data.weight.to_bits().to_le_bytes());
            hasher.update(&[u8::from(edge.data.loop_segment)]);
        }
        format!("blake3:{}", hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
