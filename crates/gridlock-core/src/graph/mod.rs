//! Directed weighted road graph.
//!
//! # Overview
//!
//! [`RoadGraph`] is the immutable value every analysis stage consumes. It
//! wraps a petgraph [`DiGraph`](petgraph::graph::DiGraph) whose node order is
//! the canonical vertex order (ascending [`VertexId`]). Derived graphs
//! ([`RoadGraph::reverse`], [`RoadGraph::delete_vertices`],
//! [`RoadGraph::induced_subgraph`]) are new values built with
//! `filter_map`, so the canonical order survives every derivation and no two
//! trials ever share mutable state.
//!
//! ## Pipeline
//!
//! ```text
//! acquisition collaborator (JSON)
//!        ↓  document::GraphDocument::into_graph()
//! RoadGraph (validated, one edge per ordered pair)
//!        ↓  RoadGraph::fingerprint()
//! graph version (BLAKE3) scoping every cache key
//! ```

pub mod document;
pub mod model;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use document::{GraphDocument, load_graph};
pub use model::{EdgeId, RoadGraph};

/// Opaque, stable vertex identifier (an OSM node id in practice).
///
/// Ordering on `VertexId` is the canonical vertex order used to break ranking
/// ties and to pick deterministic roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for VertexId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Planar coordinates (longitude, latitude) carried for visualization and
/// study-area filtering only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

/// A vertex of the road graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    #[serde(default)]
    pub coord: Option<Coord>,
}

impl Vertex {
    /// Vertex without coordinates.
    #[must_use]
    pub const fn bare(id: VertexId) -> Self {
        Self { id, coord: None }
    }
}

/// Payload stored on each petgraph edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Traversal cost (segment length in metres for OSM input); 1.0 by default.
    pub weight: f64,
    /// Edge belongs to a closed-loop bypass such as a one-way roundabout.
    pub loop_segment: bool,
}

impl Default for EdgeData {
    fn default() -> Self {
        Self {
            weight: 1.0,
            loop_segment: false,
        }
    }
}

/// A directed edge between two vertex ids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    #[serde(flatten)]
    pub data: EdgeData,
}

impl Edge {
    /// Unit-weight edge without the loop-segment flag.
    #[must_use]
    pub fn new(source: impl Into<VertexId>, target: impl Into<VertexId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            data: EdgeData::default(),
        }
    }

    /// Set the edge weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.data.weight = weight;
        self
    }

    /// Mark the edge as part of a closed-loop bypass.
    #[must_use]
    pub const fn loop_segment(mut self) -> Self {
        self.data.loop_segment = true;
        self
    }

    /// The `(source, target)` pair.
    #[must_use]
    pub const fn pair(&self) -> (VertexId, VertexId) {
        (self.source, self.target)
    }
}
