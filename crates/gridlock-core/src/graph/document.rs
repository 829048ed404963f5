//! JSON interchange format produced by the acquisition side.
//!
//! ```json
//! {
//!   "vertices": [{ "id": 1, "x": -46.63, "y": -23.55 }, { "id": 2 }],
//!   "edges": [{ "source": 1, "target": 2, "weight": 84.2, "junction": "roundabout" }]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{DocumentError, GraphError};
use crate::graph::{Coord, Edge, EdgeData, RoadGraph, Vertex, VertexId};

/// `junction` value that marks a closed-loop bypass segment.
pub const ROUNDABOUT: &str = "roundabout";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: VertexId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: VertexId,
    pub target: VertexId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junction: Option<String>,
}

/// Serialized road network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub vertices: Vec<VertexRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl From<&VertexRecord> for Vertex {
    fn from(record: &VertexRecord) -> Self {
        let coord = match (record.x, record.y) {
            (Some(x), Some(y)) => Some(Coord { x, y }),
            _ => None,
        };
        Self {
            id: record.id,
            coord,
        }
    }
}

impl From<&EdgeRecord> for Edge {
    fn from(record: &EdgeRecord) -> Self {
        Self {
            source: record.source,
            target: record.target,
            data: EdgeData {
                weight: record.weight.unwrap_or(1.0),
                loop_segment: record.junction.as_deref() == Some(ROUNDABOUT),
            },
        }
    }
}

impl GraphDocument {
    /// Validate the document and build the graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidGraph`] if an edge names an unknown vertex
    /// and [`GraphError::InvalidWeight`] for a negative or non-finite weight.
    pub fn into_graph(self) -> Result<RoadGraph, GraphError> {
        RoadGraph::build(
            self.vertices.iter().map(Vertex::from),
            self.edges.iter().map(Edge::from),
        )
    }

    /// Snapshot a graph back into document form.
    #[must_use]
    pub fn from_graph(graph: &RoadGraph) -> Self {
        let vertices = graph
            .vertices()
            .map(|v| VertexRecord {
                id: v.id,
                x: v.coord.map(|c| c.x),
                y: v.coord.map(|c| c.y),
            })
            .collect();
        let edges = graph
            .edges()
            .map(|e| EdgeRecord {
                source: e.source,
                target: e.target,
                weight: ((e.data.weight - 1.0).abs() > f64::EPSILON).then_some(e.data.weight),
                junction: e.data.loop_segment.then(|| ROUNDABOUT.to_string()),
            })
            .collect();
        Self { vertices, edges }
    }
}

/// Read a JSON graph document from `path` and build the graph.
///
/// # Errors
///
/// Returns [`DocumentError`] if the file cannot be read, is not a valid
/// document, or describes an invalid graph.
#[instrument]
pub fn load_graph(path: &Path) -> Result<RoadGraph, DocumentError> {
    let raw = fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document: GraphDocument =
        serde_json::from_str(&raw).map_err(|source| DocumentError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let graph = document.into_graph()?;
    debug!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "graph document loaded"
    );
    Ok(graph)
}
