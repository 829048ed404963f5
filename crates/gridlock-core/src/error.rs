use std::fmt;
use std::path::PathBuf;

use crate::graph::VertexId;

/// Machine-readable error codes for scripted callers and log scraping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ConfigInvalid,
    GraphDocumentUnreadable,
    InvalidGraph,
    EdgeNotFound,
    UnknownVertex,
    CacheCorrupt,
    CacheWriteFailed,
    LockContention,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ConfigInvalid => "E1002",
            Self::GraphDocumentUnreadable => "E2001",
            Self::InvalidGraph => "E2002",
            Self::EdgeNotFound => "E2003",
            Self::UnknownVertex => "E2004",
            Self::CacheCorrupt => "E3001",
            Self::CacheWriteFailed => "E5001",
            Self::LockContention => "E5002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ConfigInvalid => "Config value out of range",
            Self::GraphDocumentUnreadable => "Graph document unreadable",
            Self::InvalidGraph => "Invalid graph structure",
            Self::EdgeNotFound => "Edge not found",
            Self::UnknownVertex => "Vertex not found",
            Self::CacheCorrupt => "Cache entry corrupt",
            Self::CacheWriteFailed => "Cache write failed",
            Self::LockContention => "Lock contention",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the gridlock TOML config and retry."),
            Self::ConfigInvalid => {
                Some("Removal fractions must be 1..=100 and trial counts must be positive.")
            }
            Self::GraphDocumentUnreadable => {
                Some("Export the network again as a gridlock graph JSON document.")
            }
            Self::InvalidGraph => {
                Some("List every edge endpoint in `vertices`; weights must be finite and >= 0.")
            }
            Self::EdgeNotFound | Self::UnknownVertex => None,
            Self::CacheCorrupt => {
                Some("The entry is ignored and recomputed; delete the cache dir to reclaim space.")
            }
            Self::CacheWriteFailed => {
                Some("Check disk space and write permissions on the cache dir.")
            }
            Self::LockContention => {
                Some("Retry after the other gridlock process releases its lock.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Structural errors raised while building or querying a road graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An edge names an endpoint that is not in the vertex set.
    #[error("edge {source_id} -> {target_id} references unknown vertex {missing}")]
    InvalidGraph {
        source_id: VertexId,
        target_id: VertexId,
        missing: VertexId,
    },

    /// An edge weight is negative, infinite, or NaN.
    #[error("edge {source_id} -> {target_id} has invalid weight {weight}")]
    InvalidWeight {
        source_id: VertexId,
        target_id: VertexId,
        weight: String,
    },

    /// Lookup of an ordered pair that has no edge.
    #[error("no edge {source_id} -> {target_id}")]
    EdgeNotFound {
        source_id: VertexId,
        target_id: VertexId,
    },

    /// Lookup of a vertex id that is not in the graph.
    #[error("vertex {0} is not in the graph")]
    UnknownVertex(VertexId),
}

impl GraphError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidGraph { .. } | Self::InvalidWeight { .. } => ErrorCode::InvalidGraph,
            Self::EdgeNotFound { .. } => ErrorCode::EdgeNotFound,
            Self::UnknownVertex(_) => ErrorCode::UnknownVertex,
        }
    }
}

/// Errors raised while reading a graph document from disk.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read graph document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse graph document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl DocumentError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } | Self::Parse { .. } => ErrorCode::GraphDocumentUnreadable,
            Self::Graph(err) => err.code(),
        }
    }
}

/// Invalid configuration values or an unparsable config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { .. } => ErrorCode::ConfigParseError,
            Self::Invalid { .. } => ErrorCode::ConfigInvalid,
        }
    }
}

/// Errors raised by artifact stores.
///
/// [`CacheError::Corrupt`] never escapes [`crate::cache::memoize`]: a corrupt
/// entry is logged and treated as a miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache entry {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("cache io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode artifact {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Lock(#[from] crate::lock::LockError),
}

impl CacheError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Corrupt { .. } => ErrorCode::CacheCorrupt,
            Self::Io { .. } | Self::Encode { .. } => ErrorCode::CacheWriteFailed,
            Self::Lock(err) => err.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, GraphError};
    use crate::graph::VertexId;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::ConfigInvalid,
            ErrorCode::GraphDocumentUnreadable,
            ErrorCode::InvalidGraph,
            ErrorCode::EdgeNotFound,
            ErrorCode::UnknownVertex,
            ErrorCode::CacheCorrupt,
            ErrorCode::CacheWriteFailed,
            ErrorCode::LockContention,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::EdgeNotFound.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn graph_error_display_names_endpoints() {
        let err = GraphError::InvalidGraph {
            source_id: VertexId(1),
            target_id: VertexId(9),
            missing: VertexId(9),
        };
        let text = err.to_string();
        assert!(text.contains("1 -> 9"), "{text}");
        assert_eq!(err.code(), ErrorCode::InvalidGraph);
    }
}
