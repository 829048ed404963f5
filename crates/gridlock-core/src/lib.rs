//! gridlock-core library.
//!
//! The road graph model shared by every gridlock crate, together with the
//! ambient pieces around it: error codes, TOML configuration, advisory
//! locks, and the content-addressed result cache.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums at module seams, `anyhow::Result`
//!   where a call crosses several of them.
//! - **Logging**: `tracing` macros only; no direct terminal output.

#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod lock;

pub use config::AnalysisConfig;
pub use error::{ErrorCode, GraphError};
pub use graph::{Edge, RoadGraph, Vertex, VertexId};
