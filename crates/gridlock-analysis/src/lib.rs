#![forbid(unsafe_code)]
//! gridlock-analysis library.
//!
//! Graph algorithms over [`gridlock_core::graph::RoadGraph`]:
//!
//! - [`connectivity`]: strong components and their summary metrics, plus
//!   the separately named weak variant.
//! - [`metrics`]: degree, closeness, and betweenness centrality.
//! - [`dominators`]: Lengauer-Tarjan dominator trees and edge dominators.
//! - [`bridges`]: strong bridges of the largest strongly connected subgraph.
//! - [`stats`]: summary statistics.
//!
//! # Conventions
//!
//! - **Errors**: structural failures surface as
//!   [`gridlock_core::GraphError`]; nothing here recovers partially.
//! - **Logging**: Use `tracing` macros (`info!`, `debug!`, `trace!`).

pub mod bridges;
pub mod connectivity;
pub mod dominators;
pub mod metrics;
pub mod stats;

pub use bridges::{StrongBridgeDetector, StrongBridgeSet};
pub use connectivity::{ConnectivityMetrics, compute_metrics, compute_weak_metrics};
pub use metrics::{CentralityMetric, CentralityOptions, CentralityTable, compute_centrality};
pub use stats::GraphStats;
