//! gridlock-sim library.
//!
//! Attack simulation over road graphs and the cached pipeline that drives
//! it:
//!
//! - [`ranking`]: deterministic attack orders from centrality scores.
//! - [`removal`]: ranked and uniform-random vertex removal.
//! - [`campaign`]: the per-level removal-and-measure loop.
//! - [`report`]: averaged summaries and CSV export.
//! - [`pipeline`]: every stage memoized against the result cache.
//!
//! # Conventions
//!
//! - **Errors**: `anyhow::Result` for everything that crosses stages.
//! - **Logging**: `tracing` macros only.

#![forbid(unsafe_code)]

pub mod campaign;
pub mod pipeline;
pub mod ranking;
pub mod removal;
pub mod report;
pub mod rng;

pub use campaign::{Campaign, LevelResult, SimulationResult};
pub use pipeline::{Pipeline, PreparedGraph};
pub use ranking::{Ranking, Rankings, build_ranking};
pub use report::SimulationSummary;
pub use rng::DeterministicRng;
