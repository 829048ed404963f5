pub mod bridges;
pub mod centrality;
pub mod simulate;
pub mod stats;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use gridlock_core::config::AnalysisConfig;
use gridlock_core::graph::load_graph;
use gridlock_sim::{Pipeline, PreparedGraph};

/// Build the pipeline for `config` and load `graph_path` into it.
pub fn open(config: AnalysisConfig, graph_path: &Path) -> Result<(Pipeline, PreparedGraph)> {
    let graph = load_graph(graph_path)?;
    debug!(path = %graph_path.display(), "graph document loaded");
    let pipeline = Pipeline::from_config(config);
    let prepared = pipeline
        .prepare(graph)
        .with_context(|| format!("preparing {}", graph_path.display()))?;
    Ok((pipeline, prepared))
}
