//! Cached analysis pipeline.
//!
//! ```text
//! graph ──> centrality ──> ranking/{metric} ──> simulation/.../level-{k}
//!   └─────> bridges
//! ```
//!
//! Every stage runs through [`memoize`] with a key scoped to the fingerprint
//! of the analyzed graph. Stage names also carry the options that change the
//! stage's output, so a config change is a miss rather than stale data.
//! Simulation levels are persisted one at a time as each level completes,
//! which lets an interrupted run resume at the first missing level.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, instrument};

use gridlock_analysis::bridges::{StrongBridgeDetector, StrongBridgeSet};
use gridlock_analysis::metrics::{
    CentralityMetric, CentralityOptions, CentralityTable, compute_centrality,
};
use gridlock_analysis::stats::GraphStats;
use gridlock_core::cache::{ArtifactStore, CacheKey, DirStore, Memoized, NullStore, memoize};
use gridlock_core::config::{
    AnalysisConfig, BridgeConfig, BridgeMode, CentralityConfig, ClosenessMode, PathMetric,
};
use gridlock_core::graph::{GraphDocument, RoadGraph};

use crate::campaign::{Campaign, SimulationResult};
use crate::ranking::{Ranking, Rankings, build_ranking};

/// A graph ready for analysis, with its cache scope.
#[derive(Debug, Clone)]
pub struct PreparedGraph {
    pub graph: RoadGraph,
    /// Fingerprint of `graph`; the version part of every cache key.
    pub version: String,
}

impl PreparedGraph {
    fn key(&self, stage: impl Into<String>) -> CacheKey {
        CacheKey::new(self.version.clone(), stage)
    }
}

/// Runs analysis stages with configuration and a cache injected at
/// construction.
pub struct Pipeline {
    config: AnalysisConfig,
    store: Box<dyn ArtifactStore>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(config: AnalysisConfig, store: Box<dyn ArtifactStore>) -> Self {
        Self { config, store }
    }

    /// Pipeline backed by the store named in `config.cache`: a [`DirStore`]
    /// when caching is enabled, otherwise a [`NullStore`].
    #[must_use]
    pub fn from_config(config: AnalysisConfig) -> Self {
        let store: Box<dyn ArtifactStore> = if config.cache.enabled {
            Box::new(DirStore::new(
                config.cache.dir.clone(),
                Duration::from_millis(config.cache.lock_timeout_ms),
            ))
        } else {
            Box::new(NullStore)
        };
        Self::new(config, store)
    }

    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Apply the study area, fingerprint the result, and persist a snapshot.
    ///
    /// With a study area configured, vertices outside the polygon and
    /// vertices without coordinates are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot lookup fails for a reason other than
    /// corruption.
    #[instrument(skip_all, fields(vertices = graph.vertex_count(), edges = graph.edge_count()))]
    pub fn prepare(&self, graph: RoadGraph) -> Result<PreparedGraph> {
        let graph = match &self.config.study_area {
            Some(area) => {
                let inside =
                    graph.retain_vertices(|v| v.coord.is_some_and(|c| area.contains(c)));
                debug!(
                    kept = inside.vertex_count(),
                    dropped = graph.vertex_count() - inside.vertex_count(),
                    "restricted to study area"
                );
                inside
            }
            None => graph,
        };

        let prepared = PreparedGraph {
            version: graph.fingerprint(),
            graph,
        };
        let snapshot = memoize(self.store.as_ref(), &prepared.key("graph"), || {
            Ok(GraphDocument::from_graph(&prepared.graph))
        })?;
        log_stage("graph", &snapshot);
        info!(
            version = %prepared.version,
            vertices = prepared.graph.vertex_count(),
            edges = prepared.graph.edge_count(),
            "graph prepared"
        );
        Ok(prepared)
    }

    /// Structural summary of the prepared graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lookup fails for a reason other than
    /// corruption.
    pub fn stats(&self, prepared: &PreparedGraph) -> Result<GraphStats> {
        let stats = memoize(self.store.as_ref(), &prepared.key("stats"), || {
            Ok(GraphStats::from_graph(&prepared.graph))
        })?;
        log_stage("stats", &stats);
        Ok(stats.value)
    }

    /// Degree, closeness, and betweenness for every vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lookup fails for a reason other than
    /// corruption.
    pub fn centrality(&self, prepared: &PreparedGraph) -> Result<CentralityTable> {
        let options = CentralityOptions::from_config(
            &self.config.centrality,
            self.config.simulation.parallel,
        );
        let stage = format!("centrality/{}", centrality_tag(&self.config.centrality));
        let table = memoize(self.store.as_ref(), &prepared.key(stage), || {
            Ok(compute_centrality(&prepared.graph, options))
        })?;
        log_stage("centrality", &table);
        Ok(table.value)
    }

    /// One ranking per metric, derived from `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if a cache lookup fails for a reason other than
    /// corruption.
    pub fn rankings(&self, prepared: &PreparedGraph, table: &CentralityTable) -> Result<Rankings> {
        let tag = centrality_tag(&self.config.centrality);
        let ranking = |metric: CentralityMetric| -> Result<Ranking> {
            let key = prepared.key(format!("ranking/{metric}/{tag}"));
            let ranking = memoize(self.store.as_ref(), &key, || Ok(build_ranking(table, metric)))?;
            log_stage("ranking", &ranking);
            Ok(ranking.value)
        };
        Ok(Rankings {
            degree: ranking(CentralityMetric::Degree)?,
            closeness: ranking(CentralityMetric::Closeness)?,
            betweenness: ranking(CentralityMetric::Betweenness)?,
        })
    }

    /// Run the attack campaign, computing centrality and rankings first.
    ///
    /// Each level is persisted as soon as it completes. On a rerun, levels
    /// already in the cache are loaded instead of recomputed.
    ///
    /// # Errors
    ///
    /// Returns the first stage or level failure. Levels persisted before the
    /// failure stay valid.
    pub fn simulate(&self, prepared: &PreparedGraph) -> Result<SimulationResult> {
        let started = Instant::now();
        let table = self.centrality(prepared).context("centrality stage")?;
        let rankings = self.rankings(prepared, &table).context("ranking stage")?;

        let sim = &self.config.simulation;
        let scope = simulation_scope(&self.config)?;
        let campaign = Campaign::new(&prepared.graph, &rankings, sim);

        let mut hits = 0_usize;
        let result = campaign.run_with(|k, fractions| {
            let key = prepared.key(format!("simulation/{scope}/level-{k}"));
            let mut level = memoize(self.store.as_ref(), &key, || {
                campaign.run_level(k, fractions)
            })?;
            if level.is_hit() {
                hits += 1;
            }
            level.value.fractions = fractions.to_vec();
            Ok(level.value)
        })?;

        info!(
            levels = result.levels.len(),
            cached_levels = hits,
            elapsed_ms = started.elapsed().as_millis(),
            "simulation stage complete"
        );
        Ok(result)
    }

    /// Strong bridges of the largest strongly connected subgraph.
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails or the cache lookup fails for a
    /// reason other than corruption.
    pub fn bridges(&self, prepared: &PreparedGraph) -> Result<StrongBridgeSet> {
        let config = self.config.bridges;
        let stage = format!("bridges/{}", bridge_tag(config));
        let set = memoize(self.store.as_ref(), &prepared.key(stage), || {
            StrongBridgeDetector::new(config)
                .detect(&prepared.graph)
                .map_err(anyhow::Error::from)
        })?;
        log_stage("bridges", &set);
        Ok(set.value)
    }
}

fn log_stage<T>(stage: &str, memoized: &Memoized<T>) {
    debug!(stage, source = ?memoized.source, "stage resolved");
}

const fn centrality_tag(config: &CentralityConfig) -> &'static str {
    match (config.path_metric, config.closeness_mode) {
        (PathMetric::Hops, ClosenessMode::Undirected) => "hops-undirected",
        (PathMetric::Hops, ClosenessMode::Outgoing) => "hops-outgoing",
        (PathMetric::Length, ClosenessMode::Undirected) => "length-undirected",
        (PathMetric::Length, ClosenessMode::Outgoing) => "length-outgoing",
    }
}

const fn bridge_tag(config: BridgeConfig) -> &'static str {
    match (config.mode, config.exclude_loop_edges) {
        (BridgeMode::Exact, true) => "exact-no-loops",
        (BridgeMode::Exact, false) => "exact",
        (BridgeMode::EdgeDominators, true) => "edge-dominators-no-loops",
        (BridgeMode::EdgeDominators, false) => "edge-dominators",
    }
}

/// Short hash of every setting that changes a level's measurements.
fn simulation_scope(config: &AnalysisConfig) -> Result<String> {
    #[derive(Serialize)]
    struct Scope<'a> {
        seed: u64,
        trial_counts: &'a [usize],
        centrality: CentralityConfig,
    }

    let bytes = serde_json::to_vec(&Scope {
        seed: config.simulation.seed,
        trial_counts: &config.simulation.trial_counts,
        centrality: config.centrality,
    })
    .context("encode simulation scope")?;
    let hex = blake3::hash(&bytes).to_hex();
    Ok(hex.as_str()[..16].to_string())
}
