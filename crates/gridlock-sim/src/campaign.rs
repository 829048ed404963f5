//! The removal-and-measure loop.
//!
//! For each configured removal percentage `p` the campaign derives a level
//! `k = floor(N * p / 100)` and measures strong connectivity after:
//!
//! - removing the top `k` vertices of each centrality ranking, and
//! - `r` independent uniform random removals of `k` vertices, for every
//!   configured trial count `r`.
//!
//! Every trial starts from the unmodified baseline graph; levels are never
//! cumulative. Percentages that map to the same `k` share one level.
//!
//! A level is complete only when all of its trials have returned. Callers
//! that persist results (see [`Campaign::run_with`]) therefore only ever
//! see whole levels.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use gridlock_analysis::connectivity::{ConnectivityMetrics, compute_metrics, compute_weak_metrics};
use gridlock_analysis::metrics::CentralityMetric;
use gridlock_core::config::SimulationConfig;
use gridlock_core::graph::RoadGraph;

use crate::ranking::Rankings;
use crate::removal::{remove_by_ranking, remove_random};
use crate::rng::DeterministicRng;

/// Strong and weak connectivity after one ranked attack.
type AttackOutcome = (ConnectivityMetrics, ConnectivityMetrics);

/// Weak-connectivity view of the ranked attacks at one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakLevel {
    pub degree: ConnectivityMetrics,
    pub closeness: ConnectivityMetrics,
    pub betweenness: ConnectivityMetrics,
}

/// Everything measured at one removal level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelResult {
    /// Number of removed vertices.
    pub k: usize,
    /// Configured percentages that map to this `k`.
    pub fractions: Vec<u32>,
    pub degree: ConnectivityMetrics,
    pub closeness: ConnectivityMetrics,
    pub betweenness: ConnectivityMetrics,
    /// Random series keyed by trial count `r`; one entry per trial, in
    /// trial order.
    pub random: BTreeMap<usize, Vec<ConnectivityMetrics>>,
    pub weak: WeakLevel,
}

impl LevelResult {
    /// Metrics of the ranked attack for `metric`.
    #[must_use]
    pub const fn ranked(&self, metric: CentralityMetric) -> ConnectivityMetrics {
        match metric {
            CentralityMetric::Degree => self.degree,
            CentralityMetric::Closeness => self.closeness,
            CentralityMetric::Betweenness => self.betweenness,
        }
    }
}

/// Output of a full campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub vertex_count: usize,
    /// Strong connectivity of the unmodified graph (k = 0).
    pub baseline: ConnectivityMetrics,
    pub weak_baseline: ConnectivityMetrics,
    pub levels: BTreeMap<usize, LevelResult>,
}

/// Map removal percentages to levels for an `n`-vertex graph.
///
/// Percentages that floor to the same `k` are grouped under that `k`.
#[must_use]
pub fn removal_levels(n: usize, fractions: &[u32]) -> BTreeMap<usize, Vec<u32>> {
    let mut levels: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
    for &p in fractions {
        let k = n * p as usize / 100;
        let entry = levels.entry(k).or_default();
        if !entry.contains(&p) {
            entry.push(p);
        }
    }
    for fractions in levels.values_mut() {
        fractions.sort_unstable();
    }
    levels
}

/// One attack campaign over a fixed baseline graph.
#[derive(Debug, Clone, Copy)]
pub struct Campaign<'a> {
    graph: &'a RoadGraph,
    rankings: &'a Rankings,
    config: &'a SimulationConfig,
}

impl<'a> Campaign<'a> {
    #[must_use]
    pub const fn new(
        graph: &'a RoadGraph,
        rankings: &'a Rankings,
        config: &'a SimulationConfig,
    ) -> Self {
        Self {
            graph,
            rankings,
            config,
        }
    }

    /// Levels this campaign will visit, keyed by `k`.
    #[must_use]
    pub fn levels(&self) -> BTreeMap<usize, Vec<u32>> {
        removal_levels(self.graph.vertex_count(), &self.config.fractions)
    }

    /// Run every level directly.
    ///
    /// # Errors
    ///
    /// Returns an error if a ranking names a vertex outside the graph.
    pub fn run(&self) -> Result<SimulationResult> {
        self.run_with(|k, fractions| self.run_level(k, fractions))
    }

    /// Run every level through `level`, which is handed `(k, fractions)` and
    /// must return that level's result. Levels are visited in ascending `k`.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `level`. Levels finished before
    /// the failure are unaffected.
    #[instrument(skip_all, fields(vertices = self.graph.vertex_count()))]
    pub fn run_with<F>(&self, mut level: F) -> Result<SimulationResult>
    where
        F: FnMut(usize, &[u32]) -> Result<LevelResult>,
    {
        let started = Instant::now();
        let plan = self.levels();
        debug!(levels = plan.len(), "removal levels planned");

        let mut levels = BTreeMap::new();
        for (k, fractions) in plan {
            let result = level(k, &fractions).with_context(|| format!("removal level k={k}"))?;
            levels.insert(k, result);
        }

        info!(
            levels = levels.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "simulation complete"
        );
        Ok(SimulationResult {
            vertex_count: self.graph.vertex_count(),
            baseline: compute_metrics(self.graph),
            weak_baseline: compute_weak_metrics(self.graph),
            levels,
        })
    }

    /// Measure one removal level: three ranked attacks and every random
    /// series.
    ///
    /// # Errors
    ///
    /// Returns an error if a ranking names a vertex outside the graph.
    pub fn run_level(&self, k: usize, fractions: &[u32]) -> Result<LevelResult> {
        let started = Instant::now();

        let attack = |metric: CentralityMetric| -> Result<AttackOutcome> {
            let attacked = remove_by_ranking(self.graph, self.rankings.get(metric), k)
                .with_context(|| format!("{metric} ranked removal"))?;
            Ok((compute_metrics(&attacked), compute_weak_metrics(&attacked)))
        };
        let ranked: Vec<AttackOutcome> = if self.config.parallel {
            CentralityMetric::ALL
                .par_iter()
                .map(|&m| attack(m))
                .collect::<Result<_>>()?
        } else {
            CentralityMetric::ALL
                .iter()
                .map(|&m| attack(m))
                .collect::<Result<_>>()?
        };

        let mut random = BTreeMap::new();
        for &r in &self.config.trial_counts {
            random.entry(r).or_insert_with(|| self.random_series(k, r));
        }

        info!(
            level = k,
            trials = random.values().map(Vec::len).sum::<usize>(),
            elapsed_ms = started.elapsed().as_millis(),
            "removal level complete"
        );

        Ok(LevelResult {
            k,
            fractions: fractions.to_vec(),
            degree: ranked[0].0,
            closeness: ranked[1].0,
            betweenness: ranked[2].0,
            random,
            weak: WeakLevel {
                degree: ranked[0].1,
                closeness: ranked[1].1,
                betweenness: ranked[2].1,
            },
        })
    }

    /// `r` random trials at level `k`, in trial order.
    fn random_series(&self, k: usize, r: usize) -> Vec<ConnectivityMetrics> {
        let seed = self.config.seed;
        let trial = |t: usize| {
            let mut rng = DeterministicRng::for_trial(seed, k, r, t);
            compute_metrics(&remove_random(self.graph, k, &mut rng))
        };
        if self.config.parallel {
            (0..r).into_par_iter().map(trial).collect()
        } else {
            (0..r).map(trial).collect()
        }
    }
}
