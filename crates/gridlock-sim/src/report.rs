//! Per-level summaries for plotting and export.
//!
//! Ranked attacks contribute their single measurement; random series are
//! reduced to their mean. Output is long-format: one row per
//! `(level, series)`.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use gridlock_analysis::connectivity::ConnectivityMetrics;
use gridlock_analysis::metrics::CentralityMetric;

use crate::campaign::{LevelResult, SimulationResult};

const CSV_HEADER: &str =
    "k,fraction,series,samples,component_count,largest_component_size,disconnected_pair_count";

/// One `(level, series)` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub k: usize,
    /// Smallest configured percentage mapping to `k`.
    pub fraction: u32,
    /// `degree`, `random_10`, `weak_betweenness`, ...
    pub series: String,
    /// Trials averaged into this row.
    pub samples: usize,
    pub component_count: f64,
    pub largest_component_size: f64,
    pub disconnected_pair_count: f64,
}

/// Flattened, averaged view of a [`SimulationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub vertex_count: usize,
    pub baseline: ConnectivityMetrics,
    pub weak_baseline: ConnectivityMetrics,
    pub points: Vec<SeriesPoint>,
}

impl SimulationSummary {
    #[must_use]
    pub fn from_result(result: &SimulationResult) -> Self {
        let mut points = Vec::new();
        for level in result.levels.values() {
            push_level(&mut points, level);
        }
        Self {
            vertex_count: result.vertex_count,
            baseline: result.baseline,
            weak_baseline: result.weak_baseline,
            points,
        }
    }

    /// Rows of one series, in ascending `k`.
    pub fn series<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SeriesPoint> + 'a {
        self.points.iter().filter(move |p| p.series == name)
    }

    /// Write all rows as CSV with a header line.
    ///
    /// # Errors
    ///
    /// Returns any error from `out`.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{CSV_HEADER}")?;
        for p in &self.points {
            writeln!(
                out,
                "{},{},{},{},{},{},{}",
                p.k,
                p.fraction,
                p.series,
                p.samples,
                p.component_count,
                p.largest_component_size,
                p.disconnected_pair_count
            )?;
        }
        out.flush()
    }
}

fn push_level(points: &mut Vec<SeriesPoint>, level: &LevelResult) {
    let fraction = level.fractions.first().copied().unwrap_or(0);
    let row = |series: String, samples: &[ConnectivityMetrics]| {
        let (component_count, largest_component_size, disconnected_pair_count) = mean(samples);
        SeriesPoint {
            k: level.k,
            fraction,
            series,
            samples: samples.len(),
            component_count,
            largest_component_size,
            disconnected_pair_count,
        }
    };

    for metric in CentralityMetric::ALL {
        points.push(row(metric.to_string(), &[level.ranked(metric)]));
    }
    for (r, trials) in &level.random {
        points.push(row(format!("random_{r}"), trials));
    }
    let weak = [
        (CentralityMetric::Degree, level.weak.degree),
        (CentralityMetric::Closeness, level.weak.closeness),
        (CentralityMetric::Betweenness, level.weak.betweenness),
    ];
    for (metric, metrics) in weak {
        points.push(row(format!("weak_{metric}"), &[metrics]));
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(samples: &[ConnectivityMetrics]) -> (f64, f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let n = samples.len() as f64;
    let (mut c, mut l, mut d) = (0.0, 0.0, 0.0);
    for m in samples {
        c += m.component_count as f64;
        l += m.largest_component_size as f64;
        d += m.disconnected_pair_count as f64;
    }
    (c / n, l / n, d / n)
}
