//! `gridlock stats`: structural summary of a road graph.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use gridlock_analysis::stats::GraphStats;
use gridlock_core::config::AnalysisConfig;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Graph document (JSON).
    pub graph: PathBuf,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    version: String,
    #[serde(flatten)]
    stats: GraphStats,
}

pub fn run_stats(
    args: &StatsArgs,
    config: AnalysisConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let (pipeline, prepared) = super::open(config, &args.graph)?;
    let report = StatsReport {
        stats: pipeline.stats(&prepared)?,
        version: prepared.version,
    };
    render_mode(output, &report, render_text, render_pretty)
}

fn rows(s: &GraphStats) -> [(&'static str, String); 10] {
    [
        ("vertices", s.vertex_count.to_string()),
        ("edges", s.edge_count.to_string()),
        ("density", format!("{:.6}", s.density)),
        ("strong components", s.strong_component_count.to_string()),
        ("largest strong", s.largest_strong_component.to_string()),
        ("weak components", s.weak_component_count.to_string()),
        ("loop segment edges", s.loop_segment_edge_count.to_string()),
        ("isolated vertices", s.isolated_vertex_count.to_string()),
        ("max in-degree", s.max_in_degree.to_string()),
        ("max out-degree", s.max_out_degree.to_string()),
    ]
}

fn render_text(report: &StatsReport, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "version {}", report.version)?;
    for (key, value) in rows(&report.stats) {
        writeln!(w, "{} {value}", key.replace(' ', "_"))?;
    }
    Ok(())
}

fn render_pretty(report: &StatsReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Graph")?;
    pretty_kv(w, "version", &report.version)?;
    for (key, value) in rows(&report.stats) {
        pretty_kv(w, key, value)?;
    }
    Ok(())
}
