//! `gridlock centrality`: top vertices by one centrality metric.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use gridlock_analysis::metrics::{CentralityMetric, CentralityRow};
use gridlock_core::config::AnalysisConfig;
use gridlock_sim::build_ranking;

use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct CentralityArgs {
    /// Graph document (JSON).
    pub graph: PathBuf,

    /// Number of vertices to show.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Metric to rank by: degree, closeness, or betweenness.
    #[arg(long, default_value_t = CentralityMetric::Betweenness)]
    pub metric: CentralityMetric,
}

#[derive(Debug, Serialize)]
struct CentralityReport {
    version: String,
    metric: CentralityMetric,
    vertex_count: usize,
    rows: Vec<CentralityRow>,
}

pub fn run_centrality(
    args: &CentralityArgs,
    config: AnalysisConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let (pipeline, prepared) = super::open(config, &args.graph)?;
    let table = pipeline.centrality(&prepared)?;
    let ranking = build_ranking(&table, args.metric);

    let rows = ranking
        .top(args.top)
        .iter()
        .filter_map(|&v| table.get(v).copied())
        .collect();
    let report = CentralityReport {
        version: prepared.version,
        metric: args.metric,
        vertex_count: table.len(),
        rows,
    };
    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &CentralityReport, w: &mut dyn Write) -> std::io::Result<()> {
    for row in &report.rows {
        writeln!(
            w,
            "{} {} {:.6} {:.3}",
            row.vertex, row.degree, row.closeness, row.betweenness
        )?;
    }
    Ok(())
}

fn render_pretty(report: &CentralityReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(
        w,
        &format!(
            "Top {} of {} vertices by {}",
            report.rows.len(),
            report.vertex_count,
            report.metric
        ),
    )?;
    writeln!(
        w,
        "{:>4}  {:>14}  {:>6}  {:>10}  {:>14}",
        "#", "vertex", "degree", "closeness", "betweenness"
    )?;
    for (i, row) in report.rows.iter().enumerate() {
        writeln!(
            w,
            "{:>4}  {:>14}  {:>6}  {:>10.6}  {:>14.3}",
            i + 1,
            row.vertex,
            row.degree,
            row.closeness,
            row.betweenness
        )?;
    }
    Ok(())
}
