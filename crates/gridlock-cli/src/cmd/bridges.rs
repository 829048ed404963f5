//! `gridlock bridges`: strong bridges of the largest strong component.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use gridlock_analysis::bridges::StrongBridgeSet;
use gridlock_core::config::AnalysisConfig;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct BridgesArgs {
    /// Graph document (JSON).
    pub graph: PathBuf,

    /// Keep loop-segment (roundabout) edges in the result.
    #[arg(long)]
    pub include_loops: bool,
}

#[derive(Debug, Serialize)]
struct BridgesReport {
    version: String,
    #[serde(flatten)]
    set: StrongBridgeSet,
}

pub fn run_bridges(
    args: &BridgesArgs,
    mut config: AnalysisConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    if args.include_loops {
        config.bridges.exclude_loop_edges = false;
    }
    let (pipeline, prepared) = super::open(config, &args.graph)?;
    let set = pipeline.bridges(&prepared)?;
    let report = BridgesReport {
        version: prepared.version,
        set,
    };
    render_mode(output, &report, render_text, render_pretty)
}

fn render_text(report: &BridgesReport, w: &mut dyn Write) -> std::io::Result<()> {
    for (source, target) in &report.set.bridges {
        writeln!(w, "{source} {target}")?;
    }
    Ok(())
}

fn render_pretty(report: &BridgesReport, w: &mut dyn Write) -> std::io::Result<()> {
    let set = &report.set;
    pretty_section(w, "Strong bridges")?;
    pretty_kv(w, "component size", set.component_size.to_string())?;
    pretty_kv(
        w,
        "root",
        set.root.map_or_else(|| "-".to_string(), |r| r.to_string()),
    )?;
    pretty_kv(w, "bridges", set.len().to_string())?;
    pretty_kv(
        w,
        "excluded loop edges",
        set.excluded_loop_edges.len().to_string(),
    )?;
    if !set.bridges.is_empty() {
        writeln!(w)?;
        for (source, target) in &set.bridges {
            writeln!(w, "  {source} -> {target}")?;
        }
    }
    Ok(())
}
