//! `gridlock simulate`: centrality-ranked and random attack simulation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use gridlock_analysis::metrics::CentralityMetric;
use gridlock_core::config::AnalysisConfig;
use gridlock_sim::SimulationSummary;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Graph document (JSON).
    pub graph: PathBuf,

    /// Seed for random-removal trials.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Random series sizes, e.g. `10,20,100`.
    #[arg(long, value_delimiter = ',')]
    pub trials: Option<Vec<usize>>,

    /// Also write the summary as CSV.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run_simulate(
    args: &SimulateArgs,
    mut config: AnalysisConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(trials) = &args.trials {
        config.simulation.trial_counts.clone_from(trials);
    }
    config.validate()?;

    let (pipeline, prepared) = super::open(config, &args.graph)?;
    let result = pipeline.simulate(&prepared)?;
    let summary = SimulationSummary::from_result(&result);

    if let Some(path) = &args.csv {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        summary
            .write_csv(BufWriter::new(file))
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), rows = summary.points.len(), "summary written");
    }

    render_mode(output, &summary, render_text, render_pretty)
}

fn render_text(summary: &SimulationSummary, w: &mut dyn Write) -> std::io::Result<()> {
    for p in &summary.points {
        writeln!(
            w,
            "{} {} {} {} {} {}",
            p.k,
            p.series,
            p.samples,
            p.component_count,
            p.largest_component_size,
            p.disconnected_pair_count
        )?;
    }
    Ok(())
}

fn render_pretty(summary: &SimulationSummary, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Baseline")?;
    pretty_kv(w, "vertices", summary.vertex_count.to_string())?;
    pretty_kv(
        w,
        "strong components",
        summary.baseline.component_count.to_string(),
    )?;
    pretty_kv(
        w,
        "largest strong",
        summary.baseline.largest_component_size.to_string(),
    )?;
    pretty_kv(
        w,
        "disconnected pairs",
        summary.baseline.disconnected_pair_count.to_string(),
    )?;
    writeln!(w)?;

    pretty_section(w, "Largest strong component after removal")?;
    let mut series: Vec<String> = CentralityMetric::ALL
        .iter()
        .map(ToString::to_string)
        .collect();
    for p in &summary.points {
        if p.series.starts_with("random_") && !series.contains(&p.series) {
            series.push(p.series.clone());
        }
    }

    write!(w, "{:>6}  {:>5}", "k", "p%")?;
    for name in &series {
        write!(w, "  {name:>12}")?;
    }
    writeln!(w)?;

    let mut levels: Vec<(usize, u32)> = summary.points.iter().map(|p| (p.k, p.fraction)).collect();
    levels.dedup();
    for (k, fraction) in levels {
        write!(w, "{k:>6}  {fraction:>5}")?;
        for name in &series {
            let value = summary
                .points
                .iter()
                .find(|p| p.k == k && &p.series == name)
                .map_or(0.0, |p| p.largest_component_size);
            write!(w, "  {value:>12.1}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}
