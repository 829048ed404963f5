#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use gridlock_core::config::{AnalysisConfig, load_config};
use output::{CliError, OutputMode, render_error, resolve_output_mode};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "gridlock: robustness analysis of directed road networks",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for gridlock crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Analysis config (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = "gridlock.toml")]
    config: PathBuf,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Skip the result cache for this run.
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Summarize a road graph",
        after_help = "EXAMPLES:\n    # Vertex, edge, and component counts\n    gridlock stats city.json\n\n    # Emit machine-readable output\n    gridlock stats city.json --format json"
    )]
    Stats(cmd::stats::StatsArgs),

    #[command(
        about = "Rank vertices by centrality",
        after_help = "EXAMPLES:\n    # Top 10 by betweenness\n    gridlock centrality city.json\n\n    # Top 25 by closeness\n    gridlock centrality city.json --top 25 --metric closeness"
    )]
    Centrality(cmd::centrality::CentralityArgs),

    #[command(
        about = "Simulate ranked and random vertex removal",
        long_about = "Remove vertices by degree, closeness, and betweenness rank and at random, \
                      measuring strong connectivity at every configured removal level.",
        after_help = "EXAMPLES:\n    # Default plan: 1..100%, random series of 10, 20, 100 trials\n    gridlock simulate city.json\n\n    # Custom seed and series, with CSV export\n    gridlock simulate city.json --seed 7 --trials 10,50 --csv attack.csv"
    )]
    Simulate(cmd::simulate::SimulateArgs),

    #[command(
        about = "Find strong bridges",
        after_help = "EXAMPLES:\n    # Bridges of the largest strong component, roundabouts excluded\n    gridlock bridges city.json\n\n    # Keep roundabout segments\n    gridlock bridges city.json --include-loops"
    )]
    Bridges(cmd::bridges::BridgesArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("GRIDLOCK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "gridlock=debug,info"
        } else {
            "gridlock=info,warn"
        })
    });

    let format = env::var("GRIDLOCK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn load(cli: &Cli) -> anyhow::Result<AnalysisConfig> {
    let mut config = load_config(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if cli.no_cache {
        config.cache.enabled = false;
    }
    debug!(cache = config.cache.enabled, "configuration resolved");
    Ok(config)
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let config = load(cli)?;
    let started = Instant::now();
    let (name, result) = match &cli.command {
        Commands::Stats(args) => ("stats", cmd::stats::run_stats(args, config, output)),
        Commands::Centrality(args) => (
            "centrality",
            cmd::centrality::run_centrality(args, config, output),
        ),
        Commands::Simulate(args) => (
            "simulate",
            cmd::simulate::run_simulate(args, config, output),
        ),
        Commands::Bridges(args) => ("bridges", cmd::bridges::run_bridges(args, config, output)),
    };
    info!(
        command = name,
        ok = result.is_ok(),
        elapsed_ms = started.elapsed().as_millis(),
        "command finished"
    );
    result
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = resolve_output_mode(cli.format);
    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if render_error(output, &CliError::from_anyhow(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
