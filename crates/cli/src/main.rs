//! ADL visualizer data export.
//!
//! Usage:
//!   adl-export events
//!   adl-export flow --input ./adl_detailed_analysis_REALTIME.csv
//!   adl-export --config export.json --output-dir ./public/data all

use adl_core::Config;
use adl_export::{export_events, export_flow};
use adl_ingestion::load_from_config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Export ADL event data for the visualizer front end.
#[derive(Parser, Debug)]
#[command(name = "adl-export", version)]
#[command(about = "Export liquidation/ADL events and flow data as JSON")]
struct Cli {
    /// JSON configuration file (defaults apply to missing sections)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local CSV path, overriding the configured one
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory, overriding the configured one
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Write the flat, time-ordered events document
    Events,
    /// Write the aggregated flow document
    Flow,
    /// Load the input once and write both documents
    All,
}

impl Commands {
    fn runs_events(self) -> bool {
        matches!(self, Commands::Events | Commands::All)
    }

    fn runs_flow(self) -> bool {
        matches!(self, Commands::Flow | Commands::All)
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(input) = &cli.input {
        config.source.local_path = input.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let records = load_from_config(&config.source).context("failed to load ADL input")?;

    if cli.command.runs_events() {
        info!("Exporting ADL events to JSON");
        export_events(&records, &config.output).context("events export failed")?;
    }
    if cli.command.runs_flow() {
        info!("Exporting ADL flow data");
        export_flow(&records, &config.flow, &config.output).context("flow export failed")?;
    }
    Ok(())
}
