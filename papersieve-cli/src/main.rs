//! papersieve — curate academic papers into security-taxonomy categories.
//!
//! Thin I/O shell around `papersieve-core`: loads a domain ruleset, runs
//! the filtering pipeline, and hands results to export.

mod commands;

use clap::Parser;
use papersieve_core::DomainConfig;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter, analyze, and classify research-paper collections
#[derive(Parser, Debug)]
#[command(name = "papersieve", version, about, long_about = None)]
struct Cli {
    /// Domain configuration YAML (built-in model-extraction ruleset if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "papersieve", "papersieve")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "papersieve.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // A configuration error is fatal before any paper is processed.
    let config = match &cli.config {
        Some(path) => DomainConfig::load(path)
            .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?,
        None => DomainConfig::model_extraction()
            .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?,
    };
    tracing::info!(domain = %config.domain_name, "domain configuration loaded");

    commands::run(cli.command, &config).await
}
