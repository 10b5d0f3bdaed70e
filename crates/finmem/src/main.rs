//! finmem - layered market memory CLI
//!
//! Replays JSON-lines market/news feeds into the memory core, persists
//! snapshots between runs and prints the ranked context a decision step
//! would receive.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;
mod snapshot;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (stderr, so command output stays pipeable)
    let (plain, json) = if cli.json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };
    tracing_subscriber::registry()
        .with(plain)
        .with(json)
        .with(EnvFilter::from_default_env().add_directive("finmem=info".parse()?))
        .init();

    // Load configuration
    let config = config::Config::load()?;

    // Execute command
    match cli.command {
        Commands::Ingest { file } => commands::ingest::execute(&file, &config).await,
        Commands::Recall {
            query,
            k,
            sources,
            symbols,
        } => commands::recall::execute(&query, k, sources, symbols, &config).await,
        Commands::Stats => commands::stats::execute(&config).await,
        Commands::Config => commands::config::execute(&config),
    }
}
