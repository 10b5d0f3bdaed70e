//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use finmem_core::EventSource;

/// Layered market memory for LLM trading agents
#[derive(Parser, Debug)]
#[command(name = "finmem")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a JSON-lines file of raw events
    Ingest {
        /// Path to the events file (one RawEvent JSON object per line)
        file: PathBuf,
    },

    /// Retrieve the ranked memory context for a query
    Recall {
        /// Description of the current market situation
        query: String,

        /// Number of memories to return
        #[arg(short, long, default_value_t = 5)]
        k: usize,

        /// Only consider these sources (market_data, news, technical_indicator, trade)
        #[arg(long = "source", value_name = "SOURCE")]
        sources: Vec<EventSource>,

        /// Only consider events tagged with these tickers
        #[arg(long = "symbol", value_name = "SYMBOL")]
        symbols: Vec<String>,
    },

    /// Show store sizes
    Stats,

    /// Print the effective configuration
    Config,
}
