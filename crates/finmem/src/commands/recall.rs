//! Retrieve the ranked memory context for a query.

use anyhow::{Context, Result};
use colored::Colorize;
use finmem_core::memory::render_context;
use finmem_core::{EventSource, QueryContext};

use crate::config::Config;

use super::{open_memory, persist};

/// Execute recall command.
pub async fn execute(
    query: &str,
    k: usize,
    sources: Vec<EventSource>,
    symbols: Vec<String>,
    config: &Config,
) -> Result<()> {
    let manager = open_memory(config).await?;

    let mut context = QueryContext::new(query);
    if !sources.is_empty() {
        context = context.with_sources(sources);
    }
    if !symbols.is_empty() {
        context = context.with_symbols(symbols);
    }

    let memories = match manager.retrieve(context, k).await {
        Ok(memories) => memories,
        Err(e) if e.is_empty_memory() => {
            println!("{} Memory is empty; ingest some events first", "⚠".yellow());
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to retrieve memories"),
    };

    // Access counts changed
    persist(&manager, config).await?;

    if memories.is_empty() {
        println!("{} No memories match the query", "⚠".yellow());
        return Ok(());
    }

    println!("{} {} memories for \"{}\":", "✓".green(), memories.len(), query.cyan());
    println!();
    println!("{}", render_context(&memories));
    println!();

    for memory in &memories {
        println!(
            "  {}",
            format!(
                "{}  composite {:.3}  relevance {:.3}  recency {:.3}  accessed {}x",
                memory.entry.id(),
                memory.composite,
                memory.relevance,
                memory.recency,
                memory.entry.access_count()
            )
            .dimmed()
        );
    }

    Ok(())
}
