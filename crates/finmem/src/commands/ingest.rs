//! Replay a JSON-lines event feed into memory.
//!
//! Each line is one `RawEvent`. A line that fails to parse or ingest is
//! reported and skipped; the rest of the feed still goes in.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use finmem_core::{MemoryManager, RawEvent};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Config;

use super::{open_memory, persist};

/// Outcome of replaying a feed.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub ingested: usize,
    /// 1-based line number and the reason it was skipped
    pub failures: Vec<(usize, String)>,
}

/// Execute ingest command.
pub async fn execute(file: &Path, config: &Config) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read events file {}", file.display()))?;

    let manager = open_memory(config).await?;

    let total = content.lines().filter(|l| !l.trim().is_empty()).count();
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let report = ingest_lines(&manager, &content, Some(&progress)).await;
    progress.finish_and_clear();

    let path = persist(&manager, config).await?;
    let stats = manager.stats().await;

    println!(
        "{} Ingested {} events from {}",
        "✓".green(),
        report.ingested,
        file.display()
    );
    println!(
        "  Short-term: {}/{}  Long-term: {}/{}",
        stats.short_term,
        stats.short_term_capacity,
        stats.long_term,
        stats.long_term_capacity
    );
    println!(
        "  Promoted: {}  Rescued: {}  Evicted: {} short-term, {} long-term",
        stats.promoted, stats.rescued, stats.evicted_short_term, stats.evicted_long_term
    );
    println!("  Snapshot: {}", path.display().to_string().dimmed());

    if !report.failures.is_empty() {
        println!();
        println!("{} {} lines skipped:", "⚠".yellow(), report.failures.len());
        for (line, reason) in &report.failures {
            println!("  line {}: {}", line, reason);
        }
    }

    Ok(())
}

/// Ingest every non-blank line, collecting failures instead of aborting.
pub async fn ingest_lines(
    manager: &MemoryManager,
    content: &str,
    progress: Option<&ProgressBar>,
) -> IngestReport {
    let mut report = IngestReport::default();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let result = match serde_json::from_str::<RawEvent>(line) {
            Ok(event) => manager.ingest(event).await.map_err(|e| e.to_string()),
            Err(e) => Err(format!("malformed event: {}", e)),
        };

        match result {
            Ok(id) => {
                report.ingested += 1;
                tracing::debug!(line = index + 1, entry_id = %id, "Ingested line");
            }
            Err(reason) => report.failures.push((index + 1, reason)),
        }

        if let Some(progress) = progress {
            progress.inc(1);
        }
    }

    report
}
