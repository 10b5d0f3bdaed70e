//! Show memory statistics.

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;

use super::open_memory;

/// Execute stats command.
pub async fn execute(config: &Config) -> Result<()> {
    let manager = open_memory(config).await?;
    let stats = manager.stats().await;

    println!("{}", "Memory Statistics".bold());
    println!();
    println!(
        "  {:<12} {:>5} / {}",
        "Short-term".cyan(),
        stats.short_term,
        stats.short_term_capacity
    );
    println!(
        "  {:<12} {:>5} / {}",
        "Long-term".cyan(),
        stats.long_term,
        stats.long_term_capacity
    );
    println!("  {:<12} {:>5}", "Total".bold(), stats.total);
    println!();
    println!(
        "  Snapshot: {}",
        config.snapshot_path().display().to_string().dimmed()
    );

    if stats.total == 0 {
        println!();
        println!("{} Memory is empty", "⚠".yellow());
    }

    Ok(())
}
