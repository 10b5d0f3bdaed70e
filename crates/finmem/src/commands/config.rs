//! Print the effective configuration.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::Config;

/// Execute config command.
pub fn execute(config: &Config) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;

    println!(
        "{}",
        format!("# {}", Config::config_path().display()).dimmed()
    );
    println!("{}", rendered);
    Ok(())
}
