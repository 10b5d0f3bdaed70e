//! Configuration management for finmem.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (FINMEM_CONFIG, FINMEM_SNAPSHOT)
//! 2. Config file (<data dir>/config.toml)
//! 3. Default values

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use finmem_core::MemoryConfig;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Memory capacities, thresholds and weights
    pub memory: MemoryConfig,

    /// Embedding backend
    pub embedder: EmbedderConfig,

    /// Paths
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub backend: EmbedderBackend,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderBackend {
    /// Deterministic feature hashing, no model required
    #[default]
    Hashing,
    /// Local all-MiniLM-L6-v2 (requires the `embeddings` feature)
    Fastembed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Base directory for finmem data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Snapshot file (default: <data_dir>/memory.json)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "finmem", "finmem") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".finmem")
    }
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        config
            .memory
            .validate()
            .with_context(|| format!("Invalid memory configuration in {}", path.display()))?;

        Ok(config)
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("FINMEM_CONFIG") {
            PathBuf::from(path)
        } else {
            default_data_dir().join("config.toml")
        }
    }

    /// Get the snapshot path.
    pub fn snapshot_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("FINMEM_SNAPSHOT") {
            return PathBuf::from(path);
        }
        self.paths
            .snapshot
            .clone()
            .unwrap_or_else(|| self.paths.data_dir.join("memory.json"))
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.paths.data_dir).context("Failed to create data directory")?;
        if let Some(parent) = self.snapshot_path().parent() {
            std::fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
        }
        Ok(())
    }
}
