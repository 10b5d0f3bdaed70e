//! On-disk memory snapshots.
//!
//! A snapshot is the memory manager's export wrapped in a small versioned
//! envelope and written as pretty JSON.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use finmem_core::MemoryEntry;
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub entries: Vec<MemoryEntry>,
}

impl Snapshot {
    pub fn new(entries: Vec<MemoryEntry>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            entries,
        }
    }

    /// Read a snapshot. `None` when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            bail!(
                "Unsupported snapshot version {} in {} (expected {})",
                snapshot.version,
                path.display(),
                SNAPSHOT_VERSION
            );
        }

        tracing::debug!(
            path = %path.display(),
            entries = snapshot.entries.len(),
            "Loaded snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Write the snapshot, replacing any previous file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create snapshot directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;

        // Write next to the target, then rename over it
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write snapshot {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace snapshot {}", path.display()))?;

        tracing::debug!(path = %path.display(), entries = self.entries.len(), "Saved snapshot");
        Ok(())
    }
}
