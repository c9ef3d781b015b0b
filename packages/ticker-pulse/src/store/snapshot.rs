//! The stats snapshot file (`stats.json`), overwritten after every run.

use std::path::{Path, PathBuf};

use super::{read_json, write_json};
use crate::error::StoreResult;
use crate::types::StatsSnapshot;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored snapshot; an empty one when no run has completed yet.
    pub fn load(&self) -> StoreResult<StatsSnapshot> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    /// Replace the snapshot as a whole.
    pub fn save(&self, snapshot: &StatsSnapshot) -> StoreResult<()> {
        write_json(&self.path, snapshot)?;
        tracing::debug!(
            path = %self.path.display(),
            symbols = snapshot.mention_counts.len(),
            "Snapshot written"
        );
        Ok(())
    }
}
