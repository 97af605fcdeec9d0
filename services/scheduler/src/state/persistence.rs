//! Snapshot persistence.
//!
//! The whole framework state (session plus task records) is written as one
//! JSON document after every state-affecting event:
//! - write to a temp file, then rename over the old snapshot
//! - a missing file means a fresh framework
//! - a snapshot from another format version is ignored

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::session::Session;
use crate::task::TaskRecord;

/// Snapshot file format version.
const SNAPSHOT_VERSION: u32 = 1;

/// Persisted framework state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkSnapshot {
    /// Format version.
    pub version: u32,
    pub session: Session,
    /// Task records by task identifier.
    pub tasks: BTreeMap<String, TaskRecord>,
}

impl Default for FrameworkSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            session: Session::default(),
            tasks: BTreeMap::new(),
        }
    }
}

/// Snapshot file on stable storage.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot.
    ///
    /// Returns an empty snapshot if the file doesn't exist.
    /// Returns error if the file exists but cannot be parsed.
    pub fn load(&self) -> Result<FrameworkSnapshot> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No snapshot file, starting fresh");
            return Ok(FrameworkSnapshot::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snapshot: {}", self.path.display()))?;

        let snapshot: FrameworkSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", self.path.display()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                file_version = snapshot.version,
                current_version = SNAPSHOT_VERSION,
                "Snapshot version mismatch, starting fresh"
            );
            return Ok(FrameworkSnapshot::default());
        }

        info!(
            path = %self.path.display(),
            framework_id = ?snapshot.session.framework_id().map(|id| id.as_str()),
            task_count = snapshot.tasks.len(),
            "Loaded framework snapshot"
        );

        Ok(snapshot)
    }

    /// Save the snapshot atomically.
    pub fn save(&self, snapshot: &FrameworkSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let tmp_path = self.path.with_extension("tmp");
        let content =
            serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;

        fs::write(&tmp_path, &content)
            .with_context(|| format!("Failed to write temp file: {}", tmp_path.display()))?;

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} -> {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;

        debug!(
            path = %self.path.display(),
            task_count = snapshot.tasks.len(),
            "Saved framework snapshot"
        );

        Ok(())
    }
}
