//! Snapshot persistence
//!
//! Loading never fails: a missing file and a corrupted file both mean "start
//! fresh". Saving writes pretty-printed JSON to a temporary sibling file and
//! renames it over the target, so readers never observe a half-written
//! document.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::app::models::Snapshot;
use crate::errors::{SnapshotError, SnapshotResult};

/// Reads and writes the snapshot document at a fixed path
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store for the given document path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the prior snapshot, if one exists and parses
    pub fn load(&self) -> Option<Snapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No prior snapshot at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!(
                    "Could not read prior snapshot {}: {}. Starting fresh",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) => {
                info!(
                    "Loaded prior snapshot with {} entries from {}",
                    snapshot.vods.len(),
                    self.path.display()
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!(
                    "Prior snapshot {} is not valid: {}. Starting fresh",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    /// Replace the document with `snapshot`
    pub fn save(&self, snapshot: &Snapshot) -> SnapshotResult<()> {
        let mut content = serde_json::to_string_pretty(snapshot)?;
        content.push('\n');

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|source| SnapshotError::Io {
            path: parent.clone(),
            source,
        })?;

        let io_error = |source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        };
        let mut temp = NamedTempFile::new_in(&parent).map_err(io_error)?;
        temp.write_all(content.as_bytes()).map_err(io_error)?;
        temp.flush().map_err(io_error)?;

        temp.persist(&self.path)
            .map_err(|source| SnapshotError::Persist {
                path: self.path.clone(),
                source,
            })?;

        info!(
            "Wrote snapshot with {} entries to {}",
            snapshot.vods.len(),
            self.path.display()
        );
        Ok(())
    }
}
