//! Snapshot backends: where a durable store's flat record lives between resets.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tempfile::NamedTempFile;

use super::error::{SnapshotError, SnapshotResult};
use crate::hashing::segment_file_stem;

const SNAPSHOT_EXTENSION: &str = "json";

/// Byte-level persistence for snapshot segments.
///
/// Implementations must outlive the stores that use them: a full state reset
/// drops the store, not the backend.
pub trait SnapshotBackend: Send + Sync {
    /// Returns the stored bytes for `segment`, or `None` if nothing was saved.
    fn load(&self, segment: &str) -> SnapshotResult<Option<Vec<u8>>>;

    /// Replaces the stored bytes for `segment`.
    fn save(&self, segment: &str, bytes: &[u8]) -> SnapshotResult<()>;

    /// Deletes `segment`. Missing segments are not an error.
    fn remove(&self, segment: &str) -> SnapshotResult<()>;
}

#[derive(Clone, Default)]
/// In-process snapshot. Clones share the same segments.
pub struct MemorySnapshot {
    segments: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes of a segment.
    pub fn raw(&self, segment: &str) -> Option<Vec<u8>> {
        self.segments.read().get(segment).cloned()
    }

    /// Overwrites a segment with arbitrary bytes.
    pub fn insert_raw(&self, segment: &str, bytes: Vec<u8>) {
        self.segments.write().insert(segment.to_string(), bytes);
    }

    pub fn segment_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.segments.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl SnapshotBackend for MemorySnapshot {
    fn load(&self, segment: &str) -> SnapshotResult<Option<Vec<u8>>> {
        Ok(self.raw(segment))
    }

    fn save(&self, segment: &str, bytes: &[u8]) -> SnapshotResult<()> {
        self.insert_raw(segment, bytes.to_vec());
        Ok(())
    }

    fn remove(&self, segment: &str) -> SnapshotResult<()> {
        self.segments.write().remove(segment);
        Ok(())
    }
}

impl std::fmt::Debug for MemorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySnapshot")
            .field("segments", &self.segments.read().len())
            .finish()
    }
}

#[derive(Debug, Clone)]
/// One JSON file per segment under `root`, replaced atomically on save.
pub struct FileSnapshot {
    root: PathBuf,
}

impl FileSnapshot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `segment`.
    pub fn segment_path(&self, segment: &str) -> PathBuf {
        self.root.join(format!(
            "{}.{}",
            segment_file_stem(segment),
            SNAPSHOT_EXTENSION
        ))
    }

    fn ensure_root(&self) -> SnapshotResult<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }
}

impl SnapshotBackend for FileSnapshot {
    fn load(&self, segment: &str) -> SnapshotResult<Option<Vec<u8>>> {
        let path = self.segment_path(segment);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(&path)?))
    }

    fn save(&self, segment: &str, bytes: &[u8]) -> SnapshotResult<()> {
        self.ensure_root()?;

        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        file.persist(self.segment_path(segment))
            .map_err(|e| SnapshotError::Io(e.error))?;
        Ok(())
    }

    fn remove(&self, segment: &str) -> SnapshotResult<()> {
        let path = self.segment_path(segment);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
