//! Session-scoped local storage for fetched files

use crate::sanitize_filename;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

/// Local copy of fetched content
///
/// Usually one file, but some providers expand a single remote file into
/// several local parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHandle {
    parts: Vec<PathBuf>,
}

impl LocalHandle {
    pub fn single(path: PathBuf) -> Self {
        Self { parts: vec![path] }
    }

    pub fn from_parts(parts: Vec<PathBuf>) -> Self {
        Self { parts }
    }

    pub fn parts(&self) -> &[PathBuf] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn is_multi_part(&self) -> bool {
        self.parts.len() > 1
    }
}

/// Temporary directory that lives as long as the shell session
///
/// Every fetch gets its own numbered slot so two files with the same name
/// never overwrite each other. The whole directory is removed on drop.
pub struct Scratch {
    dir: TempDir,
    next_slot: AtomicU64,
}

impl Scratch {
    /// Create a scratch area in the system temp directory
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("drivesh-").tempdir()?;
        tracing::debug!("Scratch directory at {:?}", dir.path());
        Ok(Self {
            dir,
            next_slot: AtomicU64::new(0),
        })
    }

    /// Create a scratch area below `parent`
    pub fn new_in<P: AsRef<Path>>(parent: P) -> std::io::Result<Self> {
        std::fs::create_dir_all(parent.as_ref())?;
        let dir = tempfile::Builder::new()
            .prefix("drivesh-")
            .tempdir_in(parent)?;
        Ok(Self {
            dir,
            next_slot: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Reserve a local path for a file called `file_name`
    ///
    /// The parent slot directory is created; the file itself is not.
    pub fn allocate(&self, file_name: &str) -> std::io::Result<PathBuf> {
        let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
        let slot_dir = self.dir.path().join(slot.to_string());
        std::fs::create_dir_all(&slot_dir)?;
        Ok(slot_dir.join(sanitize_filename(file_name)))
    }

    /// Remove the local parts of a handle once they are no longer needed
    pub fn release(&self, handle: &LocalHandle) {
        for part in handle.parts() {
            if !part.starts_with(self.dir.path()) {
                tracing::warn!("Refusing to release {:?}: outside scratch", part);
                continue;
            }
            if let Err(e) = std::fs::remove_file(part) {
                tracing::debug!("Failed to remove scratch file {:?}: {}", part, e);
            }
            if let Some(slot) = part.parent() {
                // Only succeeds once the slot is empty
                let _ = std::fs::remove_dir(slot);
            }
        }
    }
}
