//! Named snapshots of listing results

use crate::error::{AppError, Result};
use app_db::ClipRecord;
use app_fs::{FileEntry, RemotePath};
use std::collections::BTreeMap;

pub const DEFAULT_CLIP: &str = "default";

/// An immutable capture of a listing, with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub name: String,
    pub origin_drive: String,
    pub origin_path: RemotePath,
    pub files: Vec<FileEntry>,
}

impl Clip {
    pub fn file_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_file()).count()
    }
}

impl From<ClipRecord> for Clip {
    fn from(record: ClipRecord) -> Self {
        Self {
            name: record.name,
            origin_drive: record.origin_drive,
            origin_path: record.origin_path,
            files: record.files,
        }
    }
}

impl From<&Clip> for ClipRecord {
    fn from(clip: &Clip) -> Self {
        Self {
            name: clip.name.clone(),
            origin_drive: clip.origin_drive.clone(),
            origin_path: clip.origin_path.clone(),
            files: clip.files.clone(),
        }
    }
}

/// All clips by name
#[derive(Debug, Clone, Default)]
pub struct ClipStore {
    clips: BTreeMap<String, Clip>,
}

impl ClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ClipRecord>) -> Self {
        Self {
            clips: records
                .into_iter()
                .map(|r| (r.name.clone(), Clip::from(r)))
                .collect(),
        }
    }

    /// Store a capture, replacing any clip with the same name
    pub fn capture(
        &mut self,
        name: Option<&str>,
        origin_drive: &str,
        origin_path: RemotePath,
        files: Vec<FileEntry>,
    ) -> &Clip {
        let name = name.unwrap_or(DEFAULT_CLIP).to_string();
        tracing::debug!("Captured {} entries into clip {}", files.len(), name);
        let clip = Clip {
            name: name.clone(),
            origin_drive: origin_drive.to_string(),
            origin_path,
            files,
        };
        self.clips.insert(name.clone(), clip);
        &self.clips[&name]
    }

    pub fn get(&self, name: &str) -> Result<&Clip> {
        self.clips
            .get(name)
            .ok_or_else(|| AppError::UnknownClip(name.to_string()))
    }

    /// Look up a clip that is about to be pasted
    pub fn pasteable(&self, name: &str) -> Result<&Clip> {
        let clip = self.get(name)?;
        if clip.files.is_empty() {
            return Err(AppError::EmptyClip(name.to_string()));
        }
        Ok(clip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.clips.values()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clear(&mut self) {
        self.clips.clear();
    }
}
