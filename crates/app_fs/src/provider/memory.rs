//! In-process backend kept for the lifetime of the session

use super::{AuthState, ProviderAdapter, ProviderError, ProviderResult, Prompter};
use crate::{FileEntry, LocalHandle, RemotePath, Scratch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Node {
    Folder,
    File { data: Vec<u8>, modified: DateTime<Utc> },
}

/// Tree of folders and byte blobs keyed by trimmed absolute path
///
/// Clones share the same tree.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    nodes: Arc<Mutex<BTreeMap<String, Node>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Folder);
        Self {
            nodes: Arc::new(Mutex::new(nodes)),
        }
    }

    /// Put a file at `path`, creating its parent folders
    pub fn insert_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        let path = RemotePath::new(path);
        let mut nodes = self.nodes.lock();
        Self::create_parents(&mut nodes, &path.parent());
        nodes.insert(
            path.trimmed().to_string(),
            Node::File {
                data: data.into(),
                modified: Utc::now(),
            },
        );
    }

    /// Create an (empty) folder at `path`
    pub fn insert_folder(&self, path: &str) {
        let path = RemotePath::new(path);
        let mut nodes = self.nodes.lock();
        Self::create_parents(&mut nodes, &path);
    }

    /// Contents of the file at `path`, if there is one
    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        let path = RemotePath::new(path);
        match self.nodes.lock().get(path.trimmed()) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.nodes.lock().contains_key(RemotePath::new(path).trimmed())
    }

    fn create_parents(nodes: &mut BTreeMap<String, Node>, folder: &RemotePath) {
        let mut current = RemotePath::root();
        for segment in folder.segments() {
            current = current.join(segment);
            nodes
                .entry(current.trimmed().to_string())
                .or_insert(Node::Folder);
        }
    }

    fn is_direct_child(parent: &RemotePath, key: &str) -> bool {
        let candidate = RemotePath::new(key);
        !candidate.is_root() && candidate.parent().same_folder(parent)
    }

    fn is_under(base: &RemotePath, key: &str) -> bool {
        RemotePath::new(key).relative_to(base).is_some()
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl ProviderAdapter for MemoryProvider {
    fn id(&self) -> &str {
        "memory"
    }

    async fn initialize(
        &mut self,
        drive_name: &str,
        prompter: &mut dyn Prompter,
    ) -> ProviderResult<AuthState> {
        prompter.note(&format!(
            "{} is kept in memory and will be empty the next time drivesh starts",
            drive_name
        ));
        Ok(AuthState::empty())
    }

    async fn list(&self, path: &RemotePath) -> ProviderResult<Vec<FileEntry>> {
        let nodes = self.nodes.lock();
        match nodes.get(path.trimmed()) {
            Some(Node::Folder) => {}
            Some(Node::File { .. }) => {
                return Err(ProviderError::Rejected(format!("{} is not a folder", path)))
            }
            None => return Err(ProviderError::NotFound(path.to_string())),
        }

        Ok(nodes
            .iter()
            .filter(|(key, _)| Self::is_direct_child(path, key))
            .map(|(key, node)| match node {
                Node::Folder => FileEntry::folder(RemotePath::new(key)),
                Node::File { data, modified } => {
                    FileEntry::file(RemotePath::new(key), Some(data.len() as u64))
                        .with_times(Some(*modified), Some(*modified))
                }
            })
            .collect())
    }

    async fn fetch(
        &self,
        folder: &RemotePath,
        file_name: &str,
        scratch: &Scratch,
    ) -> ProviderResult<LocalHandle> {
        let path = folder.join(file_name);
        let data = match self.nodes.lock().get(path.trimmed()) {
            Some(Node::File { data, .. }) => data.clone(),
            Some(Node::Folder) => return Err(ProviderError::IsAFolder(path.to_string())),
            None => return Err(ProviderError::NotFound(path.to_string())),
        };

        let local = scratch.allocate(file_name)?;
        tokio::fs::write(&local, data).await?;
        Ok(LocalHandle::single(local))
    }

    async fn store(&self, folder: &RemotePath, file_name: &str, local: &Path) -> ProviderResult<()> {
        let data = tokio::fs::read(local).await?;
        let path = folder.join(file_name);

        let mut nodes = self.nodes.lock();
        if let Some(Node::Folder) = nodes.get(path.trimmed()) {
            return Err(ProviderError::IsAFolder(path.to_string()));
        }
        Self::create_parents(&mut nodes, folder);
        nodes.insert(
            path.trimmed().to_string(),
            Node::File {
                data,
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, folder: &RemotePath, file_name: Option<&str>) -> ProviderResult<()> {
        let target = match file_name {
            Some(name) => folder.join(name),
            None => folder.clone(),
        };
        if target.is_root() {
            return Err(ProviderError::Rejected("the drive root cannot be deleted".into()));
        }

        let mut nodes = self.nodes.lock();
        if !nodes.contains_key(target.trimmed()) {
            return Err(ProviderError::NotFound(target.to_string()));
        }
        nodes.retain(|key, _| !Self::is_under(&target, key));
        Ok(())
    }
}
