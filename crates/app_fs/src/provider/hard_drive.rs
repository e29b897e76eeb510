//! A folder on the local disk acting as a drive root

use super::{AuthState, ProviderAdapter, ProviderError, ProviderResult, Prompter};
use crate::{FileEntry, LocalHandle, RemotePath, Scratch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HardDriveConfig {
    root: PathBuf,
}

pub struct HardDriveProvider {
    root: Option<PathBuf>,
}

impl HardDriveProvider {
    pub fn unconfigured() -> Self {
        Self { root: None }
    }

    /// Bind directly to an existing folder
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn from_auth(auth: &AuthState) -> ProviderResult<Self> {
        let config: HardDriveConfig = auth.to_config()?;
        Ok(Self::with_root(config.root))
    }

    fn root(&self) -> ProviderResult<&Path> {
        self.root
            .as_deref()
            .ok_or_else(|| ProviderError::Setup("drive has no root folder".into()))
    }

    /// Map a drive path onto the disk; normalized paths never climb out of the root
    fn local_path(&self, path: &RemotePath) -> ProviderResult<PathBuf> {
        let mut local = self.root()?.to_path_buf();
        for segment in path.segments() {
            local.push(segment);
        }
        Ok(local)
    }
}

fn map_io(err: std::io::Error, path: &RemotePath) -> ProviderError {
    match err.kind() {
        ErrorKind::NotFound => ProviderError::NotFound(path.to_string()),
        ErrorKind::PermissionDenied => ProviderError::Rejected(format!("{}: permission denied", path)),
        _ => ProviderError::Io(err.to_string()),
    }
}

#[async_trait(?Send)]
impl ProviderAdapter for HardDriveProvider {
    fn id(&self) -> &str {
        "hard_drive"
    }

    async fn initialize(
        &mut self,
        drive_name: &str,
        prompter: &mut dyn Prompter,
    ) -> ProviderResult<AuthState> {
        let answer = prompter.ask(
            &format!("Enter the folder on this computer that {} should point to", drive_name),
            None,
        )?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(ProviderError::Setup("a root folder is required".into()));
        }

        let root = PathBuf::from(answer);
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|e| ProviderError::Setup(format!("{}: {}", root.display(), e)))?;
        if !meta.is_dir() {
            return Err(ProviderError::Setup(format!("{} is not a folder", root.display())));
        }

        let root = tokio::fs::canonicalize(&root).await.unwrap_or(root);
        tracing::info!("Hard drive {} bound to {:?}", drive_name, root);
        let auth = AuthState::from_config(&HardDriveConfig { root: root.clone() })?;
        self.root = Some(root);
        Ok(auth)
    }

    async fn list(&self, path: &RemotePath) -> ProviderResult<Vec<FileEntry>> {
        let dir = self.local_path(path)?;
        let mut reader = tokio::fs::read_dir(&dir).await.map_err(|e| map_io(e, path))?;
        let base = RemotePath::new(path.trimmed());

        let mut entries = Vec::new();
        while let Some(item) = reader.next_entry().await? {
            let name = item.file_name().to_string_lossy().into_owned();
            let meta = match item.metadata().await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::debug!("Skipping {:?}: {}", item.path(), e);
                    continue;
                }
            };

            let created = meta.created().ok().map(DateTime::<Utc>::from);
            let modified = meta.modified().ok().map(DateTime::<Utc>::from);
            let entry = if meta.is_dir() {
                FileEntry::folder(base.join(&name))
            } else {
                FileEntry::file(base.join(&name), Some(meta.len()))
            };
            entries.push(entry.with_times(created, modified));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn fetch(
        &self,
        folder: &RemotePath,
        file_name: &str,
        scratch: &Scratch,
    ) -> ProviderResult<LocalHandle> {
        let remote = folder.join(file_name);
        let source = self.local_path(&remote)?;
        let meta = tokio::fs::metadata(&source).await.map_err(|e| map_io(e, &remote))?;
        if meta.is_dir() {
            return Err(ProviderError::IsAFolder(remote.to_string()));
        }

        let local = scratch.allocate(file_name)?;
        tokio::fs::copy(&source, &local).await.map_err(|e| map_io(e, &remote))?;
        Ok(LocalHandle::single(local))
    }

    async fn store(&self, folder: &RemotePath, file_name: &str, local: &Path) -> ProviderResult<()> {
        let dir = self.local_path(folder)?;
        tokio::fs::create_dir_all(&dir).await.map_err(|e| map_io(e, folder))?;

        let remote = folder.join(file_name);
        let target = dir.join(file_name);
        if tokio::fs::metadata(&target).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(ProviderError::IsAFolder(remote.to_string()));
        }
        tokio::fs::copy(local, &target).await.map_err(|e| map_io(e, &remote))?;
        Ok(())
    }

    async fn delete(&self, folder: &RemotePath, file_name: Option<&str>) -> ProviderResult<()> {
        let remote = match file_name {
            Some(name) => folder.join(name),
            None => folder.clone(),
        };
        if remote.is_root() {
            return Err(ProviderError::Rejected("the drive root cannot be deleted".into()));
        }

        let target = self.local_path(&remote)?;
        let meta = tokio::fs::metadata(&target).await.map_err(|e| map_io(e, &remote))?;
        let removed = if meta.is_dir() {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_file(&target).await
        };
        removed.map_err(|e| map_io(e, &remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Answer(String);

    impl Prompter for Answer {
        fn ask(&mut self, _question: &str, _default: Option<&str>) -> ProviderResult<String> {
            Ok(self.0.clone())
        }

        fn note(&mut self, _message: &str) {}
    }

    fn setup() -> (TempDir, HardDriveProvider) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/old")).unwrap();
        std::fs::write(dir.path().join("docs/b.txt"), "bbb").unwrap();
        std::fs::write(dir.path().join("docs/a.txt"), "a").unwrap();
        let provider = HardDriveProvider::with_root(dir.path());
        (dir, provider)
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_tagged() {
        let (_dir, hd) = setup();
        let entries = hd.list(&RemotePath::new("/docs")).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "old"]);
        assert_eq!(entries[1].path.as_str(), "/docs/b.txt");
        assert_eq!(entries[1].size, Some(3));
        assert!(entries[2].is_folder());
    }

    #[tokio::test]
    async fn test_missing_folder_is_not_found() {
        let (_dir, hd) = setup();
        let err = hd.list(&RemotePath::new("/missing")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_creates_parents() {
        let (dir, hd) = setup();
        let scratch = Scratch::new().unwrap();
        let handle = hd
            .fetch(&RemotePath::new("/docs"), "b.txt", &scratch)
            .await
            .unwrap();

        hd.store(&RemotePath::new("/backup/2021"), "b.txt", &handle.parts()[0])
            .await
            .unwrap();
        let copied = std::fs::read_to_string(dir.path().join("backup/2021/b.txt")).unwrap();
        assert_eq!(copied, "bbb");
    }

    #[tokio::test]
    async fn test_delete_file_and_folder() {
        let (dir, hd) = setup();
        hd.delete(&RemotePath::new("/docs"), Some("a.txt")).await.unwrap();
        assert!(!dir.path().join("docs/a.txt").exists());

        hd.delete(&RemotePath::new("/docs"), None).await.unwrap();
        assert!(!dir.path().join("docs").exists());
    }

    #[tokio::test]
    async fn test_initialize_requires_existing_folder() {
        let dir = TempDir::new().unwrap();
        let mut hd = HardDriveProvider::unconfigured();
        let mut answer = Answer(dir.path().join("nope").display().to_string());
        assert!(matches!(
            hd.initialize("d", &mut answer).await,
            Err(ProviderError::Setup(_))
        ));

        let mut answer = Answer(dir.path().display().to_string());
        let auth = hd.initialize("d", &mut answer).await.unwrap();
        assert!(HardDriveProvider::from_auth(&auth).is_ok());
    }
}
