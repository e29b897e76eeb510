//! Copying between drives and replaying clips
//!
//! Every copy goes through local scratch storage: fetch from the source
//! adapter, then store to the destination adapter. Files are handled one at a
//! time.

use crate::clip::Clip;
use crate::error::{AppError, Result, TransferStage};
use app_fs::{ProviderAdapter, ProviderError, RemotePath, Scratch};

/// Names under which the parts of one fetch are stored
///
/// A single part keeps `target`; several become `stem-1.ext`, `stem-2.ext`, ...
pub fn part_names(target: &str, parts: usize) -> Vec<String> {
    if parts <= 1 {
        return vec![target.to_string()];
    }

    let (stem, ext) = match target.rfind('.') {
        Some(idx) if idx > 0 => target.split_at(idx),
        _ => (target, ""),
    };
    (1..=parts).map(|k| format!("{}-{}{}", stem, k, ext)).collect()
}

/// Copy one file; returns the destination paths written
///
/// A failed store keeps the downloaded copy in scratch until the session ends.
pub async fn copy_file(
    source: &dyn ProviderAdapter,
    from: &RemotePath,
    destination: &dyn ProviderAdapter,
    to: &RemotePath,
    scratch: &Scratch,
) -> Result<Vec<RemotePath>> {
    let (from_folder, from_name) = split(from)?;
    let (to_folder, to_name) = split(to)?;

    // Nothing has moved yet when the source is missing or a folder
    let handle = source
        .fetch(&from_folder, from_name, scratch)
        .await
        .map_err(|source| match source {
            ProviderError::NotFound(_) | ProviderError::IsAFolder(_) => AppError::Provider(source),
            source => AppError::Transfer {
                stage: TransferStage::Fetch,
                path: from.to_string(),
                source,
            },
        })?;

    let names = part_names(to_name, handle.len());
    let mut written = Vec::with_capacity(names.len());
    for (local, name) in handle.parts().iter().zip(&names) {
        let target = to_folder.join(name);
        destination
            .store(&to_folder, name, local)
            .await
            .map_err(|source| AppError::Transfer {
                stage: TransferStage::Store,
                path: target.to_string(),
                source,
            })?;
        written.push(target);
    }

    scratch.release(&handle);
    tracing::info!("Copied {} to {:?}", from, written);
    Ok(written)
}

fn split(path: &RemotePath) -> Result<(RemotePath, &str)> {
    match path.split_file() {
        (folder, Some(name)) => Ok((folder, name)),
        (_, None) => Err(AppError::Usage(format!("{} is not a file", path))),
    }
}

/// Where a clip entry lands when pasted into `destination`
///
/// The entry keeps its position relative to the clip origin. Entries that are
/// not under the origin are placed by their full path, below `destination`.
pub fn paste_target(entry_path: &RemotePath, origin: &RemotePath, destination: &RemotePath) -> RemotePath {
    let relative = entry_path
        .relative_to(origin)
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| entry_path.trimmed().trim_start_matches('/').to_string());
    RemotePath::new(destination.trimmed()).join(&relative)
}

/// Outcome of replaying a clip
#[derive(Debug, Default)]
pub struct PasteReport {
    /// Destination paths written
    pub pasted: Vec<RemotePath>,
    /// Folder entries, which are never pasted themselves
    pub skipped: Vec<RemotePath>,
    /// Source entries that failed, with the reason
    pub errors: Vec<(RemotePath, AppError)>,
}

impl PasteReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Copy every file of `clip` below `destination`, continuing past failures
pub async fn paste(
    clip: &Clip,
    source: &dyn ProviderAdapter,
    target: &dyn ProviderAdapter,
    destination: &RemotePath,
    scratch: &Scratch,
) -> PasteReport {
    let mut report = PasteReport::default();

    for entry in &clip.files {
        if entry.is_folder() {
            tracing::debug!("Skipping folder {} in clip {}", entry.path, clip.name);
            report.skipped.push(entry.path.clone());
            continue;
        }

        let to = paste_target(&entry.path, &clip.origin_path, destination);
        match copy_file(source, &entry.path, target, &to, scratch).await {
            Ok(written) => report.pasted.extend(written),
            Err(e) => {
                tracing::warn!("Paste of {} failed: {}", entry.path, e);
                report.errors.push((entry.path.clone(), e));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipStore;
    use crate::testing::{Call, ScriptedAdapter};
    use app_fs::FileEntry;

    fn clip_of(origin: &str, entries: Vec<FileEntry>) -> Clip {
        let mut store = ClipStore::new();
        store.capture(Some("w"), "src", RemotePath::new(origin), entries).clone()
    }

    #[test]
    fn test_part_names() {
        assert_eq!(part_names("report.pdf", 1), vec!["report.pdf"]);
        assert_eq!(part_names("report.pdf", 2), vec!["report-1.pdf", "report-2.pdf"]);
        assert_eq!(part_names("README", 2), vec!["README-1", "README-2"]);
        assert_eq!(part_names(".env", 2), vec![".env-1", ".env-2"]);
    }

    #[test]
    fn test_paste_target_rebases() {
        let dest = RemotePath::new("/archive");
        let origin = RemotePath::new("/docs");
        assert_eq!(
            paste_target(&RemotePath::new("/docs/2021/a.txt"), &origin, &dest).as_str(),
            "/archive/2021/a.txt"
        );
        // Not under the origin: the whole path goes below the destination
        assert_eq!(
            paste_target(&RemotePath::new("/docsx/a.txt"), &origin, &dest).as_str(),
            "/archive/docsx/a.txt"
        );
    }

    #[tokio::test]
    async fn test_clip_round_trip_into_other_folder() {
        let source = ScriptedAdapter::new();
        source.add_file("/deep/docs/report.pdf", "r");
        source.add_file("/deep/docs/notes.txt", "n");
        let listing = source.list(&RemotePath::new("/deep/docs")).await.unwrap();
        let clip = clip_of("/deep/docs", listing);

        let target = ScriptedAdapter::new();
        let scratch = Scratch::new().unwrap();
        let report = paste(&clip, &source, &target, &RemotePath::new("/archive"), &scratch).await;

        assert!(report.is_clean());
        let mut stores = target.stores();
        stores.sort();
        assert_eq!(stores, vec!["/archive/notes.txt", "/archive/report.pdf"]);
        assert_eq!(target.read("/archive/report.pdf").as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn test_paste_is_best_effort() {
        let source = ScriptedAdapter::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            source.add_file(&format!("/in/{name}"), name);
        }
        source.fail(Call::Fetch("/in/b.txt".into()), ProviderError::Transport("timeout".into()));
        let listing = source.list(&RemotePath::new("/in")).await.unwrap();
        let clip = clip_of("/in", listing);

        let target = ScriptedAdapter::new();
        let scratch = Scratch::new().unwrap();
        let report = paste(&clip, &source, &target, &RemotePath::new("/out"), &scratch).await;

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0.as_str(), "/in/b.txt");
        assert!(report.errors[0].1.is_retryable());
        assert_eq!(target.stores(), vec!["/out/a.txt", "/out/c.txt"]);
    }

    #[tokio::test]
    async fn test_paste_skips_folders() {
        let source = ScriptedAdapter::new();
        source.add_file("/t/sub/x.txt", "x");
        let entries = vec![
            FileEntry::folder(RemotePath::new("/t/sub")),
            FileEntry::file(RemotePath::new("/t/sub/x.txt"), Some(1)),
        ];
        let clip = clip_of("/t", entries);

        let target = ScriptedAdapter::new();
        let scratch = Scratch::new().unwrap();
        let report = paste(&clip, &source, &target, &RemotePath::root(), &scratch).await;

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(target.stores(), vec!["/sub/x.txt"]);
    }

    #[tokio::test]
    async fn test_failed_store_keeps_scratch_copy() {
        let source = ScriptedAdapter::new();
        source.add_file("/a.txt", "a");
        let target = ScriptedAdapter::new();
        target.fail(Call::Store("/b/a.txt".into()), ProviderError::Rejected("quota".into()));
        let scratch = Scratch::new().unwrap();

        let err = copy_file(
            &source,
            &RemotePath::new("/a.txt"),
            &target,
            &RemotePath::new("/b/a.txt"),
            &scratch,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Transfer { stage: TransferStage::Store, .. }));

        let leftovers = std::fs::read_dir(scratch.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_fetch_errors_pass_through_unchanged() {
        let source = ScriptedAdapter::new();
        source.add_folder("/photos");
        let target = ScriptedAdapter::new();
        let scratch = Scratch::new().unwrap();

        let err = copy_file(&source, &RemotePath::new("/photos"), &target, &RemotePath::new("/x"), &scratch)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider(ProviderError::IsAFolder(_))));

        let err = copy_file(&source, &RemotePath::new("/gone.txt"), &target, &RemotePath::new("/x"), &scratch)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider(ProviderError::NotFound(_))));

        source.fail(Call::Fetch("/photos".into()), ProviderError::Transport("reset".into()));
        let err = copy_file(&source, &RemotePath::new("/photos"), &target, &RemotePath::new("/x"), &scratch)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transfer { stage: TransferStage::Fetch, .. }));
        assert!(target.stores().is_empty());
    }

    #[tokio::test]
    async fn test_multi_part_fetch_gets_distinct_names() {
        let source = ScriptedAdapter::new().multi_part(2);
        source.add_file("/doc.docx", "d");
        let target = ScriptedAdapter::new();
        let scratch = Scratch::new().unwrap();

        let written = copy_file(
            &source,
            &RemotePath::new("/doc.docx"),
            &target,
            &RemotePath::new("/out/doc.docx"),
            &scratch,
        )
        .await
        .unwrap();
        let written: Vec<&str> = written.iter().map(|p| p.as_str()).collect();
        assert_eq!(written, vec!["/out/doc-1.docx", "/out/doc-2.docx"]);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
