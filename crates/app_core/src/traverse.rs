//! Recursive listing and search

use app_fs::{FileEntry, ProviderAdapter, ProviderResult, RemotePath};

/// Every entry below `root`, depth first, each folder before its children
///
/// Children keep the order the provider listed them in, so identical listings
/// always produce identical output. Any failed `list` aborts the walk.
pub async fn traverse(
    adapter: &dyn ProviderAdapter,
    root: &RemotePath,
) -> ProviderResult<Vec<FileEntry>> {
    let root = RemotePath::new(root.trimmed());
    let mut found = Vec::new();
    let mut pending = children_of(adapter, &root).await?;
    pending.reverse();

    while let Some(entry) = pending.pop() {
        if entry.is_folder() {
            let mut children = children_of(adapter, &entry.path).await?;
            children.reverse();
            pending.extend(children);
        }
        found.push(entry);
    }

    tracing::debug!("Traversed {} entries below {}", found.len(), root);
    Ok(found)
}

/// Entries below `root` whose name contains any keyword, ignoring case
pub async fn search<S: AsRef<str>>(
    adapter: &dyn ProviderAdapter,
    root: &RemotePath,
    keywords: &[S],
) -> ProviderResult<Vec<FileEntry>> {
    let mut entries = traverse(adapter, root).await?;
    entries.retain(|entry| entry.matches_any(keywords));
    Ok(entries)
}

/// List `folder` and tag every child with its full path
async fn children_of(
    adapter: &dyn ProviderAdapter,
    folder: &RemotePath,
) -> ProviderResult<Vec<FileEntry>> {
    let mut children = adapter.list(folder).await?;
    for child in &mut children {
        child.path = folder.join(&child.name);
    }
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, ScriptedAdapter};
    use app_fs::ProviderError;

    fn tree() -> ScriptedAdapter {
        let adapter = ScriptedAdapter::new();
        adapter.add_file("/docs/Invoice_2021.pdf", "i");
        adapter.add_file("/docs/drafts/Draft-notes.md", "d");
        adapter.add_file("/docs/drafts/old/summary.txt", "s");
        adapter.add_file("/docs/zz.txt", "z");
        adapter.add_file("/other.txt", "o");
        adapter
    }

    fn paths(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[tokio::test]
    async fn test_preorder_with_full_paths() {
        let adapter = tree();
        let entries = traverse(&adapter, &RemotePath::new("/docs/")).await.unwrap();
        assert_eq!(
            paths(&entries),
            vec![
                "/docs/Invoice_2021.pdf",
                "/docs/drafts",
                "/docs/drafts/Draft-notes.md",
                "/docs/drafts/old",
                "/docs/drafts/old/summary.txt",
                "/docs/zz.txt",
            ]
        );
    }

    #[tokio::test]
    async fn test_traversal_is_deterministic() {
        let adapter = tree();
        let first = traverse(&adapter, &RemotePath::root()).await.unwrap();
        let second = traverse(&adapter, &RemotePath::root()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_nested_failure_aborts_walk() {
        let adapter = tree();
        adapter.fail(
            Call::List("/docs/drafts/old".into()),
            ProviderError::Transport("connection reset".into()),
        );
        let err = traverse(&adapter, &RemotePath::root()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_or() {
        let adapter = tree();
        let hits = search(&adapter, &RemotePath::new("/docs"), &["invoice", "DRAFT"])
            .await
            .unwrap();
        assert_eq!(
            paths(&hits),
            vec!["/docs/Invoice_2021.pdf", "/docs/drafts", "/docs/drafts/Draft-notes.md"]
        );

        let none = search(&adapter, &RemotePath::root(), &["nothing"]).await.unwrap();
        assert!(none.is_empty());
    }
}
