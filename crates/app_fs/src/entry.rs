//! Listing entries returned by providers

use crate::RemotePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Kind of a listed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

/// File or folder reported by a provider
///
/// Built fresh from every adapter response and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub kind: FileKind,

    /// Absolute, provider-local path
    pub path: RemotePath,

    /// Size in bytes, when the provider reports one
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub created_at_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_modified_time: Option<DateTime<Utc>>,

    /// Opaque handle the provider uses to fetch the content
    #[serde(default)]
    pub content_locator: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,
}

impl FileEntry {
    /// A file entry at `path`
    pub fn file(path: RemotePath, size: Option<u64>) -> Self {
        Self::new(path, FileKind::File, size)
    }

    /// A folder entry at `path`
    pub fn folder(path: RemotePath) -> Self {
        Self::new(path, FileKind::Folder, None)
    }

    fn new(path: RemotePath, kind: FileKind, size: Option<u64>) -> Self {
        let name = path.file_name().unwrap_or("/").to_string();
        Self {
            name,
            kind,
            path,
            size,
            created_at_time: None,
            last_modified_time: None,
            content_locator: None,
            mime_type: None,
        }
    }

    pub fn with_times(
        mut self,
        created: Option<DateTime<Utc>>,
        modified: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at_time = created;
        self.last_modified_time = modified;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// Does the name contain at least one keyword (case-insensitive)?
    pub fn matches_any<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        let name = self.name.to_lowercase();
        keywords
            .iter()
            .map(|k| k.as_ref().to_lowercase())
            .any(|k| !k.is_empty() && name.contains(&k))
    }
}

/// Sort key for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortBy {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "size")]
    Size,
    #[serde(rename = "modified")]
    Modified,
    #[serde(rename = "kind")]
    Kind,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// How a listing is ordered for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOrder {
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub folders_first: bool,
}

impl Default for ListOrder {
    fn default() -> Self {
        Self {
            sort_by: SortBy::Name,
            sort_order: SortOrder::Ascending,
            folders_first: true,
        }
    }
}

/// Sort entries for display
///
/// Stable, so entries that compare equal keep the provider's order.
pub fn sort_entries(entries: &mut [FileEntry], order: ListOrder) {
    entries.sort_by(|a, b| {
        if order.folders_first && a.kind != b.kind {
            return if a.is_folder() {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }

        let cmp = match order.sort_by {
            SortBy::Name => natural_sort_key(&a.name).cmp(&natural_sort_key(&b.name)),
            SortBy::Size => a.size.cmp(&b.size),
            SortBy::Modified => a.last_modified_time.cmp(&b.last_modified_time),
            SortBy::Kind => {
                let kind_cmp = (a.kind as u8).cmp(&(b.kind as u8));
                if kind_cmp == Ordering::Equal {
                    natural_sort_key(&a.name).cmp(&natural_sort_key(&b.name))
                } else {
                    kind_cmp
                }
            }
        };

        match order.sort_order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

/// Generate a natural sort key (handles numbers correctly)
/// "report2.pdf" < "report10.pdf"
fn natural_sort_key(s: &str) -> Vec<NaturalSortPart> {
    let mut parts = Vec::new();
    let mut current_num = String::new();
    let mut current_str = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            if !current_str.is_empty() {
                parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
                current_str.clear();
            }
            current_num.push(c);
        } else {
            if !current_num.is_empty() {
                if let Ok(n) = current_num.parse::<u64>() {
                    parts.push(NaturalSortPart::Num(n));
                }
                current_num.clear();
            }
            current_str.push(c);
        }
    }

    if !current_num.is_empty() {
        if let Ok(n) = current_num.parse::<u64>() {
            parts.push(NaturalSortPart::Num(n));
        }
    }
    if !current_str.is_empty() {
        parts.push(NaturalSortPart::Str(current_str.to_lowercase()));
    }

    parts
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NaturalSortPart {
    Num(u64),
    Str(String),
}
