//! RemotePath - normalized absolute paths inside a drive

use crate::{FsError, Result};
use serde::{Deserialize, Serialize};

/// An absolute path inside a drive
///
/// Invariants:
/// - Always `/`-rooted
/// - Never contains `.` or `..` segments
/// - Never contains repeated separators
///
/// A trailing `/` typed by the user is kept, but it does not change which
/// folder the path names (see [`RemotePath::same_folder`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// The drive root
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Create a path from any string, treating it as absolute
    ///
    /// The empty string is the root, matching how a freshly created drive
    /// stores its working path.
    pub fn new(raw: &str) -> Self {
        Self::normalize(raw)
    }

    /// Resolve user input against this path
    ///
    /// - `""` and `"."` return this path unchanged
    /// - `..` pops one segment and is clamped at the root
    /// - a leading `/` discards this path
    /// - a trailing `/` on the input is kept on the result
    ///
    /// Input carrying a drive token (`name:`) is rejected; switching drives is
    /// the dispatcher's job.
    pub fn resolve(&self, input: &str) -> Result<Self> {
        if input.split('/').any(|segment| segment.ends_with(':')) {
            return Err(FsError::DriveToken(input.to_string()));
        }

        if input.is_empty() || input == "." {
            return Ok(self.clone());
        }

        let joined = if input.starts_with('/') {
            input.to_string()
        } else {
            format!("{}/{}", self.0, input)
        };

        let resolved = Self::normalize(&joined);
        if input.ends_with('/') {
            Ok(resolved)
        } else {
            Ok(resolved.without_trailing_slash())
        }
    }

    /// Get the path as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path without its trailing `/` (the root stays `/`)
    pub fn trimmed(&self) -> &str {
        if self.0.len() > 1 {
            self.0.trim_end_matches('/')
        } else {
            &self.0
        }
    }

    pub fn is_root(&self) -> bool {
        self.trimmed() == "/"
    }

    pub fn has_trailing_slash(&self) -> bool {
        self.0.len() > 1 && self.0.ends_with('/')
    }

    /// Do both paths name the same folder (ignoring a trailing `/`)?
    pub fn same_folder(&self, other: &RemotePath) -> bool {
        self.trimmed() == other.trimmed()
    }

    /// Iterate over the path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment, if this is not the root
    pub fn file_name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// Parent folder; the root is its own parent
    pub fn parent(&self) -> Self {
        let segments: Vec<&str> = self.segments().collect();
        match segments.split_last() {
            Some((_, rest)) => Self::from_segments(rest),
            None => Self::root(),
        }
    }

    /// Append a single entry name
    pub fn join(&self, name: &str) -> Self {
        Self::normalize(&format!("{}/{}", self.trimmed(), name))
    }

    /// Split into (parent folder, entry name)
    pub fn split_file(&self) -> (Self, Option<&str>) {
        (self.parent(), self.file_name())
    }

    /// The fragment of this path below `base`, compared segment by segment
    ///
    /// `/docs/a/b` relative to `/docs` is `a/b`; `/docsx/a` is not under
    /// `/docs` and yields `None`.
    pub fn relative_to(&self, base: &RemotePath) -> Option<String> {
        let base: Vec<&str> = base.segments().collect();
        let own: Vec<&str> = self.segments().collect();

        if own.len() < base.len() || own[..base.len()] != base[..] {
            return None;
        }

        Some(own[base.len()..].join("/"))
    }

    fn without_trailing_slash(self) -> Self {
        if self.has_trailing_slash() {
            Self(self.trimmed().to_string())
        } else {
            self
        }
    }

    fn from_segments(segments: &[&str]) -> Self {
        if segments.is_empty() {
            return Self::root();
        }
        let mut path = String::new();
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        Self(path)
    }

    fn normalize(raw: &str) -> Self {
        let mut stack: Vec<&str> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    stack.pop();
                }
                other => stack.push(other),
            }
        }

        let mut path = Self::from_segments(&stack);
        if !stack.is_empty() && raw.ends_with('/') {
            path.0.push('/');
        }
        path
    }
}

impl Default for RemotePath {
    fn default() -> Self {
        Self::root()
    }
}

impl From<String> for RemotePath {
    fn from(raw: String) -> Self {
        Self::normalize(&raw)
    }
}

impl From<&str> for RemotePath {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

impl AsRef<str> for RemotePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
