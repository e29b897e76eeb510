//! Provider adapters
//!
//! Every storage backend a drive can be bound to implements
//! [`ProviderAdapter`]. The shell never talks to a backend directly:
//!
//! ```text
//! Session (cd, ls, cp, pst, ...)
//!     ↓
//! &dyn ProviderAdapter
//!     ↓
//! ┌──────────────────────────────────────────────┐
//! │  Memory      │  HardDrive       │  Http       │
//! │  - in-process│  - local folder  │  - files API│
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The set of backends is closed: [`ProviderKind`] names them and
//! [`Provider`] holds a built adapter of any kind.

mod hard_drive;
mod http;
mod memory;

pub use hard_drive::HardDriveProvider;
pub use http::HttpProvider;
pub use memory::MemoryProvider;

use crate::{FileEntry, LocalHandle, RemotePath, Scratch};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Provider operation errors
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    // ===== Semantic (terminal for the command) =====
    #[error("No such file or folder: {0}")]
    NotFound(String),

    #[error("{0} is a folder")]
    IsAFolder(String),

    #[error("The provider refused the request: {0}")]
    Rejected(String),

    // ===== Transport (worth retrying) =====
    #[error("Network error: {0}")]
    Transport(String),

    // ===== Local =====
    #[error("Drive setup failed: {0}")]
    Setup(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Local I/O error: {0}")]
    Io(String),
}

impl ProviderError {
    /// Should the user simply re-issue the command?
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::Io(err.to_string())
    }
}

/// Provider-specific configuration stored on a drive
///
/// Tokens, server addresses, root folders: only the adapter that wrote it
/// knows what is inside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthState(serde_json::Value);

impl AuthState {
    pub fn empty() -> Self {
        Self(serde_json::Value::Null)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }

    /// Wrap a typed adapter configuration
    pub fn from_config<T: Serialize>(config: &T) -> ProviderResult<Self> {
        serde_json::to_value(config)
            .map(Self)
            .map_err(|e| ProviderError::Setup(e.to_string()))
    }

    /// Read back a typed adapter configuration
    pub fn to_config<T: DeserializeOwned>(&self) -> ProviderResult<T> {
        serde_json::from_value(self.0.clone())
            .map_err(|e| ProviderError::Setup(format!("drive configuration is corrupt: {}", e)))
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Interactive collaborator used while setting up a drive
pub trait Prompter {
    /// Ask a question; an empty answer yields `default` when one is given
    fn ask(&mut self, question: &str, default: Option<&str>) -> ProviderResult<String>;

    /// Show a message that needs no answer
    fn note(&mut self, message: &str);
}

/// Settings shared by every adapter, taken from the application config
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub default_server: String,
    pub request_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            default_server: "https://dabbu-server.herokuapp.com".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Capability contract every storage backend implements
///
/// Calls suspend the current command only; the shell runs one command at a
/// time on a single thread, so adapters need not be `Send`.
#[async_trait(?Send)]
pub trait ProviderAdapter {
    /// Identifier stored in the drive table
    fn id(&self) -> &str;

    /// Interactive or automated setup; returns the state to keep on the drive
    async fn initialize(
        &mut self,
        drive_name: &str,
        prompter: &mut dyn Prompter,
    ) -> ProviderResult<AuthState>;

    /// Direct children of `path`; an empty folder yields an empty vector
    async fn list(&self, path: &RemotePath) -> ProviderResult<Vec<FileEntry>>;

    /// Download `folder/file_name` into `scratch`
    async fn fetch(
        &self,
        folder: &RemotePath,
        file_name: &str,
        scratch: &Scratch,
    ) -> ProviderResult<LocalHandle>;

    /// Upload the local file to `folder/file_name`, creating folders as needed
    async fn store(&self, folder: &RemotePath, file_name: &str, local: &Path) -> ProviderResult<()>;

    /// Delete `folder/file_name`, or `folder` itself when no name is given
    async fn delete(&self, folder: &RemotePath, file_name: Option<&str>) -> ProviderResult<()>;
}

/// Known provider implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Memory,
    HardDrive,
    Http,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::HardDrive, ProviderKind::Http, ProviderKind::Memory];

    /// Identifier stored in the drive table
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Memory => "memory",
            ProviderKind::HardDrive => "hard_drive",
            ProviderKind::Http => "http",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProviderKind::Memory => "scratch drive kept in memory for this session",
            ProviderKind::HardDrive => "a folder on this computer",
            ProviderKind::Http => "a remote provider behind a files API server",
        }
    }

    /// Is `id` one of the known providers?
    pub fn is_known(id: &str) -> bool {
        id.parse::<ProviderKind>().is_ok()
    }

    /// A fresh adapter that still needs [`ProviderAdapter::initialize`]
    pub fn unconfigured(&self, settings: &ProviderSettings) -> Provider {
        match self {
            ProviderKind::Memory => Provider::Memory(MemoryProvider::new()),
            ProviderKind::HardDrive => Provider::HardDrive(HardDriveProvider::unconfigured()),
            ProviderKind::Http => Provider::Http(HttpProvider::unconfigured(settings)),
        }
    }

    /// Rebuild an adapter from the state stored on a drive
    pub fn build(&self, auth: &AuthState, settings: &ProviderSettings) -> ProviderResult<Provider> {
        Ok(match self {
            ProviderKind::Memory => Provider::Memory(MemoryProvider::new()),
            ProviderKind::HardDrive => Provider::HardDrive(HardDriveProvider::from_auth(auth)?),
            ProviderKind::Http => Provider::Http(HttpProvider::from_auth(auth, settings)?),
        })
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(' ', "_").to_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.id() == normalized)
            .ok_or_else(|| ProviderError::Setup(format!("unknown provider `{}`", s)))
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A built adapter of any known kind
pub enum Provider {
    Memory(MemoryProvider),
    HardDrive(HardDriveProvider),
    Http(HttpProvider),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Memory(_) => ProviderKind::Memory,
            Provider::HardDrive(_) => ProviderKind::HardDrive,
            Provider::Http(_) => ProviderKind::Http,
        }
    }

    fn adapter(&self) -> &dyn ProviderAdapter {
        match self {
            Provider::Memory(p) => p,
            Provider::HardDrive(p) => p,
            Provider::Http(p) => p,
        }
    }

    fn adapter_mut(&mut self) -> &mut dyn ProviderAdapter {
        match self {
            Provider::Memory(p) => p,
            Provider::HardDrive(p) => p,
            Provider::Http(p) => p,
        }
    }
}

#[async_trait(?Send)]
impl ProviderAdapter for Provider {
    fn id(&self) -> &str {
        self.kind().id()
    }

    async fn initialize(
        &mut self,
        drive_name: &str,
        prompter: &mut dyn Prompter,
    ) -> ProviderResult<AuthState> {
        self.adapter_mut().initialize(drive_name, prompter).await
    }

    async fn list(&self, path: &RemotePath) -> ProviderResult<Vec<FileEntry>> {
        self.adapter().list(path).await
    }

    async fn fetch(
        &self,
        folder: &RemotePath,
        file_name: &str,
        scratch: &Scratch,
    ) -> ProviderResult<LocalHandle> {
        self.adapter().fetch(folder, file_name, scratch).await
    }

    async fn store(&self, folder: &RemotePath, file_name: &str, local: &Path) -> ProviderResult<()> {
        self.adapter().store(folder, file_name, local).await
    }

    async fn delete(&self, folder: &RemotePath, file_name: Option<&str>) -> ProviderResult<()> {
        self.adapter().delete(folder, file_name).await
    }
}
