//! drivesh file system abstraction layer
//!
//! Provides a uniform view over every storage backend a drive can be bound to:
//! - RemotePath: normalized absolute paths and relative path resolution
//! - FileEntry: listing entries returned by providers
//! - Scratch: session-scoped local storage for fetched files
//! - Provider adapters: the capability contract and its backends

mod remote_path;
mod entry;
mod sanitize;
mod scratch;
pub mod provider;

pub use remote_path::RemotePath;
pub use entry::{FileEntry, FileKind, ListOrder, SortBy, SortOrder, sort_entries};
pub use sanitize::sanitize_filename;
pub use scratch::{LocalHandle, Scratch};
pub use provider::{
    AuthState, HardDriveProvider, HttpProvider, MemoryProvider, Prompter, Provider,
    ProviderAdapter, ProviderError, ProviderKind, ProviderResult, ProviderSettings,
};

use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Drive names cannot appear inside a path: {0}")]
    DriveToken(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, FsError>;
