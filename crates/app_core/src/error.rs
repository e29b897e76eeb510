//! Application error types

use app_fs::{FsError, ProviderError};
use thiserror::Error;

/// Which half of a copy failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Fetch,
    Store,
    Delete,
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            TransferStage::Fetch => "download",
            TransferStage::Store => "upload",
            TransferStage::Delete => "delete",
        };
        f.write_str(stage)
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Registry =====
    #[error("Invalid drive name `{0}`: names cannot be empty or contain `:` or spaces")]
    InvalidName(String),

    #[error("A drive named {0} already exists")]
    DuplicateDrive(String),

    #[error("No drive named {0}")]
    UnknownDrive(String),

    // ===== Fatal (state reset required) =====
    #[error("No drive is usable; the saved drives will be discarded")]
    NoValidDrive,

    // ===== Dispatcher =====
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("No provider called {0}")]
    UnknownProvider(String),

    // ===== Clips =====
    #[error("No clip named {0}")]
    UnknownClip(String),

    #[error("Clip {0} has no files in it")]
    EmptyClip(String),

    // ===== Adapters (propagated unchanged) =====
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Could not {stage} {path}: {source}")]
    Transfer {
        stage: TransferStage,
        path: String,
        #[source]
        source: ProviderError,
    },

    // ===== Local =====
    #[error("{0}")]
    Path(#[from] FsError),

    #[error("State database error: {0}")]
    Db(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Only an empty drive table stops the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::NoValidDrive)
    }

    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }

    /// Would re-issuing the command plausibly succeed?
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Provider(e) => e.is_retryable(),
            AppError::Transfer { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::UnknownCommand(verb) => {
                format!("Unknown command `{}`. Type `help` to see what drivesh can do.", verb)
            }
            AppError::UnknownClip(name) => {
                format!("No clip named {}. Capture one with `ls | cp {}`.", name, name)
            }
            AppError::Path(FsError::DriveToken(input)) => format!(
                "{} names a drive inside a path; use `drive:` on its own to switch drives",
                input
            ),
            _ if self.is_retryable() => format!("{} (try again)", self),
            _ => self.to_string(),
        }
    }
}

impl From<app_db::DbError> for AppError {
    fn from(e: app_db::DbError) -> Self {
        AppError::Db(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
