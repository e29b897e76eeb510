//! drivesh state database
//!
//! SQLite file holding everything the shell remembers between sessions:
//! - drive registry and the active drive
//! - named clips
//! - prompt history

mod pool;
mod schema;
mod state;

pub use pool::DbPool;
pub use schema::migrate;
pub use state::{ClipRecord, DriveRecord, StateDb};

use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Get the database directory
pub fn db_dir() -> PathBuf {
    ProjectDirs::from("", "", "drivesh")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Open (and migrate) the state database at `path`
pub fn open(path: &Path) -> Result<StateDb> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let pool = pool::init_pool(path)?;
    migrate(&pool)?;
    Ok(StateDb::new(pool))
}

/// Open the state database in the default location
pub fn init() -> Result<StateDb> {
    let path = db_dir().join("state.db");
    let db = open(&path)?;
    tracing::info!("State database at {:?}", path);
    Ok(db)
}
