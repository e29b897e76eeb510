//! drivesh logging & crash reporting
//!
//! The prompt owns the terminal, so logs go to a daily JSON file; `--verbose`
//! mirrors them to stderr.

mod logging;
mod panic_hook;

pub use logging::{cleanup_old_logs, init_logging, LogGuard};
pub use panic_hook::init_panic_hook;

use directories::ProjectDirs;
use std::path::PathBuf;

/// File name prefix of the rolling log
pub const LOG_FILE_PREFIX: &str = "drivesh.log";

/// Get the application log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("", "", "drivesh")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize all observability features
///
/// Keep the returned guard alive until exit, or buffered lines are lost.
pub fn init(verbose: bool) -> anyhow::Result<LogGuard> {
    let guard = init_logging(&log_dir(), verbose)?;
    init_panic_hook();
    Ok(guard)
}
