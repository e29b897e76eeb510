//! drivesh - one interactive shell over many storage drives
//!
//! Usage:
//!   drivesh              # Interactive shell
//!   drivesh --verbose    # Also mirror logs to stderr

mod render;
mod repl;

use anyhow::{Context, Result};
use app_core::{AppConfig, Session};
use std::process::ExitCode;

struct Args {
    verbose: bool,
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Some(args) => args,
        None => return ExitCode::SUCCESS,
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// `None` when the arguments asked for information and nothing else
fn parse_args() -> Option<Args> {
    let mut args = Args { verbose: false };
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--verbose" | "-v" => args.verbose = true,
            "--help" | "-h" => {
                println!("Usage: drivesh [--verbose]\n\n{}", render::HELP_TEXT);
                return None;
            }
            "--version" | "-V" => {
                println!("drivesh {}", env!("CARGO_PKG_VERSION"));
                return None;
            }
            other => eprintln!("Ignoring unknown argument {}", other),
        }
    }
    Some(args)
}

fn run(args: Args) -> Result<()> {
    // Logging and panic hook first
    let _log_guard = app_log::init(args.verbose)?;

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load configuration, using defaults: {}", e);
            AppConfig::default()
        }
    };

    match app_log::cleanup_old_logs(&app_log::log_dir(), config.general.log_retention_days) {
        Ok(removed) if removed > 0 => tracing::info!("Removed {} old log files", removed),
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to cleanup old logs: {}", e),
    }

    tracing::info!("drivesh {} starting", env!("CARGO_PKG_VERSION"));

    let db = app_db::init().context("Failed to open the state database")?;
    let session = Session::open(config, db)?;

    // One command at a time; adapters need no Send bounds
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    repl::run(session, &runtime)
}
