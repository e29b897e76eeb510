//! drivesh core domain logic
//!
//! This crate contains:
//! - Command parsing
//! - The drive registry and clips
//! - Recursive traversal, copying and pasting
//! - Configuration
//! - Error types
//! - The session that executes commands

pub mod clip;
pub mod command;
pub mod config;
pub mod error;
pub mod registry;
pub mod session;
pub mod transfer;
pub mod traverse;

#[cfg(test)]
mod testing;

pub use clip::{Clip, ClipStore, DEFAULT_CLIP};
pub use command::{parse, split_drive, Capture, Command, Invocation};
pub use config::{AppConfig, GeneralConfig, ListingConfig, ServerConfig};
pub use error::{AppError, Result, TransferStage};
pub use registry::{Drive, Registry, Repair};
pub use session::{ListingKind, Outcome, Session, StartupNotice};
pub use transfer::PasteReport;
