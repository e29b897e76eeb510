//! Drive registry
//!
//! The set of configured drives plus the name of the active one. Loaded once
//! at session start; the session flushes it after every mutation.

use crate::error::{AppError, Result};
use app_db::DriveRecord;
use app_fs::{AuthState, RemotePath};

/// A named binding of a provider plus a working path
#[derive(Debug, Clone, PartialEq)]
pub struct Drive {
    pub name: String,
    /// `None` only for damaged persisted rows
    pub provider: Option<String>,
    pub path: RemotePath,
    pub auth: AuthState,
}

impl Drive {
    pub fn provider_id(&self) -> Option<&str> {
        self.provider.as_deref().filter(|p| !p.is_empty())
    }

    pub fn has_provider(&self) -> bool {
        self.provider_id().is_some()
    }
}

impl From<DriveRecord> for Drive {
    fn from(record: DriveRecord) -> Self {
        Self {
            name: record.name,
            provider: record.provider,
            path: record.path,
            auth: record.auth,
        }
    }
}

impl From<&Drive> for DriveRecord {
    fn from(drive: &Drive) -> Self {
        Self {
            name: drive.name.clone(),
            provider: drive.provider.clone(),
            path: drive.path.clone(),
            auth: drive.auth.clone(),
        }
    }
}

/// What `repair` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// The active drive was already usable
    Unchanged,
    /// The active drive was replaced by `to`
    Switched { from: Option<String>, to: String },
}

/// Configured drives in registration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    drives: Vec<Drive>,
    active: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted rows; the active name is not checked here
    pub fn from_records(records: Vec<DriveRecord>, active: Option<String>) -> Self {
        Self {
            drives: records.into_iter().map(Drive::from).collect(),
            active,
        }
    }

    pub fn to_records(&self) -> Vec<DriveRecord> {
        self.drives.iter().map(DriveRecord::from).collect()
    }

    /// Reject empty names and names containing `:` or whitespace
    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() || name.contains(':') || name.chars().any(char::is_whitespace) {
            return Err(AppError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// Turn a typed answer into a drive name: spaces become `_`, colons vanish
    pub fn normalize_name(raw: &str) -> String {
        raw.trim()
            .chars()
            .filter(|c| *c != ':')
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect()
    }

    /// Register a new drive at the root and make it active
    pub fn create(&mut self, name: &str, provider_id: &str) -> Result<&Drive> {
        Self::validate_name(name)?;
        if self.contains(name) {
            return Err(AppError::DuplicateDrive(name.to_string()));
        }

        self.drives.push(Drive {
            name: name.to_string(),
            provider: Some(provider_id.to_string()),
            path: RemotePath::new(""),
            auth: AuthState::empty(),
        });
        self.active = Some(name.to_string());
        tracing::info!("Created drive {} ({})", name, provider_id);
        Ok(&self.drives[self.drives.len() - 1])
    }

    pub fn switch(&mut self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(AppError::UnknownDrive(name.to_string()));
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Drive> {
        self.drives
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| AppError::UnknownDrive(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Drive> {
        self.drives
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| AppError::UnknownDrive(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.drives.iter().any(|d| d.name == name)
    }

    pub fn drives(&self) -> &[Drive] {
        &self.drives
    }

    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The active drive, if it exists and has a provider
    pub fn active(&self) -> Option<&Drive> {
        let name = self.active.as_deref()?;
        self.drives
            .iter()
            .find(|d| d.name == name)
            .filter(|d| d.has_provider())
    }

    /// Make sure the active drive is usable, substituting the first usable one
    pub fn repair(&mut self) -> Result<Repair> {
        self.repair_with(|_| true)
    }

    /// As [`Registry::repair`], with an extra condition a drive must meet
    pub fn repair_with<F>(&mut self, usable: F) -> Result<Repair>
    where
        F: Fn(&Drive) -> bool,
    {
        let is_usable = |d: &Drive| d.has_provider() && usable(d);

        if self.active().map_or(false, |d| is_usable(d)) {
            return Ok(Repair::Unchanged);
        }

        let substitute = self
            .drives
            .iter()
            .find(|d| is_usable(*d))
            .map(|d| d.name.clone())
            .ok_or(AppError::NoValidDrive)?;

        let from = self.active.replace(substitute.clone());
        tracing::warn!("Active drive {:?} is unusable, switched to {}", from, substitute);
        Ok(Repair::Switched { from, to: substitute })
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.drives.clear();
        self.active = None;
    }
}
