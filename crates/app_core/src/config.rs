//! Application configuration

use app_fs::{ListOrder, ProviderSettings, SortBy, SortOrder};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub server: ServerConfig,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Commands kept in the persisted prompt history
    pub history_limit: usize,
    pub log_retention_days: u32,
    /// `cat` opens downloaded files with the OS handler
    pub open_fetched: bool,
    pub banner: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            log_retention_days: 7,
            open_fetched: true,
            banner: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Default address offered when setting up an http drive
    pub address: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "https://dabbu-server.herokuapp.com".to_string(),
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub folders_first: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        let order = ListOrder::default();
        Self {
            sort_by: order.sort_by,
            sort_order: order.sort_order,
            folders_first: order.folders_first,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", "drivesh")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }

    pub fn list_order(&self) -> ListOrder {
        ListOrder {
            sort_by: self.listing.sort_by,
            sort_order: self.listing.sort_order,
            folders_first: self.listing.folders_first,
        }
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            default_server: self.server.address.clone(),
            request_timeout: Duration::from_secs(self.server.request_timeout_secs.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.general.history_limit, 20);
        assert!(config.listing.folders_first);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[listing]\nsort_by = \"size\"\nsort_order = \"desc\"\n\n[server]\nrequest_timeout_secs = 5\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.listing.sort_by, SortBy::Size);
        assert_eq!(config.list_order().sort_order, SortOrder::Descending);
        assert_eq!(config.provider_settings().request_timeout, Duration::from_secs(5));
        assert_eq!(config.server.address, ServerConfig::default().address);
        assert!(config.general.banner);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut config = AppConfig::default();
        config.general.history_limit = 50;
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().general.history_limit, 50);
    }
}
