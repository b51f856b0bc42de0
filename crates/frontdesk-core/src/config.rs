//! Application configuration management.
//!
//! This module handles loading and saving the front-desk configuration,
//! which includes the backend URL, the last used username and where the
//! session credential is kept.
//!
//! Configuration is stored at `~/.config/frontdesk/config.json`. The session
//! timing constants are deliberately not part of it.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::storage::{FileStore, KeyValueStore, KeyringStore, StorageError};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "frontdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when none is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8001/api";

/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "FRONTDESK_API_URL";

/// Environment variable overriding `last_username`
pub const USERNAME_ENV: &str = "FRONTDESK_USERNAME";

/// Where the session credential and activity record are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// A JSON file in the cache directory
    #[default]
    File,
    /// The OS keychain
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub last_username: Option<String>,
    #[serde(default)]
    pub storage: StorageBackend,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            last_username: None,
            storage: StorageBackend::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, StorageError> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply environment overrides on top of the file values
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(USERNAME_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, api_url: Option<String>, username: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(user) = username.filter(|u| !u.trim().is_empty()) {
            self.last_username = Some(user.trim().to_string());
        }
    }

    pub fn save(&self) -> Result<(), StorageError> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf, StorageError> {
        let config_dir = dirs::config_dir().ok_or(StorageError::NoStorageDir)?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf, StorageError> {
        let cache_dir = dirs::cache_dir().ok_or(StorageError::NoStorageDir)?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Open the configured session store
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>, StorageError> {
        Ok(match self.storage {
            StorageBackend::File => Arc::new(FileStore::new(self.cache_dir()?)?),
            StorageBackend::Keyring => Arc::new(KeyringStore::new()),
        })
    }
}
