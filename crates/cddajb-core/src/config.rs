//! Configuration management for cddajb.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location
//! and constructed once at startup, then handed to the store and cache.

use crate::error::{Result, StoreError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for cddajb.
///
/// ## Example Configuration File (cddajb.toml)
///
/// ```toml
/// [data]
/// root = "/srv/cdda"
/// sources = ["json", "mods"]
/// other_keys = ["components", "tools"]
///
/// [cache]
/// capacity = 128
///
/// [server]
/// bind_addr = "127.0.0.1:8080"
/// password = "hunter2"
///
/// [general]
/// log_level = "info"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the blobs live and how they are cross-referenced
    pub data: DataConfig,

    /// Read-through response cache
    pub cache: CacheConfig,

    /// HTTP backend settings
    pub server: ServerConfig,

    /// General settings
    pub general: GeneralConfig,
}

/// Data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root directory of the data tree
    pub root: PathBuf,

    /// Subdirectories of `root` that are scanned (empty = `root` itself)
    pub sources: Vec<String>,

    /// Keys whose values are treated as references to other ids
    pub other_keys: Vec<String>,

    /// File names that are never indexed
    pub excluded_files: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            root: PathBuf::from("."),
            sources: vec!["json".to_string(), "mods".to_string()],
            other_keys: vec!["components".to_string(), "tools".to_string()],
            excluded_files: vec!["modinfo.json".to_string()],
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached responses
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { capacity: 128 }
    }
}

/// HTTP backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,

    /// Shared secret required to trigger a rebuild (None = never allowed)
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            password: None,
        }
    }
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Build a configuration for a data root, defaults elsewhere.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let mut config = Config::default();
        config.data.root = root.into();
        config
    }

    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| StoreError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self)
            .map_err(|e| StoreError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "cddajb")
            .ok_or_else(|| StoreError::config("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("cddajb.toml"))
    }

    /// Check the values that would make the store unusable.
    pub fn validate(&self) -> Result<()> {
        if self.data.root.as_os_str().is_empty() {
            return Err(StoreError::config("data.root must not be empty"));
        }
        if self.cache.capacity == 0 {
            return Err(StoreError::config("cache.capacity must be at least 1"));
        }
        Ok(())
    }
}
