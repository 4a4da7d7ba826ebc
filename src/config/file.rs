//! Configuration file loading
//!
//! Handles loading configuration from TOML files.

use crate::config::Config;
use crate::error::ConfigError;

use std::path::{Path, PathBuf};

/// Configuration file handler
pub struct ConfigFile;

impl ConfigFile {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;

        Config::from_toml(&content)
    }

    /// Load configuration from the first default location that exists
    ///
    /// A file that exists but does not parse is an error rather than being
    /// skipped in favour of the next location.
    pub fn load_default() -> Result<Option<(PathBuf, Config)>, ConfigError> {
        match Self::find_default() {
            Some(path) => {
                let config = Self::load(&path)?;
                log::info!("Loaded config from {}", path.display());
                Ok(Some((path, config)))
            }
            None => Ok(None),
        }
    }

    /// First default path that exists
    pub fn find_default() -> Option<PathBuf> {
        Self::default_paths().into_iter().find(|p| p.exists())
    }

    /// Get default configuration file paths, in search order
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // User config
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("edgewatch").join("config.toml"));
        }

        // System-wide config
        paths.push(PathBuf::from("/etc/edgewatch/config.toml"));

        // Current directory
        paths.push(PathBuf::from("edgewatch.toml"));

        paths
    }
}
