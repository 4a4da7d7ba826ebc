//! Configuration builder
//!
//! Merges configuration from files and CLI arguments.

use crate::config::{Config, ConfigFile};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Builder for merging configuration sources
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
    source: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file, or from the default locations
    ///
    /// An explicit path must exist; a missing default file leaves the
    /// built-in defaults in place.
    pub fn with_file(mut self, path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                self.config = ConfigFile::load(path)?;
                self.source = Some(path.to_path_buf());
            }
            None => {
                if let Some((path, config)) = ConfigFile::load_default()? {
                    self.config = config;
                    self.source = Some(path);
                } else {
                    log::debug!("No config file found, using defaults");
                }
            }
        }
        Ok(self)
    }

    /// Use an already parsed configuration
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Override every target's interval with the CLI value
    pub fn with_interval(mut self, interval: Option<u64>) -> Self {
        if let Some(secs) = interval {
            self.config.settings.default_interval_secs = secs;
            for target in &mut self.config.targets {
                target.interval_secs = Some(secs);
            }
        }
        self
    }

    /// Override the failure threshold
    pub fn with_failure_threshold(mut self, threshold: Option<u32>) -> Self {
        if let Some(t) = threshold {
            self.config.settings.failure_threshold = t;
        }
        self
    }

    /// File the configuration came from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Build the final configuration
    pub fn build(self) -> Config {
        self.config
    }
}
