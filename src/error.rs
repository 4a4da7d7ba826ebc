//! Unified error types for edgewatch
//!
//! This module defines all error types used throughout the engine.
//! Uses thiserror for ergonomic error definitions.

use std::time::Duration;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from threshold rule validation
    #[error("Rule validation error: {0}")]
    Rule(#[from] RuleError),

    /// Error obtaining a sample from a data source
    #[error("Sampling error: {0}")]
    Sample(#[from] SampleError),

    /// Error delivering a notification
    #[error("Notification error: {0}")]
    Sink(#[from] SinkError),

    /// No enabled targets survived configuration resolution
    #[error("No enabled monitor targets configured")]
    NoTargets,

    /// The scheduler is already running
    #[error("Scheduler is already running")]
    AlreadyRunning,

    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to install the Ctrl+C handler
    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from threshold rule validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// Rules may not target the implicit NORMAL level
    #[error("Rules cannot target NORMAL severity (it is implied when no rule matches)")]
    NormalSeverity,

    /// Boundary value is NaN or infinite
    #[error("Threshold boundary must be finite, got {0}")]
    NonFiniteBoundary(f64),

    /// Range with min above max
    #[error("Invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: f64, max: f64 },

    /// Unknown severity name
    #[error("Unknown severity level: {0}")]
    UnknownSeverity(String),
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Two targets share the same key
    #[error("Duplicate target key: {0}")]
    DuplicateTarget(String),

    /// Target references a sink that is not defined
    #[error("Target '{target}' references unknown sink '{sink}'")]
    UnknownSink { target: String, sink: String },

    /// Invalid threshold rule inside a target
    #[error("Invalid rule for target '{target}': {source}")]
    InvalidRule {
        target: String,
        #[source]
        source: RuleError,
    },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}

/// Errors returned by data sources
#[derive(Error, Debug)]
pub enum SampleError {
    /// External program could not be found
    #[error("Program not found: {0}")]
    NotFound(String),

    /// External program exited unsuccessfully
    #[error("'{program}' exited with status {code:?}")]
    ExitStatus { program: String, code: Option<i32> },

    /// External program exceeded its time budget
    #[error("'{program}' timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    /// Output could not be interpreted as a sample
    #[error("Malformed sample output: {0}")]
    Malformed(String),

    /// The data source panicked while sampling
    #[error("Data source panicked: {0}")]
    Panicked(String),

    /// IO error while reading the source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by notification sinks
#[derive(Error, Debug)]
pub enum SinkError {
    /// HTTP delivery failed
    #[error("Webhook delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Hook command exited unsuccessfully
    #[error("'{program}' exited with status {code:?}")]
    Command { program: String, code: Option<i32> },

    /// The dispatcher worker is gone
    #[error("Dispatcher is shut down")]
    Closed,

    /// IO error while writing or spawning
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
