//! edgewatch - edge-triggered, cooldown-gated notification engine
//!
//! This library polls operational signals, classifies each sample against
//! per-target threshold rules, and notifies sinks only when a target changes
//! severity, holding back repeats with per-kind cooldown windows.
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers
//! - [`config`]: Configuration system
//! - [`domain`]: Domain models with validation
//! - [`engine`]: State store, evaluator, cooldown gate, dispatcher and scheduler
//! - [`error`]: Error types
//! - [`services`]: Service lifecycle
//! - [`sinks`]: Notification sinks
//! - [`sources`]: Data sources

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod services;
pub mod sinks;
pub mod sources;

#[cfg(test)]
pub mod mock;

pub use error::{AppError, Result};
