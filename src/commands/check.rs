//! Check command implementation
//!
//! Validates the configuration and lists the targets that would run.

use super::load_config;
use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, CheckReport};
use crate::config::resolve;
use crate::error::{ConfigError, Result};
use std::path::Path;

/// Execute the check command
pub fn run_check(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let report = check(config_path)?;
    print_output(&report, format)?;

    if report.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: report.config.unwrap_or_else(|| "config".into()),
            message: format!("{} problem(s) found", report.errors.len()),
        }
        .into())
    }
}

fn check(config_path: Option<&Path>) -> Result<CheckReport> {
    let (source, config) = load_config(config_path)?;
    let resolved = resolve(&config);
    Ok(CheckReport::new(
        source.map(|p| p.display().to_string()),
        &resolved,
    ))
}
