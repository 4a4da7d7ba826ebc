//! Once command implementation
//!
//! Runs a single poll cycle and prints the classification of each target.

use super::load_config;
use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, CycleSummary};
use crate::config::resolve;
use crate::error::{AppError, Result};
use crate::services::MonitorService;
use std::path::Path;

/// Execute the once command
pub fn run_once(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let summary = poll_once(config_path)?;
    print_output(&summary, format)?;
    Ok(())
}

/// Poll every target once and flush any notifications
fn poll_once(config_path: Option<&Path>) -> Result<CycleSummary> {
    let (_, config) = load_config(config_path)?;
    let resolved = resolve(&config);
    if resolved.watches.is_empty() {
        return Err(AppError::NoTargets);
    }

    let mut service = MonitorService::new(resolved)?;
    let report = service.run_once();
    service.shutdown();

    Ok(CycleSummary::from(&report))
}
