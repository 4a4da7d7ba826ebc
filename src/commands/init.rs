//! Init command implementation
//!
//! Writes the annotated starter configuration.

use crate::cli::args::OutputFormat;
use crate::cli::output::{print_output, Message};
use crate::config::Config;
use crate::error::{ConfigError, Result};
use std::fs;
use std::path::Path;

/// Execute the init command
pub fn run_init(path: Option<&Path>, force: bool, format: OutputFormat) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);
    write_template(&path, force)?;

    let msg = Message {
        message: format!("Configuration written to {}", path.display()),
        success: true,
    };
    print_output(&msg, format)?;

    Ok(())
}

fn write_template(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(ConfigError::InvalidValue {
            key: path.display().to_string(),
            message: "file already exists (use --force to overwrite)".into(),
        }
        .into());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, Config::default_template())?;
    log::info!("Wrote starter configuration to {}", path.display());

    Ok(())
}
