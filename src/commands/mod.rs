//! Command handlers
//!
//! Each command handler orchestrates the execution of a CLI command.

pub mod check;
pub mod init;
pub mod once;
pub mod run;

pub use check::run_check;
pub use init::run_init;
pub use once::run_once;
pub use run::run_monitor;

use crate::config::{Config, ConfigBuilder};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Load the configuration named on the command line, or the default one
///
/// Returns the file it came from alongside the parsed configuration.
pub(crate) fn load_config(path: Option<&Path>) -> Result<(Option<PathBuf>, Config)> {
    let builder = ConfigBuilder::new().with_file(path)?;
    let source = builder.source().map(Path::to_path_buf);
    Ok((source, builder.build()))
}
