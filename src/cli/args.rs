//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Edge-triggered, cooldown-gated alerting for operational signals
///
/// Polls configured targets, classifies each sample against threshold
/// rules and notifies sinks when a target changes severity.
#[derive(Parser, Debug)]
#[command(name = "edgewatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "EDGEWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll targets until interrupted
    Run(RunArgs),

    /// Run a single poll cycle and print what happened
    Once,

    /// Validate the configuration and list targets
    Check,

    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,

        /// Where to write (defaults to the user config directory)
        path: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Poll every target at this interval in seconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=86400))]
    pub interval: Option<u64>,

    /// Consecutive sampling failures before a source_unavailable alert
    #[arg(long)]
    pub failure_threshold: Option<u32>,

    /// Reload when the configuration file changes
    #[arg(long)]
    pub watch_config: bool,

    /// Seconds between configuration file checks
    #[arg(long, default_value = "5")]
    pub watch_interval: u64,
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
