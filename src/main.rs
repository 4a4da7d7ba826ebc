//! edgewatch - edge-triggered alerting for operational signals
//!
//! A command-line tool that polls disks, certificates, links and other
//! signals and raises deduplicated alerts when their severity changes.

use clap::Parser;
use edgewatch::cli::args::{generate_completions, Cli, Commands};
use edgewatch::commands::{run_check, run_init, run_monitor, run_once};
use edgewatch::error::{AppError, ConfigError};

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG still wins over the verbose flag
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();

    // Run the appropriate command
    let result = run(&cli);

    if let Err(e) = result {
        log::error!("{}", e);
        print_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Run(args) => run_monitor(args, config, cli.format),

        Commands::Once => run_once(config, cli.format),

        Commands::Check => run_check(config, cli.format),

        Commands::Init { force, path } => run_init(path.as_deref(), *force, cli.format),

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Config(ConfigError::FileNotFound(_)) => {
            eprintln!();
            eprintln!("Hint: Create a starter configuration with 'edgewatch init'.");
        }
        AppError::NoTargets => {
            eprintln!();
            eprintln!("Hint: Add a [[targets]] entry to the configuration file.");
            eprintln!("      Run 'edgewatch check' to see why targets were disabled.");
        }
        AppError::Config(ConfigError::TomlError(_)) => {
            eprintln!();
            eprintln!("Hint: 'edgewatch init --force <PATH>' writes an annotated example.");
        }
        _ => {}
    }
}
