//! Run command implementation
//!
//! Polls every configured target until Ctrl+C, optionally reloading when
//! the configuration file changes.

use super::load_config;
use crate::cli::args::{OutputFormat, RunArgs};
use crate::cli::output::{print_output, Message};
use crate::config::{resolve, Config, ConfigBuilder};
use crate::error::Result;
use crate::services::MonitorService;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, SystemTime};

/// How long to block waiting for Ctrl+C when not watching the config
const IDLE_WAIT: Duration = Duration::from_secs(3600);

/// Execute the run command
pub fn run_monitor(args: &RunArgs, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let (source, config) = load_config(config_path)?;
    let config = apply_overrides(config, args);

    let resolved = resolve(&config);
    log::info!(
        "Starting monitor: {} target(s), {} sink(s)",
        resolved.watches.len(),
        resolved.sinks.len()
    );
    if !resolved.errors.is_empty() {
        log::warn!(
            "{} configuration problem(s); affected targets are disabled",
            resolved.errors.len()
        );
    }

    let mut service = MonitorService::new(resolved)?;
    service.start()?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    let mut watcher = match (&source, args.watch_config) {
        (Some(path), true) => {
            log::info!("Watching {} for changes", path.display());
            Some(ConfigWatcher::new(path.clone()))
        }
        (None, true) => {
            log::warn!("--watch-config given but no configuration file is in use");
            None
        }
        (_, false) => None,
    };

    let wait = if watcher.is_some() {
        Duration::from_secs(args.watch_interval.max(1))
    } else {
        IDLE_WAIT
    };

    loop {
        match rx.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(watcher) = watcher.as_mut() {
            if watcher.changed() {
                reload(&mut service, watcher.path(), args);
            }
        }
    }

    log::info!("Shutting down");
    service.shutdown();

    let msg = Message {
        message: "Monitor stopped".to_string(),
        success: true,
    };
    print_output(&msg, format)?;

    Ok(())
}

fn apply_overrides(config: Config, args: &RunArgs) -> Config {
    ConfigBuilder::new()
        .with_config(config)
        .with_interval(args.interval)
        .with_failure_threshold(args.failure_threshold)
        .build()
}

/// Re-read the file and swap it in; a broken file keeps the old config
fn reload(service: &mut MonitorService, path: &Path, args: &RunArgs) {
    let config = match load_config(Some(path)) {
        Ok((_, config)) => apply_overrides(config, args),
        Err(e) => {
            log::error!("Not reloading, keeping current configuration: {}", e);
            return;
        }
    };

    if let Err(e) = service.reload(resolve(&config)) {
        log::error!("Reload failed: {}", e);
    }
}

/// Detects changes to a file by modification time and size
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    stamp: Option<(SystemTime, u64)>,
}

impl ConfigWatcher {
    /// Start watching `path` from its current state
    pub fn new(path: PathBuf) -> Self {
        let stamp = Self::stamp(&path);
        Self { path, stamp }
    }

    /// Watched file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file changed since the last call
    pub fn changed(&mut self) -> bool {
        let current = Self::stamp(&self.path);
        if current.is_none() {
            // Editors often replace files; wait until it reappears
            return false;
        }
        if current != self.stamp {
            self.stamp = current;
            return true;
        }
        false
    }

    fn stamp(path: &Path) -> Option<(SystemTime, u64)> {
        let meta = fs::metadata(path).ok()?;
        Some((meta.modified().ok()?, meta.len()))
    }
}
