//! Monitor service
//!
//! Owns the engine, its dispatcher and the scheduler for one resolved
//! configuration, and carries state across configuration reloads.

use crate::config::Resolved;
use crate::engine::{
    Clock, CooldownGate, CycleReport, Dispatcher, Engine, Scheduler, StateStore, SystemClock,
    Watch,
};
use crate::error::{AppError, Result};
use crate::sinks::SinkRegistry;
use std::collections::HashSet;
use std::sync::Arc;

/// What changed in a reload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Targets that are new
    pub added: Vec<String>,
    /// Targets that went away; their state and cooldowns are dropped
    pub removed: Vec<String>,
    /// Targets present before and after
    pub kept: Vec<String>,
}

/// Long-running monitor over a set of watches
pub struct MonitorService {
    store: Arc<StateStore>,
    gate: Arc<CooldownGate>,
    clock: Arc<dyn Clock>,
    engine: Arc<Engine>,
    watches: Vec<Watch>,
    scheduler: Option<Scheduler>,
}

impl MonitorService {
    /// Build a service using the system clock
    pub fn new(resolved: Resolved) -> Result<Self> {
        Self::with_clock(resolved, Arc::new(SystemClock))
    }

    /// Build a service reading time from `clock`
    pub fn with_clock(resolved: Resolved, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = Arc::new(StateStore::new());
        let gate = Arc::new(CooldownGate::new());
        let Resolved {
            watches,
            sinks,
            failure_threshold,
            ..
        } = resolved;
        let engine = build_engine(sinks, failure_threshold, &store, &gate, &clock)?;

        Ok(Self {
            store,
            gate,
            clock,
            engine,
            watches,
            scheduler: None,
        })
    }

    /// Start polling
    ///
    /// # Errors
    /// `AppError::NoTargets` when nothing is configured, or
    /// `AppError::AlreadyRunning` when started twice
    pub fn start(&mut self) -> Result<()> {
        if self.scheduler.is_some() {
            return Err(AppError::AlreadyRunning);
        }
        if self.watches.is_empty() {
            return Err(AppError::NoTargets);
        }

        let mut scheduler = Scheduler::new(Arc::clone(&self.engine), self.watches.clone());
        scheduler.start()?;
        self.scheduler = Some(scheduler);
        Ok(())
    }

    /// Stop polling; safe to call repeatedly
    pub fn stop(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
    }

    /// Stop polling and flush pending notifications
    pub fn shutdown(&mut self) {
        self.stop();
        self.engine.dispatcher().shutdown();
    }

    /// Whether the scheduler is running
    pub fn is_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(Scheduler::is_running)
    }

    /// Run a single cycle over every watch on the calling thread
    pub fn run_once(&self) -> CycleReport {
        self.engine.run_cycle(&self.watches)
    }

    /// Swap in a new configuration
    ///
    /// Removed targets lose their classification and cooldown records;
    /// targets that stay keep both, so a reload does not re-announce
    /// conditions that were already alerted. The scheduler is restarted if
    /// it was running.
    pub fn reload(&mut self, resolved: Resolved) -> Result<ReloadSummary> {
        let was_running = self.scheduler.is_some();
        self.stop();

        let old: HashSet<&str> = self.watches.iter().map(Watch::key).collect();
        let new_keys: Vec<String> = resolved
            .watches
            .iter()
            .map(|w| w.key().to_string())
            .collect();

        let mut summary = ReloadSummary::default();
        for key in &new_keys {
            if old.contains(key.as_str()) {
                summary.kept.push(key.clone());
            } else {
                summary.added.push(key.clone());
            }
        }
        summary.removed = self
            .watches
            .iter()
            .map(|w| w.key().to_string())
            .filter(|key| !new_keys.contains(key))
            .collect();

        let dropped_states = self.store.retain_keys(&new_keys);
        let dropped_cooldowns = self.gate.forget_targets(&summary.removed);
        log::debug!(
            "Reload dropped {} state record(s) and {} cooldown record(s)",
            dropped_states,
            dropped_cooldowns
        );

        // Flush alerts queued for the old sinks before replacing them
        self.engine.dispatcher().shutdown();
        let Resolved {
            watches,
            sinks,
            failure_threshold,
            ..
        } = resolved;
        self.engine = build_engine(
            sinks,
            failure_threshold,
            &self.store,
            &self.gate,
            &self.clock,
        )?;
        self.watches = watches;

        log::info!(
            "Configuration reloaded: {} added, {} removed, {} kept",
            summary.added.len(),
            summary.removed.len(),
            summary.kept.len()
        );

        if was_running && !self.watches.is_empty() {
            self.start()?;
        } else if was_running {
            log::warn!("No enabled targets after reload; polling paused");
        }

        Ok(summary)
    }

    /// Current watches
    pub fn watches(&self) -> &[Watch] {
        &self.watches
    }

    /// Current engine
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Shared state store
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Shared cooldown gate
    pub fn gate(&self) -> &Arc<CooldownGate> {
        &self.gate
    }
}

impl Drop for MonitorService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_engine(
    sinks: SinkRegistry,
    failure_threshold: u32,
    store: &Arc<StateStore>,
    gate: &Arc<CooldownGate>,
    clock: &Arc<dyn Clock>,
) -> Result<Arc<Engine>> {
    let dispatcher = Arc::new(Dispatcher::new(sinks)?);
    let engine = Engine::new(dispatcher)
        .with_clock(Arc::clone(clock))
        .with_failure_threshold(failure_threshold)
        .with_shared_state(Arc::clone(store), Arc::clone(gate));
    Ok(Arc::new(engine))
}
