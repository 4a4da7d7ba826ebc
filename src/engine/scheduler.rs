//! Scheduler
//!
//! Drives poll cycles. Watches sharing a poll interval share one thread, so
//! a target is always sampled by the same thread and cycles for it never
//! overlap. The first cycle runs immediately; ticks missed while a cycle
//! overran are skipped rather than queued.

use super::pipeline::{Engine, Watch};
use crate::error::{AppError, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Smallest interval a group may run at
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Cooperative cancellation flag that sleeping threads can wait on
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    /// Create a signal in the running state
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.stopped.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Request a stop and wake every waiter
    pub fn stop(&self) {
        *self.lock() = true;
        self.wake.notify_all();
    }

    /// Return to the running state
    pub fn reset(&self) {
        *self.lock() = false;
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        *self.lock()
    }

    /// Sleep until `deadline`; returns true if stopped meanwhile
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.lock();
        loop {
            if *stopped {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .wake
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            stopped = guard;
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    skipped: AtomicU64,
}

/// Scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Cycles completed across all groups
    pub cycles: u64,
    /// Ticks skipped because a cycle overran its interval
    pub skipped: u64,
}

/// Periodic driver for a set of watches
pub struct Scheduler {
    engine: Arc<Engine>,
    groups: Vec<(Duration, Arc<Vec<Watch>>)>,
    signal: Arc<StopSignal>,
    handles: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl Scheduler {
    /// Group watches by poll interval
    pub fn new(engine: Arc<Engine>, watches: Vec<Watch>) -> Self {
        let mut grouped: BTreeMap<Duration, Vec<Watch>> = BTreeMap::new();
        for watch in watches {
            let interval = watch.interval.max(MIN_INTERVAL);
            grouped.entry(interval).or_default().push(watch);
        }

        Self {
            engine,
            groups: grouped
                .into_iter()
                .map(|(interval, watches)| (interval, Arc::new(watches)))
                .collect(),
            signal: Arc::new(StopSignal::new()),
            handles: Vec::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Interval groups and their sizes
    pub fn groups(&self) -> Vec<(Duration, usize)> {
        self.groups
            .iter()
            .map(|(interval, watches)| (*interval, watches.len()))
            .collect()
    }

    /// Spawn one polling thread per interval group
    ///
    /// # Errors
    /// `AppError::AlreadyRunning` if started twice, or a spawn failure
    pub fn start(&mut self) -> Result<()> {
        if !self.handles.is_empty() {
            return Err(AppError::AlreadyRunning);
        }

        // A previous stop() leaves the signal set; every thread has been joined
        self.signal.reset();

        for (interval, watches) in &self.groups {
            let engine = Arc::clone(&self.engine);
            let watches = Arc::clone(watches);
            let signal = Arc::clone(&self.signal);
            let counters = Arc::clone(&self.counters);
            let interval = *interval;

            let name = format!("edgewatch-poll-{}ms", interval.as_millis());
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_group(engine, watches, interval, signal, counters));

            match spawned {
                Ok(handle) => self.handles.push(handle),
                Err(source) => {
                    self.stop();
                    return Err(AppError::Spawn { name, source });
                }
            }
        }

        log::info!(
            "Scheduler started: {} group(s), {} target(s)",
            self.groups.len(),
            self.groups.iter().map(|(_, w)| w.len()).sum::<usize>()
        );
        Ok(())
    }

    /// Stop all groups
    ///
    /// No cycle begins after this returns; cycles already running are
    /// allowed to finish first. Calling it again is a no-op.
    pub fn stop(&mut self) {
        self.signal.stop();

        if self.handles.is_empty() {
            return;
        }

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("Polling thread panicked");
            }
        }
        log::info!("Scheduler stopped");
    }

    /// Handle that other threads can use to request a stop
    ///
    /// The handle stays valid across restarts. A stop requested through it
    /// ends the polling threads; `stop` still has to be called to join them.
    pub fn stop_signal(&self) -> Arc<StopSignal> {
        Arc::clone(&self.signal)
    }

    /// Whether polling threads are running
    pub fn is_running(&self) -> bool {
        !self.handles.is_empty() && !self.signal.is_stopped()
    }

    /// Counters so far
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            cycles: self.counters.cycles.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_group(
    engine: Arc<Engine>,
    watches: Arc<Vec<Watch>>,
    interval: Duration,
    signal: Arc<StopSignal>,
    counters: Arc<Counters>,
) {
    log::debug!("Polling {} target(s) every {:?}", watches.len(), interval);
    let mut deadline = Instant::now();

    loop {
        if signal.is_stopped() {
            break;
        }

        let report = engine.run_cycle(&watches);
        counters.cycles.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "Cycle done ({:?}): {} admitted, {} suppressed, {} failed",
            interval,
            report.admitted().count(),
            report.suppressed().count(),
            report.failures()
        );

        deadline += interval;
        let now = Instant::now();
        if now > deadline {
            let behind = now - deadline;
            let missed = (behind.as_nanos() / interval.as_nanos()) as u32 + 1;
            deadline += interval * missed;
            counters
                .skipped
                .fetch_add(u64::from(missed), Ordering::Relaxed);
            log::warn!(
                "Cycle for {:?} group overran by {:?}; skipping {} tick(s)",
                interval,
                behind,
                missed
            );
        }

        if signal.wait_until(deadline) {
            break;
        }
    }

    log::debug!("Polling group {:?} exited", interval);
}
