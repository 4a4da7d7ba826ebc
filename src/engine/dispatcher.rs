//! Dispatcher
//!
//! Hands admitted alerts to a background worker so slow sinks never hold up
//! the poll cycle. Delivery failures are logged and counted, not retried.

use crate::domain::AlertEvent;
use crate::error::{AppError, SinkError};
use crate::sinks::SinkRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

struct Job {
    event: AlertEvent,
    route: Vec<String>,
}

/// Delivery counters
#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events handed to the worker
    pub queued: u64,
    /// Successful sink deliveries
    pub delivered: u64,
    /// Failed sink deliveries
    pub failed: u64,
}

/// Fire-and-forget alert dispatcher
pub struct Dispatcher {
    sender: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Start the delivery worker
    pub fn new(sinks: SinkRegistry) -> Result<Self, AppError> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let counters = Arc::new(Counters::default());
        let worker_counters = Arc::clone(&counters);

        let name = "edgewatch-dispatch".to_string();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                log::debug!("Dispatcher started with sinks {:?}", sinks.ids());
                // Ends once every sender is dropped and the queue is drained
                for job in receiver {
                    let outcome = sinks.deliver(&job.event, &job.route);
                    worker_counters
                        .delivered
                        .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
                    worker_counters
                        .failed
                        .fetch_add(outcome.failed as u64, Ordering::Relaxed);
                }
                log::debug!("Dispatcher stopped");
            })
            .map_err(|source| AppError::Spawn { name, source })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(handle)),
            counters,
        })
    }

    /// Queue an event for the routed sinks (empty route = all sinks)
    pub fn dispatch(&self, event: AlertEvent, route: &[String]) -> Result<(), SinkError> {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let sender = sender.as_ref().ok_or(SinkError::Closed)?;

        sender
            .send(Job {
                event,
                route: route.to_vec(),
            })
            .map_err(|_| SinkError::Closed)?;

        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Stop accepting events, drain the queue and join the worker
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(|e| e.into_inner()).take());

        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Dispatcher worker panicked");
            }
        }
    }

    /// Delivery counters so far
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
