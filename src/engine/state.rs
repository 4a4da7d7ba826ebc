//! State store
//!
//! Holds the last classification and sampler-failure bookkeeping for every
//! target. This is the only state that survives between poll cycles.

use crate::domain::Severity;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

/// Per-target state carried across cycles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetState {
    /// Last good classification (None until the first successful sample)
    pub classification: Option<Severity>,
    /// Last good sample value
    pub last_value: Option<f64>,
    /// When the classification was last written
    pub classified_at: Option<SystemTime>,
    /// Sampler errors since the last success
    pub consecutive_failures: u32,
    /// Whether `source_unavailable` has been raised for the current failure streak
    pub unavailable: bool,
}

/// Shared, lock-protected map of target state
#[derive(Debug, Default)]
pub struct StateStore {
    states: Mutex<HashMap<String, TargetState>>,
}

impl StateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TargetState>> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run a read-modify-write on one target's state under the store lock
    pub fn transition<R>(&self, key: &str, f: impl FnOnce(&mut TargetState) -> R) -> R {
        let mut states = self.lock();
        let state = states.entry(key.to_string()).or_default();
        f(state)
    }

    /// Last known classification for a target
    pub fn classification(&self, key: &str) -> Option<Severity> {
        self.lock().get(key).and_then(|s| s.classification)
    }

    /// Copy of one target's state
    pub fn get(&self, key: &str) -> Option<TargetState> {
        self.lock().get(key).cloned()
    }

    /// Drop state for targets no longer configured
    pub fn retain_keys(&self, keep: &[String]) -> usize {
        let mut states = self.lock();
        let before = states.len();
        states.retain(|key, _| keep.contains(key));
        before - states.len()
    }

    /// Number of tracked targets
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no target has been observed yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
