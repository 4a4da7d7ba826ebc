//! Cooldown gate
//!
//! Suppresses repeated dispatch of the same alert key within a window.
//! Records live in memory only; a restart resets every window.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

/// Last admission of one alert key
#[derive(Debug, Clone)]
struct Record {
    target: String,
    fired_at: SystemTime,
}

/// Last admission time per alert key
#[derive(Debug, Default)]
pub struct CooldownGate {
    last_fired: Mutex<HashMap<String, Record>>,
}

impl CooldownGate {
    /// Create an empty gate
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Record>> {
        self.last_fired.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Decide whether `key`, owned by `target`, may fire at `now`
    ///
    /// Admits when there is no record or the window has fully elapsed, and
    /// records `now` on admission. A suppressed call leaves the record as is,
    /// so frequent retries never stretch the window.
    pub fn admit(&self, target: &str, key: &str, now: SystemTime, cooldown: Duration) -> bool {
        let mut records = self.lock();

        if let Some(last) = records.get(key) {
            // A clock stepping backwards counts as zero elapsed time
            let elapsed = now.duration_since(last.fired_at).unwrap_or(Duration::ZERO);
            if elapsed < cooldown {
                return false;
            }
        }

        records.insert(
            key.to_string(),
            Record {
                target: target.to_string(),
                fired_at: now,
            },
        );
        true
    }

    /// When `key` last fired
    pub fn last_fired(&self, key: &str) -> Option<SystemTime> {
        self.lock().get(key).map(|r| r.fired_at)
    }

    /// Drop every record owned by one of the removed targets
    pub fn forget_targets(&self, removed: &[String]) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| !removed.contains(&record.target));
        before - records.len()
    }

    /// Forget every record
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has fired yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
