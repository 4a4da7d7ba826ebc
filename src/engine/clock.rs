//! Wall-clock abstraction
//!
//! Cooldown windows and event timestamps read time through this trait so
//! tests can drive the engine with a manual clock.

use std::time::SystemTime;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> SystemTime;
}

/// Clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
