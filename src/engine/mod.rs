//! Notification engine
//!
//! Sampling, edge-triggered evaluation, cooldown gating, dispatch and the
//! scheduler that drives them.

pub mod clock;
pub mod cooldown;
pub mod dispatcher;
pub mod evaluator;
pub mod pipeline;
pub mod scheduler;
pub mod state;

pub use clock::{Clock, SystemClock};
pub use cooldown::CooldownGate;
pub use dispatcher::{DispatchStats, Dispatcher};
pub use evaluator::{evaluate, transition, Evaluation};
pub use pipeline::{CycleReport, Engine, Outcome, TargetReport, Watch};
pub use scheduler::{Scheduler, SchedulerStats, StopSignal};
pub use state::{StateStore, TargetState};
