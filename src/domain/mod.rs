//! Domain types for the notification engine
//!
//! This module contains validated types for severities, threshold rules,
//! samples, alert events and monitor targets.

pub mod alert;
pub mod rule;
pub mod sample;
pub mod severity;
pub mod target;

pub use alert::{AlertEvent, AlertKind};
pub use rule::{Condition, ThresholdRule, ThresholdRuleSet};
pub use sample::Sample;
pub use severity::Severity;
pub use target::{CooldownPolicy, MonitorTarget};
