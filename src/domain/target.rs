//! Monitor targets and their cooldown policy

use super::alert::AlertKind;
use super::rule::ThresholdRuleSet;
use std::collections::HashMap;
use std::time::Duration;

/// Per-target cooldown configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooldownPolicy {
    /// Cooldown by alert kind name (`entered_warning`, `handshake_failed`, ...)
    per_kind: HashMap<String, Duration>,
    /// Fallback for kinds without an explicit entry
    default: Duration,
    /// Whether recovery-class alerts go through the gate
    gate_recovery: bool,
}

impl CooldownPolicy {
    /// Policy with a fallback window and no per-kind overrides
    pub fn new(default: Duration) -> Self {
        Self {
            per_kind: HashMap::new(),
            default,
            gate_recovery: false,
        }
    }

    /// Set the window for one alert kind
    pub fn with_cooldown(mut self, kind: impl Into<String>, window: Duration) -> Self {
        self.per_kind.insert(kind.into(), window);
        self
    }

    /// Route recovery-class alerts through the gate too
    pub fn gating_recovery(mut self, gate: bool) -> Self {
        self.gate_recovery = gate;
        self
    }

    /// Window for a kind, or `None` when the kind bypasses the gate
    pub fn cooldown_for(&self, kind: &AlertKind) -> Option<Duration> {
        if kind.is_recovery() && !self.gate_recovery {
            return None;
        }
        Some(
            self.per_kind
                .get(&kind.to_string())
                .copied()
                .unwrap_or(self.default),
        )
    }

    /// Whether recovery-class alerts are gated
    pub fn gates_recovery(&self) -> bool {
        self.gate_recovery
    }

    /// Fallback window
    pub fn default_window(&self) -> Duration {
        self.default
    }

    /// Explicit per-kind windows
    pub fn overrides(&self) -> &HashMap<String, Duration> {
        &self.per_kind
    }
}

/// A watched entity
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorTarget {
    /// Stable unique key
    pub key: String,
    /// Rules the target's samples are classified against
    pub rules: ThresholdRuleSet,
    /// Cooldown windows for the target's alerts
    pub cooldowns: CooldownPolicy,
}

impl MonitorTarget {
    /// Create a target with no cooldowns
    pub fn new(key: impl Into<String>, rules: ThresholdRuleSet) -> Self {
        Self {
            key: key.into(),
            rules,
            cooldowns: CooldownPolicy::default(),
        }
    }

    /// Set the cooldown policy
    pub fn with_cooldowns(mut self, cooldowns: CooldownPolicy) -> Self {
        self.cooldowns = cooldowns;
        self
    }
}
