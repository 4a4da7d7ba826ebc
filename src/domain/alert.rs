//! Alert kinds and dispatch-worthy events

use super::sample::Sample;
use super::severity::Severity;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::SystemTime;

/// What kind of occurrence an alert describes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// Classification rose to the given severity
    Entered(Severity),
    /// Classification fell, but not all the way to NORMAL
    Downgraded(Severity),
    /// Classification fell back to NORMAL
    Recovered,
    /// Data source failed repeatedly
    SourceUnavailable,
    /// Data source answered again after being unavailable
    SourceRestored,
    /// Non-threshold occurrence reported by the data source
    Event(String),
}

impl AlertKind {
    /// Recovery-class kinds bypass the cooldown gate unless a target opts in
    pub fn is_recovery(&self) -> bool {
        matches!(
            self,
            Self::Recovered | Self::Downgraded(_) | Self::SourceRestored
        )
    }

    /// Whether a source event name would collide with a built-in kind
    pub fn is_reserved_name(name: &str) -> bool {
        matches!(name, "recovered" | "source_unavailable" | "source_restored")
            || name.starts_with("entered_")
            || name.starts_with("downgraded_to_")
    }

    /// Key used by the cooldown gate
    pub fn cooldown_key(&self, target_key: &str) -> String {
        format!("{}:{}", self, target_key)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entered(severity) => write!(f, "entered_{}", severity.as_str()),
            Self::Downgraded(severity) => write!(f, "downgraded_to_{}", severity.as_str()),
            Self::Recovered => write!(f, "recovered"),
            Self::SourceUnavailable => write!(f, "source_unavailable"),
            Self::SourceRestored => write!(f, "source_restored"),
            Self::Event(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for AlertKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A decided, dispatch-worthy occurrence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    /// Target the event belongs to
    pub target_key: String,
    /// Kind of occurrence
    pub kind: AlertKind,
    /// Classification before this cycle (None on first observation)
    pub from: Option<Severity>,
    /// Classification after this cycle
    pub to: Severity,
    /// Sample that produced the event, if sampling succeeded
    pub sample: Option<Sample>,
    /// When the event was decided
    pub timestamp: SystemTime,
    /// Human-readable summary
    pub message: String,
}

impl AlertEvent {
    /// Create an event with a generated message
    pub fn new(
        target_key: impl Into<String>,
        kind: AlertKind,
        from: Option<Severity>,
        to: Severity,
        sample: Option<Sample>,
        timestamp: SystemTime,
    ) -> Self {
        let target_key = target_key.into();
        let message = describe(&target_key, &kind, from, to, sample.as_ref());
        Self {
            target_key,
            kind,
            from,
            to,
            sample,
            timestamp,
            message,
        }
    }

    /// Severity to present the event with
    pub fn display_severity(&self) -> Severity {
        match self.kind {
            AlertKind::SourceUnavailable => Severity::Warning,
            _ => self.to,
        }
    }

    /// Cooldown gate key for this event
    pub fn cooldown_key(&self) -> String {
        self.kind.cooldown_key(&self.target_key)
    }
}

fn describe(
    target: &str,
    kind: &AlertKind,
    from: Option<Severity>,
    to: Severity,
    sample: Option<&Sample>,
) -> String {
    let reading = sample
        .map(|s| format!(" (value: {})", s))
        .unwrap_or_default();
    let from = from.map(|s| s.to_string()).unwrap_or_else(|| "-".into());

    match kind {
        AlertKind::Entered(severity) => {
            format!("{} entered {}{}", target, severity, reading)
        }
        AlertKind::Downgraded(severity) => {
            format!("{} downgraded {} -> {}{}", target, from, severity, reading)
        }
        AlertKind::Recovered => format!("{} recovered from {}{}", target, from, reading),
        AlertKind::SourceUnavailable => format!("{}: data source unavailable", target),
        AlertKind::SourceRestored => {
            format!("{}: data source restored, now {}{}", target, to, reading)
        }
        AlertKind::Event(name) => format!("{}: {}{}", target, name, reading),
    }
}
