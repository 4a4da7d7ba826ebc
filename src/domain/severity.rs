//! Severity ladder
//!
//! Classifications are totally ordered so that escalation and recovery
//! are well defined.

use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity level assigned to a sample
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No rule matched
    #[default]
    Normal,
    /// Informational, no action needed
    Info,
    /// Attention recommended
    Warning,
    /// Action required soon
    Critical,
    /// Immediate action required
    Emergency,
}

impl Severity {
    /// All levels in ascending order
    pub const ALL: [Severity; 5] = [
        Self::Normal,
        Self::Info,
        Self::Warning,
        Self::Critical,
        Self::Emergency,
    ];

    /// Lowercase name used in alert kinds and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Emergency => "emergency",
        }
    }

    /// Whether this is the implicit resting level
    #[inline]
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "NORMAL",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Emergency => "EMERGENCY",
        };
        f.pad(name)
    }
}

impl FromStr for Severity {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "critical" | "crit" => Ok(Self::Critical),
            "emergency" => Ok(Self::Emergency),
            _ => Err(RuleError::UnknownSeverity(s.to_string())),
        }
    }
}
