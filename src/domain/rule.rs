//! Threshold rules
//!
//! A rule set maps a raw sample value onto the severity ladder. Rules are
//! checked from the highest severity down and the first match wins.

use super::severity::Severity;
use crate::error::RuleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparator against one or two boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Value strictly greater than boundary
    GreaterThan(f64),
    /// Value greater than or equal to boundary
    AtLeast(f64),
    /// Value strictly less than boundary
    LessThan(f64),
    /// Value less than or equal to boundary
    AtMost(f64),
    /// Value equals boundary (with epsilon for floats)
    Equals(f64),
    /// Value within range (inclusive)
    InRange { min: f64, max: f64 },
    /// Value outside range
    OutsideRange { min: f64, max: f64 },
}

impl Condition {
    /// Evaluate condition against a value
    pub fn evaluate(&self, value: f64) -> bool {
        const EPSILON: f64 = 1e-6;

        match self {
            Self::GreaterThan(boundary) => value > *boundary,
            Self::AtLeast(boundary) => value >= *boundary,
            Self::LessThan(boundary) => value < *boundary,
            Self::AtMost(boundary) => value <= *boundary,
            Self::Equals(target) => (value - target).abs() < EPSILON,
            Self::InRange { min, max } => value >= *min && value <= *max,
            Self::OutsideRange { min, max } => value < *min || value > *max,
        }
    }

    /// Check boundaries are usable
    pub fn validate(&self) -> Result<(), RuleError> {
        match self {
            Self::GreaterThan(v)
            | Self::AtLeast(v)
            | Self::LessThan(v)
            | Self::AtMost(v)
            | Self::Equals(v) => finite(*v),
            Self::InRange { min, max } | Self::OutsideRange { min, max } => {
                finite(*min)?;
                finite(*max)?;
                if min > max {
                    return Err(RuleError::InvalidRange {
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
        }
    }
}

fn finite(value: f64) -> Result<(), RuleError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RuleError::NonFiniteBoundary(value))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GreaterThan(v) => write!(f, "> {}", v),
            Self::AtLeast(v) => write!(f, ">= {}", v),
            Self::LessThan(v) => write!(f, "< {}", v),
            Self::AtMost(v) => write!(f, "<= {}", v),
            Self::Equals(v) => write!(f, "= {}", v),
            Self::InRange { min, max } => write!(f, "in [{}, {}]", min, max),
            Self::OutsideRange { min, max } => write!(f, "outside [{}, {}]", min, max),
        }
    }
}

/// One (severity, comparator, boundary) tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Severity assigned when the condition holds
    pub severity: Severity,
    /// Condition to evaluate
    pub condition: Condition,
}

impl ThresholdRule {
    /// Create a validated rule
    ///
    /// # Errors
    /// Returns `RuleError::NormalSeverity` for a NORMAL rule, or a boundary error
    pub fn new(severity: Severity, condition: Condition) -> Result<Self, RuleError> {
        if severity.is_normal() {
            return Err(RuleError::NormalSeverity);
        }
        condition.validate()?;
        Ok(Self {
            severity,
            condition,
        })
    }
}

impl fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: value {}", self.severity, self.condition)
    }
}

/// Ordered set of threshold rules with an implicit NORMAL fallback
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThresholdRuleSet {
    /// Rules sorted by descending severity, declaration order kept for ties
    rules: Vec<ThresholdRule>,
}

impl ThresholdRuleSet {
    /// Build a rule set from rules in declaration order
    pub fn new(mut rules: Vec<ThresholdRule>) -> Self {
        // sort_by is stable, so ties keep declaration order
        rules.sort_by(|a, b| b.severity.cmp(&a.severity));
        Self { rules }
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    /// Whether the set has no rules at all
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Classify a value; NORMAL when no rule matches
    pub fn classify(&self, value: f64) -> Severity {
        self.rules
            .iter()
            .find(|rule| rule.condition.evaluate(value))
            .map(|rule| rule.severity)
            .unwrap_or(Severity::Normal)
    }
}
