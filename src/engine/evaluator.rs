//! Threshold evaluator
//!
//! Pure classification plus edge detection. Alerts fire on a change of
//! classification, never on a classification that merely persists.

use crate::domain::{AlertKind, Sample, Severity, ThresholdRuleSet};
use std::cmp::Ordering;

/// Result of evaluating one sample
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Classification of the sample
    pub classification: Severity,
    /// Alert kinds produced by this sample, transition first
    pub kinds: Vec<AlertKind>,
}

/// Classify a sample and compare it to the previous classification
///
/// `previous` is `None` for a target that has never been classified; the
/// first observation establishes a baseline and produces no transition.
/// Events carried by the sample are emitted regardless of transitions;
/// events named like a built-in kind are dropped.
pub fn evaluate(
    previous: Option<Severity>,
    sample: &Sample,
    rules: &ThresholdRuleSet,
) -> Evaluation {
    let classification = rules.classify(sample.value);
    let mut kinds = Vec::new();

    if let Some(kind) = previous.and_then(|prev| transition(prev, classification)) {
        kinds.push(kind);
    }

    for name in &sample.events {
        if AlertKind::is_reserved_name(name) {
            log::warn!("Ignoring source event '{}': the name is reserved", name);
            continue;
        }
        kinds.push(AlertKind::Event(name.clone()));
    }

    Evaluation {
        classification,
        kinds,
    }
}

/// Alert kind for a classification change, if any
pub fn transition(previous: Severity, current: Severity) -> Option<AlertKind> {
    match current.cmp(&previous) {
        Ordering::Greater => Some(AlertKind::Entered(current)),
        Ordering::Less if current.is_normal() => Some(AlertKind::Recovered),
        Ordering::Less => Some(AlertKind::Downgraded(current)),
        Ordering::Equal => None,
    }
}
