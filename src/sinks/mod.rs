//! Notification sinks
//!
//! Sinks render an admitted alert to the outside world: a terminal line,
//! an HTTP webhook, or an external player/hook command.

mod command;
mod terminal;
mod webhook;

pub use command::CommandSink;
pub use terminal::TerminalSink;
pub use webhook::WebhookSink;

use crate::domain::AlertEvent;
use crate::error::SinkError;

/// Notification channel trait
pub trait NotificationSink: Send + Sync {
    /// Deliver one alert
    fn notify(&self, event: &AlertEvent) -> Result<(), SinkError>;

    /// Channel name for identification
    fn name(&self) -> &str;
}

/// Outcome of delivering one event to its sinks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Sinks that accepted the event
    pub delivered: usize,
    /// Sinks that failed
    pub failed: usize,
}

/// Named collection of sinks
///
/// Routes events to a target's sinks and isolates failures between them.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: Vec<(String, Box<dyn NotificationSink>)>,
}

impl SinkRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Register a sink under an id; a second sink with the same id replaces the first
    pub fn add(&mut self, id: impl Into<String>, sink: Box<dyn NotificationSink>) {
        let id = id.into();
        self.sinks.retain(|(existing, _)| *existing != id);
        self.sinks.push((id, sink));
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> Vec<&str> {
        self.sinks.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Whether an id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.sinks.iter().any(|(existing, _)| existing == id)
    }

    /// Number of registered sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver to the routed sinks; an empty route means every sink
    ///
    /// A failing sink is logged and skipped, it never blocks the others.
    pub fn deliver(&self, event: &AlertEvent, route: &[String]) -> Delivery {
        let mut outcome = Delivery::default();

        for (id, sink) in &self.sinks {
            if !route.is_empty() && !route.iter().any(|r| r == id) {
                continue;
            }

            match sink.notify(event) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    outcome.failed += 1;
                    log::warn!(
                        "Failed to notify via {} ({}) for {}: {}",
                        id,
                        sink.name(),
                        event.cooldown_key(),
                        e
                    );
                }
            }
        }

        outcome
    }
}

impl std::fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("sinks", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{sample_event, FailingSink, RecordingSink};

    #[test]
    fn test_registry_creation() {
        let registry = SinkRegistry::new();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_replaces_same_id() {
        let mut registry = SinkRegistry::new();
        registry.add("console", Box::new(TerminalSink::no_color()));
        registry.add("console", Box::new(TerminalSink::stdout()));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("console"));
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let recorder = RecordingSink::new();
        let mut registry = SinkRegistry::new();
        registry.add("broken", Box::new(FailingSink));
        registry.add("recorder", Box::new(recorder.clone()));

        let outcome = registry.deliver(&sample_event("diskA"), &[]);
        assert_eq!(outcome, Delivery { delivered: 1, failed: 1 });
        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn test_routing() {
        let first = RecordingSink::new();
        let second = RecordingSink::new();
        let mut registry = SinkRegistry::new();
        registry.add("first", Box::new(first.clone()));
        registry.add("second", Box::new(second.clone()));

        registry.deliver(&sample_event("diskA"), &["second".to_string()]);
        assert!(first.events().is_empty());
        assert_eq!(second.events().len(), 1);
    }
}
