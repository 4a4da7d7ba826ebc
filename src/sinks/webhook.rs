//! Webhook sink
//!
//! POSTs each alert as a JSON document. Retries are left to the receiver.

use super::NotificationSink;
use crate::domain::AlertEvent;
use crate::error::SinkError;
use serde_json::{json, Value};
use std::time::{Duration, UNIX_EPOCH};

/// HTTP webhook sink
pub struct WebhookSink {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookSink {
    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a webhook sink with a bounded request time
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("edgewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Target URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// JSON body sent for an event
    pub fn payload(event: &AlertEvent) -> Value {
        let timestamp = event
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        json!({
            "target": event.target_key,
            "kind": event.kind.to_string(),
            "from": event.from.map(|s| s.as_str()),
            "to": event.to.as_str(),
            "severity": event.display_severity().as_str(),
            "value": event.sample.as_ref().map(|s| s.value),
            "detail": event.sample.as_ref().and_then(|s| s.detail.clone()),
            "message": event.message,
            "timestamp": timestamp,
        })
    }
}

impl NotificationSink for WebhookSink {
    fn notify(&self, event: &AlertEvent) -> Result<(), SinkError> {
        self.client
            .post(&self.url)
            .json(&Self::payload(event))
            .send()?
            .error_for_status()?;

        log::debug!("Webhook {} accepted {}", self.url, event.cooldown_key());
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
