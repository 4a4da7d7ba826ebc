//! Raw samples returned by data sources

use crate::error::SampleError;
use serde::Serialize;
use std::fmt;

/// Value(s) observed for one target during one poll cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Numeric reading (percent, days, milliseconds, 1.0/0.0 for flags)
    pub value: f64,
    /// Named non-threshold occurrences seen while sampling
    pub events: Vec<String>,
    /// Optional human-readable context
    pub detail: Option<String>,
}

impl Sample {
    /// Sample with just a numeric reading
    pub fn new(value: f64) -> Self {
        Self {
            value,
            events: Vec::new(),
            detail: None,
        }
    }

    /// Sample from a boolean signal (connected, link up, ...)
    pub fn from_flag(flag: bool) -> Self {
        Self::new(if flag { 1.0 } else { 0.0 })
    }

    /// Attach a non-threshold event such as `handshake_failed`
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.events.push(event.into());
        self
    }

    /// Attach detail text
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Reject readings that cannot be classified
    pub fn validate(self) -> Result<Self, SampleError> {
        if self.value.is_finite() {
            Ok(self)
        } else {
            Err(SampleError::Malformed(format!(
                "non-finite value {}",
                self.value
            )))
        }
    }

    /// Parse the first usable token of tool output
    ///
    /// Accepts numbers (a trailing `%` is ignored) and the usual boolean words.
    pub fn parse(output: &str) -> Result<Self, SampleError> {
        for token in output.split_whitespace() {
            let token = token.trim_end_matches(['%', ',', ';']);
            if let Ok(value) = token.parse::<f64>() {
                return Self::new(value).validate();
            }
            match token.to_lowercase().as_str() {
                "true" | "up" | "yes" | "ok" | "connected" | "enabled" => {
                    return Ok(Self::from_flag(true))
                }
                "false" | "down" | "no" | "fail" | "disconnected" | "disabled" => {
                    return Ok(Self::from_flag(false))
                }
                _ => {}
            }
        }

        let preview: String = output.trim().chars().take(64).collect();
        Err(SampleError::Malformed(format!(
            "no numeric or boolean token in '{}'",
            preview
        )))
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.value)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}
