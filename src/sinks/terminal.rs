//! Terminal sink
//!
//! Writes one line per alert to stderr or stdout, with optional ANSI colour.

use super::NotificationSink;
use crate::domain::{AlertEvent, Severity};
use crate::error::SinkError;
use std::io::{self, Write};

/// Terminal/console sink
pub struct TerminalSink {
    /// Use stderr instead of stdout
    use_stderr: bool,
    /// Use colors (ANSI escape codes)
    use_colors: bool,
}

impl TerminalSink {
    /// Create a sink writing to stderr
    pub fn new() -> Self {
        Self {
            use_stderr: true,
            use_colors: Self::supports_color(),
        }
    }

    /// Create a sink that uses stdout
    pub fn stdout() -> Self {
        Self {
            use_stderr: false,
            use_colors: Self::supports_color(),
        }
    }

    /// Create a sink without colors
    pub fn no_color() -> Self {
        Self {
            use_stderr: true,
            use_colors: false,
        }
    }

    /// Choose the stream and colour explicitly
    pub fn with_options(use_stderr: bool, use_colors: bool) -> Self {
        Self {
            use_stderr,
            use_colors,
        }
    }

    fn supports_color() -> bool {
        std::env::var("TERM")
            .map(|term| term != "dumb")
            .unwrap_or(false)
            && std::env::var_os("NO_COLOR").is_none()
    }

    /// Format one alert line
    fn format_event(&self, event: &AlertEvent) -> String {
        let timestamp = event
            .timestamp
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| {
                let secs = d.as_secs() % 86_400;
                format!(
                    "{:02}:{:02}:{:02}",
                    secs / 3600,
                    (secs % 3600) / 60,
                    secs % 60
                )
            })
            .unwrap_or_else(|_| "??:??:??".to_string());

        format!(
            "[{}] {} {} {}",
            timestamp,
            self.format_severity(event.display_severity()),
            event.kind,
            event.message
        )
    }

    fn format_severity(&self, severity: Severity) -> String {
        if !self.use_colors {
            return format!("{}", severity);
        }

        let color_code = match severity {
            Severity::Normal => "\x1b[32m",           // Green
            Severity::Info => "\x1b[36m",             // Cyan
            Severity::Warning => "\x1b[33m",          // Yellow
            Severity::Critical => "\x1b[31m",         // Red
            Severity::Emergency => "\x1b[35m\x1b[1m", // Bold Magenta
        };

        format!("{}{}\x1b[0m", color_code, severity)
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for TerminalSink {
    fn notify(&self, event: &AlertEvent) -> Result<(), SinkError> {
        let line = self.format_event(event);

        if self.use_stderr {
            let mut handle = io::stderr().lock();
            writeln!(handle, "{}", line)?;
        } else {
            let mut handle = io::stdout().lock();
            writeln!(handle, "{}", line)?;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "terminal"
    }
}
