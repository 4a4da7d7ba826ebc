//! Command sink
//!
//! Runs an external player or hook per alert, e.g. `paplay alert.oga`.
//! Arguments may contain `{kind}`, `{target}`, `{severity}` and `{message}`.

use super::NotificationSink;
use crate::domain::AlertEvent;
use crate::error::SinkError;
use std::process::{Command, Stdio};

/// External command sink
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    /// Create a command sink
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments with placeholders filled in
    pub fn render_args(&self, event: &AlertEvent) -> Vec<String> {
        let kind = event.kind.to_string();
        let severity = event.display_severity().as_str();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{kind}", &kind)
                    .replace("{target}", &event.target_key)
                    .replace("{severity}", severity)
                    .replace("{message}", &event.message)
            })
            .collect()
    }
}

impl NotificationSink for CommandSink {
    fn notify(&self, event: &AlertEvent) -> Result<(), SinkError> {
        let status = Command::new(&self.program)
            .args(self.render_args(event))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(SinkError::Command {
                program: self.program.clone(),
                code: status.code(),
            });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "command"
    }
}
