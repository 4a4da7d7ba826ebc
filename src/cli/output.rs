//! Output formatting utilities
//!
//! Provides table and JSON output formatting for CLI commands.

use crate::cli::args::OutputFormat;
use crate::config::Resolved;
use crate::domain::Severity;
use crate::engine::{CycleReport, Outcome, TargetReport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Format and print output based on the selected format
pub fn print_output<T: Serialize + TableDisplay>(data: &T, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Table => {
            writeln!(handle, "{}", data.to_table())?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
            writeln!(handle, "{}", json)?;
        }
        OutputFormat::Compact => {
            writeln!(handle, "{}", data.to_compact())?;
        }
    }

    Ok(())
}

/// Trait for types that can be displayed as a table
pub trait TableDisplay {
    /// Format as a table string
    fn to_table(&self) -> String;

    /// Format as a compact single line
    fn to_compact(&self) -> String {
        self.to_table().replace('\n', " | ")
    }
}

/// One target's result in a cycle
#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    pub key: String,
    pub severity: Option<Severity>,
    pub value: Option<f64>,
    pub error: Option<String>,
    pub alerts: Vec<String>,
    pub suppressed: Vec<String>,
}

impl From<&TargetReport> for TargetResult {
    fn from(report: &TargetReport) -> Self {
        let (severity, value, error) = match &report.outcome {
            Outcome::Classified { current, value, .. } => (Some(*current), Some(*value), None),
            Outcome::Failed { error, .. } => (None, None, Some(error.clone())),
        };
        Self {
            key: report.key.clone(),
            severity,
            value,
            error,
            alerts: report.admitted.iter().map(|e| e.message.clone()).collect(),
            suppressed: report.suppressed.iter().map(|e| e.kind.to_string()).collect(),
        }
    }
}

impl TableDisplay for TargetResult {
    fn to_table(&self) -> String {
        let mut output = match (&self.severity, &self.error) {
            (Some(severity), _) => format!(
                "{:<24} {:<10} {:>10.2}",
                self.key,
                severity,
                self.value.unwrap_or_default()
            ),
            (None, Some(error)) => format!("{:<24} {:<10} {}", self.key, "ERROR", error),
            (None, None) => format!("{:<24} {:<10}", self.key, "-"),
        };

        for alert in &self.alerts {
            output.push_str(&format!("\n  ! {}", alert));
        }
        for kind in &self.suppressed {
            output.push_str(&format!("\n  ~ {} (cooldown)", kind));
        }

        output
    }

    fn to_compact(&self) -> String {
        match (&self.severity, &self.error) {
            (Some(severity), _) => format!("{}={}", self.key, severity.as_str()),
            _ => format!("{}=error", self.key),
        }
    }
}

/// Summary of one poll cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub targets: Vec<TargetResult>,
    pub admitted: usize,
    pub suppressed: usize,
    pub failed: usize,
}

impl From<&CycleReport> for CycleSummary {
    fn from(report: &CycleReport) -> Self {
        Self {
            targets: report.targets.iter().map(TargetResult::from).collect(),
            admitted: report.admitted().count(),
            suppressed: report.suppressed().count(),
            failed: report.failures(),
        }
    }
}

impl TableDisplay for CycleSummary {
    fn to_table(&self) -> String {
        let mut output = format!("{:<24} {:<10} {:>10}\n", "TARGET", "SEVERITY", "VALUE");

        for target in &self.targets {
            output.push_str(&target.to_table());
            output.push('\n');
        }

        output.push_str(&format!(
            "\n{} alert(s) sent, {} suppressed, {} target(s) failed",
            self.admitted, self.suppressed, self.failed
        ));
        output
    }

    fn to_compact(&self) -> String {
        self.targets
            .iter()
            .map(|t| t.to_compact())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A configured target for display
#[derive(Debug, Clone, Serialize)]
pub struct TargetEntry {
    pub key: String,
    pub interval_secs: u64,
    pub source: String,
    pub rules: Vec<String>,
    pub sinks: Vec<String>,
    pub default_cooldown_secs: u64,
    pub cooldowns: BTreeMap<String, u64>,
    pub gate_recovery: bool,
}

/// A configuration problem for display
#[derive(Debug, Clone, Serialize)]
pub struct ConfigIssue {
    pub name: String,
    pub error: String,
}

/// Result of validating a configuration
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub config: Option<String>,
    pub sinks: Vec<String>,
    pub targets: Vec<TargetEntry>,
    pub disabled: Vec<String>,
    pub errors: Vec<ConfigIssue>,
}

impl CheckReport {
    /// Describe a resolved configuration
    pub fn new(config: Option<String>, resolved: &Resolved) -> Self {
        Self {
            config,
            sinks: resolved.sinks.ids().into_iter().map(String::from).collect(),
            targets: resolved
                .watches
                .iter()
                .map(|w| {
                    let policy = &w.target.cooldowns;
                    TargetEntry {
                        key: w.key().to_string(),
                        interval_secs: w.interval.as_secs(),
                        source: w.source.describe(),
                        rules: w.target.rules.rules().iter().map(|r| r.to_string()).collect(),
                        sinks: w.sinks.clone(),
                        default_cooldown_secs: policy.default_window().as_secs(),
                        cooldowns: policy
                            .overrides()
                            .iter()
                            .map(|(kind, window)| (kind.clone(), window.as_secs()))
                            .collect(),
                        gate_recovery: policy.gates_recovery(),
                    }
                })
                .collect(),
            disabled: resolved.disabled.clone(),
            errors: resolved
                .errors
                .iter()
                .map(|(name, error)| ConfigIssue {
                    name: name.clone(),
                    error: error.to_string(),
                })
                .collect(),
        }
    }

    /// Whether every configured target and sink resolved
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl TableDisplay for CheckReport {
    fn to_table(&self) -> String {
        let mut output = format!(
            "Config: {}\n",
            self.config.as_deref().unwrap_or("(built-in defaults)")
        );
        output.push_str(&format!("Sinks: {}\n", self.sinks.join(", ")));
        output.push_str(&format!("Targets: {}\n", self.targets.len()));

        for target in &self.targets {
            let sinks = if target.sinks.is_empty() {
                "all sinks".to_string()
            } else {
                target.sinks.join(", ")
            };
            output.push_str(&format!(
                "\n  {} (every {}s via {}, -> {})\n",
                target.key, target.interval_secs, target.source, sinks
            ));
            for rule in &target.rules {
                output.push_str(&format!("    {}\n", rule));
            }
            let mut cooldowns = vec![format!("default {}s", target.default_cooldown_secs)];
            cooldowns.extend(
                target
                    .cooldowns
                    .iter()
                    .map(|(kind, secs)| format!("{} {}s", kind, secs)),
            );
            output.push_str(&format!("    cooldown: {}", cooldowns.join(", ")));
            if !target.gate_recovery {
                output.push_str(" (recoveries ungated)");
            }
            output.push('\n');
        }

        if !self.disabled.is_empty() {
            output.push_str(&format!("\nDisabled: {}\n", self.disabled.join(", ")));
        }

        if !self.errors.is_empty() {
            output.push_str("\nErrors:\n");
            for issue in &self.errors {
                output.push_str(&format!("  ✗ {}: {}\n", issue.name, issue.error));
            }
        }

        output
    }

    fn to_compact(&self) -> String {
        format!(
            "{} target(s), {} disabled, {} error(s)",
            self.targets.len(),
            self.disabled.len(),
            self.errors.len()
        )
    }
}

/// Simple message output
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
    pub success: bool,
}

impl TableDisplay for Message {
    fn to_table(&self) -> String {
        if self.success {
            format!("✓ {}", self.message)
        } else {
            format!("✗ {}", self.message)
        }
    }
}
