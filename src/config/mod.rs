//! Configuration system
//!
//! TOML configuration for settings, sinks and monitor targets, plus the
//! resolution step that turns it into runnable watches.

pub mod builder;
pub mod file;
pub mod resolve;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;
pub use resolve::{resolve, Resolved};

use crate::domain::Condition;
use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Sink and target entries are parsed one by one. An entry that does not fit
/// its schema lands in `rejected` and the rest of the file still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConfig")]
pub struct Config {
    /// Global settings
    pub settings: Settings,
    /// Notification sinks
    pub sinks: Vec<SinkConfig>,
    /// Monitor targets
    pub targets: Vec<TargetConfig>,
    /// Entries that could not be parsed
    #[serde(skip)]
    pub rejected: Vec<RejectedEntry>,
}

/// A `[[sinks]]` or `[[targets]]` entry that failed to parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    /// Table the entry belongs to (`sinks` or `targets`)
    pub table: &'static str,
    /// Sink id or target key, or the entry position when it has none
    pub name: String,
    /// Parser message
    pub message: String,
}

/// Configuration as read from disk, before per-entry parsing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    settings: Settings,
    sinks: Vec<toml::Value>,
    targets: Vec<toml::Value>,
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        let mut rejected = Vec::new();
        let sinks = parse_entries(raw.sinks, "sinks", "id", &mut rejected);
        let targets = parse_entries(raw.targets, "targets", "key", &mut rejected);

        Self {
            settings: raw.settings,
            sinks,
            targets,
            rejected,
        }
    }
}

fn parse_entries<T: DeserializeOwned>(
    entries: Vec<toml::Value>,
    table: &'static str,
    name_field: &str,
    rejected: &mut Vec<RejectedEntry>,
) -> Vec<T> {
    let mut parsed = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let name = entry
            .get(name_field)
            .and_then(toml::Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| format!("{}[{}]", table, index));

        match T::deserialize(entry) {
            Ok(value) => parsed.push(value),
            Err(e) => rejected.push(RejectedEntry {
                table,
                name,
                message: e.to_string().trim().to_string(),
            }),
        }
    }

    parsed
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::error::Result<()> {
        let contents = toml::to_string_pretty(self).map_err(ConfigError::from)?;
        fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("edgewatch").join("config.toml")
        } else {
            PathBuf::from("edgewatch.toml")
        }
    }

    /// The annotated starter configuration written by `edgewatch init`
    pub fn default_template() -> &'static str {
        DEFAULT_TEMPLATE
    }

}

/// Global settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether monitoring is enabled globally
    pub enabled: bool,
    /// Poll interval for targets that do not set one
    pub default_interval_secs: u64,
    /// Consecutive sampling failures before `source_unavailable` (0 = never)
    pub failure_threshold: u32,
    /// Time budget for command sources that do not set one
    pub sample_timeout_secs: u64,
    /// Cooldown for alert kinds without an explicit window
    pub default_cooldown_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_interval_secs: 60,
            failure_threshold: 3,
            sample_timeout_secs: 5,
            default_cooldown_secs: 300,
        }
    }
}

/// A named notification sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Formatted line on the terminal
    Terminal {
        id: String,
        /// Write to stderr instead of stdout
        #[serde(default = "default_true")]
        stderr: bool,
        /// ANSI colours
        #[serde(default = "default_true")]
        color: bool,
    },
    /// JSON POST to a URL
    Webhook {
        id: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
    },
    /// External command, e.g. an audio player
    Command {
        id: String,
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl SinkConfig {
    /// Sink id referenced by targets
    pub fn id(&self) -> &str {
        match self {
            Self::Terminal { id, .. } | Self::Webhook { id, .. } | Self::Command { id, .. } => id,
        }
    }
}

/// Where a target's samples come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Run a command and read its first value token
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
    },
    /// Read a value from a file
    File { path: PathBuf },
}

/// Threshold rule as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Severity name (info, warning, critical, emergency)
    pub severity: String,
    /// Condition under which the severity applies
    pub condition: Condition,
}

/// Monitor target configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Unique key
    pub key: String,
    /// Whether the target is polled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Poll interval (falls back to settings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    /// Cooldown fallback for this target (falls back to settings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_cooldown_secs: Option<u64>,
    /// Gate recovery-class alerts like any other kind
    #[serde(default)]
    pub gate_recovery: bool,
    /// Sink ids to notify (empty = all)
    #[serde(default)]
    pub sinks: Vec<String>,
    /// Data source
    pub source: SourceConfig,
    /// Threshold rules
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    /// Cooldown windows by alert kind, in seconds
    #[serde(default)]
    pub cooldowns: BTreeMap<String, u64>,
}

fn default_true() -> bool {
    true
}

const DEFAULT_TEMPLATE: &str = r#"# edgewatch configuration
#
# Each target is sampled every interval_secs, classified against its rules
# and alerted on when its severity changes. Repeated alerts of the same kind
# are held back for the configured cooldown.

[settings]
enabled = true
default_interval_secs = 60
# Consecutive sampling failures before a source_unavailable alert (0 = never)
failure_threshold = 3
sample_timeout_secs = 5
default_cooldown_secs = 300

[[sinks]]
id = "console"
kind = "terminal"
stderr = true
color = true

# [[sinks]]
# id = "ops-hook"
# kind = "webhook"
# url = "http://localhost:9000/alerts"
# timeout_secs = 5

# [[sinks]]
# id = "chime"
# kind = "command"
# program = "paplay"
# args = ["/usr/share/sounds/freedesktop/stereo/{severity}.oga"]

[[targets]]
key = "root-disk"
interval_secs = 300
sinks = ["console"]

[targets.source]
type = "command"
program = "sh"
args = ["-c", "df --output=pcent / | tail -n 1"]

[[targets.rules]]
severity = "warning"
condition = { at_least = 80.0 }

[[targets.rules]]
severity = "critical"
condition = { at_least = 90.0 }

# Critical alerts repeat sooner than warnings
[targets.cooldowns]
entered_warning = 3600
entered_critical = 1800
source_unavailable = 3600
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let config = Config::default();
        assert!(config.settings.enabled);
        assert_eq!(config.settings.default_interval_secs, 60);
        assert_eq!(config.settings.failure_threshold, 3);
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_template_parses() {
        let config = Config::from_toml(Config::default_template()).unwrap();
        assert_eq!(config.sinks.len(), 1);
        assert_eq!(config.sinks[0].id(), "console");

        let target = &config.targets[0];
        assert_eq!(target.key, "root-disk");
        assert_eq!(target.interval_secs, Some(300));
        assert_eq!(target.rules.len(), 2);
        assert_eq!(target.rules[1].condition, Condition::AtLeast(90.0));
        assert_eq!(target.cooldowns.get("entered_critical"), Some(&1800));
        assert!(matches!(target.source, SourceConfig::Command { .. }));
    }

    #[test]
    fn test_sink_kinds() {
        let config = Config::from_toml(
            r#"
            [[sinks]]
            id = "hook"
            kind = "webhook"
            url = "http://localhost/alerts"

            [[sinks]]
            id = "beep"
            kind = "command"
            program = "aplay"
            args = ["{severity}.wav"]
            "#,
        )
        .unwrap();

        assert!(matches!(
            &config.sinks[0],
            SinkConfig::Webhook { url, timeout_secs: None, .. } if url == "http://localhost/alerts"
        ));
        assert!(matches!(&config.sinks[1], SinkConfig::Command { args, .. } if args.len() == 1));
    }

    #[test]
    fn test_range_condition() {
        let config = Config::from_toml(
            r#"
            [[targets]]
            key = "temp"
            source = { type = "file", path = "/sys/class/thermal/thermal_zone0/temp" }
            rules = [{ severity = "warning", condition = { outside_range = { min = 10.0, max = 70.0 } } }]
            "#,
        )
        .unwrap();

        let target = &config.targets[0];
        assert!(target.enabled);
        assert_eq!(
            target.rules[0].condition,
            Condition::OutsideRange {
                min: 10.0,
                max: 70.0
            }
        );
    }

    #[test]
    fn test_unknown_sink_kind_rejected() {
        let config = Config::from_toml(
            r#"
            [[sinks]]
            id = "x"
            kind = "carrier_pigeon"

            [[sinks]]
            id = "console"
            kind = "terminal"
            "#,
        )
        .unwrap();

        assert_eq!(config.sinks.len(), 1);
        assert_eq!(config.rejected.len(), 1);
        assert_eq!(config.rejected[0].table, "sinks");
        assert_eq!(config.rejected[0].name, "x");
        assert!(config.rejected[0].message.contains("carrier_pigeon"));
    }

    #[test]
    fn test_malformed_target_does_not_fail_file() {
        let config = Config::from_toml(
            r#"
            [[targets]]
            key = "bad"
            source = { type = "file", path = "/tmp/x" }
            rules = [{ severity = "warning", condition = { above = 1.0 } }]

            [[targets]]
            key = "good"
            source = { type = "file", path = "/tmp/x" }
            "#,
        )
        .unwrap();

        assert_eq!(config.targets[0].key, "good");
        assert_eq!(config.rejected[0].table, "targets");
        assert_eq!(config.rejected[0].name, "bad");
    }

    #[test]
    fn test_non_array_targets_fail_file() {
        assert!(matches!(
            Config::from_toml("targets = 5"),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::from_toml(Config::default_template()).unwrap();
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
