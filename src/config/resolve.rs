//! Configuration resolution
//!
//! Turns a parsed [`Config`] into sinks and watches. Each target is resolved
//! on its own: a broken target is reported once and left out, the rest run.

use super::{Config, RejectedEntry, RuleConfig, Settings, SinkConfig, SourceConfig, TargetConfig};
use crate::domain::{CooldownPolicy, MonitorTarget, Severity, ThresholdRule, ThresholdRuleSet};
use crate::engine::Watch;
use crate::error::ConfigError;
use crate::sinks::{CommandSink, NotificationSink, SinkRegistry, TerminalSink, WebhookSink};
use crate::sources::{CommandSource, DataSource, FileSource};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Shortest accepted poll interval in seconds
pub const MIN_INTERVAL_SECS: u64 = 1;
/// Longest accepted poll interval in seconds
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Runnable form of a configuration
#[derive(Debug, Default)]
pub struct Resolved {
    /// Watches for enabled, valid targets
    pub watches: Vec<Watch>,
    /// Sinks that could be built
    pub sinks: SinkRegistry,
    /// Consecutive failures before `source_unavailable`
    pub failure_threshold: u32,
    /// Targets and sinks left out, with the reason
    pub errors: Vec<(String, ConfigError)>,
    /// Keys of targets switched off in the file
    pub disabled: Vec<String>,
}

impl Resolved {
    /// Keys of the resolved watches
    pub fn keys(&self) -> Vec<String> {
        self.watches.iter().map(|w| w.key().to_string()).collect()
    }
}

/// Resolve a configuration
///
/// Never fails as a whole; problems are logged at error level and collected
/// in [`Resolved::errors`].
pub fn resolve(config: &Config) -> Resolved {
    let mut resolved = Resolved {
        failure_threshold: config.settings.failure_threshold,
        ..Resolved::default()
    };

    for entry in config.rejected.iter().filter(|e| e.table == "sinks") {
        report_rejected(&mut resolved, format!("sink:{}", entry.name), entry);
    }

    for sink in &config.sinks {
        let id = sink.id().to_string();
        if resolved.sinks.contains(&id) {
            report(
                &mut resolved,
                format!("sink:{}", id),
                ConfigError::InvalidValue {
                    key: format!("sinks.{}", id),
                    message: "duplicate sink id".into(),
                },
            );
            continue;
        }
        match build_sink(sink) {
            Ok(built) => resolved.sinks.add(id, built),
            Err(e) => report(&mut resolved, format!("sink:{}", id), e),
        }
    }

    if !config.settings.enabled {
        log::info!("Monitoring disabled in settings; no targets will be polled");
        return resolved;
    }

    for entry in config.rejected.iter().filter(|e| e.table == "targets") {
        report_rejected(&mut resolved, entry.name.clone(), entry);
    }

    let mut seen = HashSet::new();
    for target in &config.targets {
        if !seen.insert(target.key.as_str()) {
            report(
                &mut resolved,
                target.key.clone(),
                ConfigError::DuplicateTarget(target.key.clone()),
            );
            continue;
        }
        if !target.enabled {
            log::debug!("Target '{}' is disabled", target.key);
            resolved.disabled.push(target.key.clone());
            continue;
        }
        match resolve_target(target, &config.settings, &resolved.sinks) {
            Ok(watch) => resolved.watches.push(watch),
            Err(e) => report(&mut resolved, target.key.clone(), e),
        }
    }

    resolved
}

fn report(resolved: &mut Resolved, name: String, error: ConfigError) {
    log::error!("Disabling '{}': {}", name, error);
    resolved.errors.push((name, error));
}

fn report_rejected(resolved: &mut Resolved, name: String, entry: &RejectedEntry) {
    let error = ConfigError::InvalidValue {
        key: format!("{}.{}", entry.table, entry.name),
        message: entry.message.clone(),
    };
    report(resolved, name, error);
}

fn build_sink(sink: &SinkConfig) -> Result<Box<dyn NotificationSink>, ConfigError> {
    Ok(match sink {
        SinkConfig::Terminal { stderr, color, .. } => {
            Box::new(TerminalSink::with_options(*stderr, *color))
        }
        SinkConfig::Webhook {
            id,
            url,
            timeout_secs,
        } => {
            let timeout = timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(WebhookSink::DEFAULT_TIMEOUT);
            let webhook = WebhookSink::new(url.clone(), timeout).map_err(|e| {
                ConfigError::InvalidValue {
                    key: format!("sinks.{}.url", id),
                    message: e.to_string(),
                }
            })?;
            Box::new(webhook)
        }
        SinkConfig::Command { program, args, .. } => {
            Box::new(CommandSink::new(program.clone(), args.clone()))
        }
    })
}

/// Resolve a single target against the settings and available sinks
pub fn resolve_target(
    target: &TargetConfig,
    settings: &Settings,
    sinks: &SinkRegistry,
) -> Result<Watch, ConfigError> {
    let key = &target.key;
    if key.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "targets.key".into(),
            message: "target key must not be empty".into(),
        });
    }

    let interval_secs = target.interval_secs.unwrap_or(settings.default_interval_secs);
    if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&interval_secs) {
        return Err(ConfigError::InvalidValue {
            key: format!("targets.{}.interval_secs", key),
            message: format!(
                "{} is outside {}..={}",
                interval_secs, MIN_INTERVAL_SECS, MAX_INTERVAL_SECS
            ),
        });
    }

    if let Some(missing) = target.sinks.iter().find(|id| !sinks.contains(id)) {
        return Err(ConfigError::UnknownSink {
            target: key.clone(),
            sink: missing.clone(),
        });
    }

    let rules = resolve_rules(key, &target.rules)?;

    let default_cooldown = target
        .default_cooldown_secs
        .unwrap_or(settings.default_cooldown_secs);
    let cooldowns = target.cooldowns.iter().fold(
        CooldownPolicy::new(Duration::from_secs(default_cooldown))
            .gating_recovery(target.gate_recovery),
        |policy, (kind, secs)| policy.with_cooldown(kind.clone(), Duration::from_secs(*secs)),
    );

    let source: Arc<dyn DataSource> = match &target.source {
        SourceConfig::Command {
            program,
            args,
            timeout_secs,
        } => {
            if program.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: format!("targets.{}.source.program", key),
                    message: "program must not be empty".into(),
                });
            }
            let timeout = timeout_secs.unwrap_or(settings.sample_timeout_secs);
            Arc::new(
                CommandSource::new(program.clone(), args.clone())
                    .with_timeout(Duration::from_secs(timeout.max(1))),
            )
        }
        SourceConfig::File { path } => Arc::new(FileSource::new(path.clone())),
    };

    let monitor = MonitorTarget::new(key.clone(), rules).with_cooldowns(cooldowns);
    let interval = Duration::from_secs(interval_secs);
    Ok(Watch::new(monitor, source, interval).with_sinks(target.sinks.clone()))
}

fn resolve_rules(key: &str, rules: &[RuleConfig]) -> Result<ThresholdRuleSet, ConfigError> {
    let invalid = |source| ConfigError::InvalidRule {
        target: key.to_string(),
        source,
    };

    let rules = rules
        .iter()
        .map(|rule| {
            let severity: Severity = rule.severity.parse().map_err(invalid)?;
            ThresholdRule::new(severity, rule.condition.clone()).map_err(invalid)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ThresholdRuleSet::new(rules))
}
