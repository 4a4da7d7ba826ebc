//! Poll cycle pipeline
//!
//! For every watch: sample, classify against the previous state, write the
//! new state, then pass each resulting alert through the cooldown gate and
//! on to the dispatcher.

use super::clock::{Clock, SystemClock};
use super::cooldown::CooldownGate;
use super::dispatcher::Dispatcher;
use super::evaluator::evaluate;
use super::state::StateStore;
use crate::domain::{AlertEvent, AlertKind, MonitorTarget, Sample, Severity};
use crate::error::SampleError;
use crate::sources::DataSource;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// A target bound to its data source, poll interval and sinks
#[derive(Clone)]
pub struct Watch {
    /// Target definition
    pub target: MonitorTarget,
    /// Where samples come from
    pub source: Arc<dyn DataSource>,
    /// Poll interval
    pub interval: Duration,
    /// Sink ids to notify (empty = all)
    pub sinks: Vec<String>,
}

impl Watch {
    /// Create a watch that notifies every sink
    pub fn new(target: MonitorTarget, source: Arc<dyn DataSource>, interval: Duration) -> Self {
        Self {
            target,
            source,
            interval,
            sinks: Vec::new(),
        }
    }

    /// Restrict notifications to the given sinks
    pub fn with_sinks(mut self, sinks: Vec<String>) -> Self {
        self.sinks = sinks;
        self
    }

    /// Target key
    pub fn key(&self) -> &str {
        &self.target.key
    }
}

impl std::fmt::Debug for Watch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watch")
            .field("key", &self.target.key)
            .field("source", &self.source.describe())
            .field("interval", &self.interval)
            .field("sinks", &self.sinks)
            .finish()
    }
}

/// What happened to one target during a cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Sample classified and state written
    Classified {
        previous: Option<Severity>,
        current: Severity,
        value: f64,
    },
    /// Sampling failed; previous classification kept
    Failed { error: String, consecutive: u32 },
}

/// Per-target cycle result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetReport {
    /// Target key
    pub key: String,
    /// Sampling/classification outcome
    pub outcome: Outcome,
    /// Alerts that passed the gate and were handed to the dispatcher
    pub admitted: Vec<AlertEvent>,
    /// Alerts held back by the cooldown gate
    pub suppressed: Vec<AlertEvent>,
}

/// Result of one poll cycle over a set of watches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    /// When the cycle started
    pub started_at: SystemTime,
    /// One entry per watch, in watch order
    pub targets: Vec<TargetReport>,
}

impl CycleReport {
    /// All admitted alerts
    pub fn admitted(&self) -> impl Iterator<Item = &AlertEvent> {
        self.targets.iter().flat_map(|t| t.admitted.iter())
    }

    /// All suppressed alerts
    pub fn suppressed(&self) -> impl Iterator<Item = &AlertEvent> {
        self.targets.iter().flat_map(|t| t.suppressed.iter())
    }

    /// Number of targets whose sampling failed
    pub fn failures(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| matches!(t.outcome, Outcome::Failed { .. }))
            .count()
    }

    /// Report for one target
    pub fn target(&self, key: &str) -> Option<&TargetReport> {
        self.targets.iter().find(|t| t.key == key)
    }
}

/// The notification engine
pub struct Engine {
    store: Arc<StateStore>,
    gate: Arc<CooldownGate>,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    failure_threshold: u32,
}

impl Engine {
    /// Consecutive sampler errors before `source_unavailable` is raised
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

    /// Create an engine with fresh state and the system clock
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            store: Arc::new(StateStore::new()),
            gate: Arc::new(CooldownGate::new()),
            dispatcher,
            clock: Arc::new(SystemClock),
            failure_threshold: Self::DEFAULT_FAILURE_THRESHOLD,
        }
    }

    /// Use a different clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the failure threshold (0 disables `source_unavailable`)
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Reuse state and cooldown records from a previous engine
    pub fn with_shared_state(mut self, store: Arc<StateStore>, gate: Arc<CooldownGate>) -> Self {
        self.store = store;
        self.gate = gate;
        self
    }

    /// State store
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Cooldown gate
    pub fn gate(&self) -> &Arc<CooldownGate> {
        &self.gate
    }

    /// Dispatcher
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Configured failure threshold
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// Run one cycle over `watches`
    ///
    /// A failing target never stops the others from being processed.
    pub fn run_cycle(&self, watches: &[Watch]) -> CycleReport {
        let started_at = self.clock.now();
        let targets = watches.iter().map(|watch| self.poll(watch)).collect();
        CycleReport {
            started_at,
            targets,
        }
    }

    /// Sample, evaluate and dispatch for a single watch
    pub fn poll(&self, watch: &Watch) -> TargetReport {
        let now = self.clock.now();
        let key = watch.key();

        let (outcome, events) = match sample_guarded(watch) {
            Ok(sample) => self.classify(watch, sample, now),
            Err(error) => self.record_failure(watch, error, now),
        };

        let mut report = TargetReport {
            key: key.to_string(),
            outcome,
            admitted: Vec::new(),
            suppressed: Vec::new(),
        };

        for event in events {
            if self.admit(&watch.target, &event, now) {
                log::info!("{} [{}]", event.message, event.kind);
                if let Err(e) = self.dispatcher.dispatch(event.clone(), &watch.sinks) {
                    log::warn!("Could not queue {}: {}", event.cooldown_key(), e);
                }
                report.admitted.push(event);
            } else {
                log::debug!("Alert {} suppressed (cooldown)", event.cooldown_key());
                report.suppressed.push(event);
            }
        }

        report
    }

    fn classify(
        &self,
        watch: &Watch,
        sample: Sample,
        now: SystemTime,
    ) -> (Outcome, Vec<AlertEvent>) {
        let target = &watch.target;

        // Classification is written unconditionally, whatever the gate decides later
        let (previous, evaluation, restored) = self.store.transition(&target.key, |state| {
            let previous = state.classification;
            let evaluation = evaluate(previous, &sample, &target.rules);
            state.classification = Some(evaluation.classification);
            state.last_value = Some(sample.value);
            state.classified_at = Some(now);
            state.consecutive_failures = 0;
            let restored = std::mem::take(&mut state.unavailable);
            (previous, evaluation, restored)
        });

        let current = evaluation.classification;
        if previous != Some(current) {
            log::debug!(
                "{}: {} -> {} (value {})",
                target.key,
                previous.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                current,
                sample.value
            );
        }

        let mut kinds = evaluation.kinds;
        if restored {
            kinds.push(AlertKind::SourceRestored);
        }

        let events = kinds
            .into_iter()
            .map(|kind| {
                AlertEvent::new(
                    target.key.clone(),
                    kind,
                    previous,
                    current,
                    Some(sample.clone()),
                    now,
                )
            })
            .collect();

        let outcome = Outcome::Classified {
            previous,
            current,
            value: sample.value,
        };
        (outcome, events)
    }

    fn record_failure(
        &self,
        watch: &Watch,
        error: SampleError,
        now: SystemTime,
    ) -> (Outcome, Vec<AlertEvent>) {
        let threshold = self.failure_threshold;
        let key = watch.key();

        let (consecutive, raise, known) = self.store.transition(key, |state| {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            let raise =
                threshold > 0 && !state.unavailable && state.consecutive_failures >= threshold;
            if raise {
                state.unavailable = true;
            }
            (state.consecutive_failures, raise, state.classification)
        });

        log::warn!(
            "{}: sampling via {} failed ({} in a row): {}",
            key,
            watch.source.describe(),
            consecutive,
            error
        );

        let mut events = Vec::new();
        if raise {
            events.push(AlertEvent::new(
                key,
                AlertKind::SourceUnavailable,
                known,
                known.unwrap_or_default(),
                None,
                now,
            ));
        }

        let outcome = Outcome::Failed {
            error: error.to_string(),
            consecutive,
        };
        (outcome, events)
    }

    fn admit(&self, target: &MonitorTarget, event: &AlertEvent, now: SystemTime) -> bool {
        match target.cooldowns.cooldown_for(&event.kind) {
            Some(window) => {
                self.gate
                    .admit(&event.target_key, &event.cooldown_key(), now, window)
            }
            None => true,
        }
    }
}

/// Sample a watch, turning a panicking source into an error
fn sample_guarded(watch: &Watch) -> Result<Sample, SampleError> {
    panic::catch_unwind(AssertUnwindSafe(|| watch.source.sample(&watch.target)))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(SampleError::Panicked(message))
        })
        .and_then(Sample::validate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Condition, CooldownPolicy, ThresholdRule, ThresholdRuleSet};
    use crate::mock::{FailingSink, ManualClock, RecordingSink, ScriptedSource};
    use crate::sinks::SinkRegistry;

    const MINUTE: Duration = Duration::from_secs(60);

    struct Harness {
        engine: Engine,
        clock: Arc<ManualClock>,
        recorder: RecordingSink,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_sinks(SinkRegistry::new())
        }

        /// Harness whose registry also holds a sink that always fails, as "broken"
        fn with_broken_sink() -> Self {
            let mut sinks = SinkRegistry::new();
            sinks.add("broken", Box::new(FailingSink));
            Self::with_sinks(sinks)
        }

        fn with_sinks(mut sinks: SinkRegistry) -> Self {
            let recorder = RecordingSink::new();
            sinks.add("recorder", Box::new(recorder.clone()));
            let dispatcher = Arc::new(Dispatcher::new(sinks).unwrap());
            let clock = Arc::new(ManualClock::new());
            let engine = Engine::new(dispatcher).with_clock(clock.clone());
            Self {
                engine,
                clock,
                recorder,
            }
        }

        /// Run one cycle at `offset` from the clock's origin
        fn cycle_at(&self, offset: Duration, watches: &[Watch]) -> CycleReport {
            self.clock.set_offset(offset);
            self.engine.run_cycle(watches)
        }

        fn delivered(&self) -> Vec<AlertEvent> {
            self.engine.dispatcher().shutdown();
            self.recorder.events()
        }
    }

    fn kinds(report: &CycleReport) -> Vec<String> {
        report.admitted().map(|e| e.kind.to_string()).collect()
    }

    fn disk_target(key: &str) -> MonitorTarget {
        MonitorTarget::new(
            key,
            ThresholdRuleSet::new(vec![
                ThresholdRule::new(Severity::Warning, Condition::AtLeast(80.0)).unwrap(),
                ThresholdRule::new(Severity::Critical, Condition::AtLeast(90.0)).unwrap(),
            ]),
        )
    }

    fn iowait_target() -> MonitorTarget {
        MonitorTarget::new(
            "sdb",
            ThresholdRuleSet::new(vec![
                ThresholdRule::new(Severity::Warning, Condition::AtLeast(20.0)).unwrap(),
                ThresholdRule::new(Severity::Critical, Condition::AtLeast(40.0)).unwrap(),
            ]),
        )
        .with_cooldowns(
            CooldownPolicy::new(Duration::ZERO).with_cooldown("entered_warning", 5 * MINUTE),
        )
    }

    fn watch(target: MonitorTarget, source: ScriptedSource) -> Watch {
        Watch::new(target, Arc::new(source), MINUTE)
    }

    #[test]
    fn test_iowait_scenario() {
        let h = Harness::new();
        let source = ScriptedSource::values(&[5.0, 25.0, 25.0, 15.0]);
        let watches = vec![watch(iowait_target(), source)];

        let r0 = h.cycle_at(Duration::ZERO, &watches);
        assert!(kinds(&r0).is_empty());

        let r1 = h.cycle_at(MINUTE, &watches);
        assert_eq!(kinds(&r1), vec!["entered_warning"]);

        // still warning: no new crossing, nothing to gate
        let r3 = h.cycle_at(3 * MINUTE, &watches);
        assert!(kinds(&r3).is_empty());
        assert_eq!(r3.suppressed().count(), 0);

        // recovery is not cooldown-gated by default
        let r7 = h.cycle_at(7 * MINUTE, &watches);
        assert_eq!(kinds(&r7), vec!["recovered"]);

        let delivered: Vec<_> = h.delivered().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            delivered,
            vec![AlertKind::Entered(Severity::Warning), AlertKind::Recovered]
        );
    }

    #[test]
    fn test_flapping_inside_cooldown_is_suppressed() {
        let h = Harness::new();
        let source = ScriptedSource::values(&[5.0, 25.0, 5.0, 25.0, 5.0, 25.0]);
        let watches = vec![watch(iowait_target(), source)];

        h.cycle_at(Duration::ZERO, &watches);
        let r1 = h.cycle_at(MINUTE, &watches);
        assert_eq!(kinds(&r1), vec!["entered_warning"]);
        let r2 = h.cycle_at(2 * MINUTE, &watches);
        assert_eq!(kinds(&r2), vec!["recovered"]);

        // second crossing within 5 minutes of the first admission
        let r3 = h.cycle_at(3 * MINUTE, &watches);
        assert!(kinds(&r3).is_empty());
        assert_eq!(r3.suppressed().count(), 1);
        // state still moved to WARNING despite suppression
        assert_eq!(
            h.engine.store().classification("sdb"),
            Some(Severity::Warning)
        );

        // so the following de-escalation is still detected
        let r4 = h.cycle_at(4 * MINUTE, &watches);
        assert_eq!(kinds(&r4), vec!["recovered"]);

        // the suppressed attempt did not extend the window opened at t=1min
        let r6 = h.cycle_at(6 * MINUTE, &watches);
        assert_eq!(kinds(&r6), vec!["entered_warning"]);
    }

    #[test]
    fn test_gated_recovery() {
        let h = Harness::new();
        let target = iowait_target().with_cooldowns(
            CooldownPolicy::new(Duration::ZERO)
                .with_cooldown("recovered", 10 * MINUTE)
                .gating_recovery(true),
        );
        let source = ScriptedSource::values(&[25.0, 5.0, 25.0, 5.0]);
        let watches = vec![watch(target, source)];

        h.cycle_at(Duration::ZERO, &watches);
        let r1 = h.cycle_at(MINUTE, &watches);
        assert_eq!(kinds(&r1), vec!["recovered"]);
        let r2 = h.cycle_at(2 * MINUTE, &watches);
        assert_eq!(kinds(&r2), vec!["entered_warning"]);
        let r3 = h.cycle_at(3 * MINUTE, &watches);
        assert!(kinds(&r3).is_empty());
        assert_eq!(r3.suppressed().next().unwrap().kind, AlertKind::Recovered);
    }

    #[test]
    fn test_sustained_breach_fires_once() {
        let h = Harness::new();
        let source = ScriptedSource::values(&[10.0, 85.0, 85.0, 86.0, 88.0, 84.0]);
        let watches = vec![watch(disk_target("diskA"), source)];

        let mut fired = Vec::new();
        for i in 0..6 {
            fired.extend(kinds(&h.cycle_at(i * MINUTE, &watches)));
        }
        assert_eq!(fired, vec!["entered_warning"]);
    }

    #[test]
    fn test_critical_then_recovered_without_warning() {
        let h = Harness::new();
        let source = ScriptedSource::values(&[10.0, 95.0, 95.0, 70.0]);
        let watches = vec![watch(disk_target("diskA"), source)];

        let mut fired = Vec::new();
        for i in 0..4 {
            fired.extend(kinds(&h.cycle_at(i * MINUTE, &watches)));
        }
        assert_eq!(fired, vec!["entered_critical", "recovered"]);
    }

    #[test]
    fn test_first_observation_is_silent() {
        let h = Harness::new();
        let watches = vec![watch(disk_target("diskA"), ScriptedSource::values(&[95.0]))];

        let report = h.cycle_at(Duration::ZERO, &watches);
        assert!(kinds(&report).is_empty());
        assert_eq!(
            report.target("diskA").unwrap().outcome,
            Outcome::Classified {
                previous: None,
                current: Severity::Critical,
                value: 95.0
            }
        );
    }

    #[test]
    fn test_failure_isolated_to_target() {
        let h = Harness::new();
        let watches = vec![
            watch(disk_target("diskA"), ScriptedSource::failing()),
            watch(disk_target("diskB"), ScriptedSource::values(&[10.0, 95.0])),
        ];

        h.cycle_at(Duration::ZERO, &watches);
        let report = h.cycle_at(MINUTE, &watches);

        assert_eq!(report.failures(), 1);
        assert_eq!(kinds(&report), vec!["entered_critical"]);
        assert_eq!(report.admitted().next().unwrap().target_key, "diskB");
    }

    #[test]
    fn test_failure_keeps_last_classification() {
        let h = Harness::new();
        let source = ScriptedSource::script(vec![
            Ok(95.0),
            Err("tool missing"),
            Ok(95.0),
            Ok(70.0),
        ]);
        let watches = vec![watch(disk_target("diskA"), source)];

        h.cycle_at(Duration::ZERO, &watches);
        let failed = h.cycle_at(MINUTE, &watches);
        assert_eq!(failed.failures(), 1);
        assert_eq!(
            h.engine.store().classification("diskA"),
            Some(Severity::Critical)
        );

        // no synthetic transition after the error
        let again = h.cycle_at(2 * MINUTE, &watches);
        assert!(kinds(&again).is_empty());
        let recovered = h.cycle_at(3 * MINUTE, &watches);
        assert_eq!(kinds(&recovered), vec!["recovered"]);
    }

    #[test]
    fn test_unavailable_after_three_failures_then_restored() {
        let h = Harness::new();
        let source = ScriptedSource::script(vec![
            Ok(10.0),
            Err("timeout"),
            Err("timeout"),
            Err("timeout"),
            Err("timeout"),
            Ok(12.0),
        ]);
        let watches = vec![watch(disk_target("vpn0"), source)];

        let mut fired = Vec::new();
        for i in 0..6 {
            fired.push(kinds(&h.cycle_at(i * MINUTE, &watches)));
        }

        assert!(fired[1].is_empty());
        assert!(fired[2].is_empty());
        assert_eq!(fired[3], vec!["source_unavailable"]);
        assert!(fired[4].is_empty(), "raised once per failure streak");
        assert_eq!(fired[5], vec!["source_restored"]);
        assert_eq!(h.engine.store().get("vpn0").unwrap().consecutive_failures, 0);
    }

    #[test]
    fn test_panicking_source_is_contained() {
        let h = Harness::new();
        let panicking = |_: &MonitorTarget| -> Result<Sample, SampleError> {
            panic!("parser exploded");
        };
        let watches = vec![
            Watch::new(disk_target("bad"), Arc::new(panicking), MINUTE),
            watch(disk_target("good"), ScriptedSource::values(&[10.0])),
        ];

        let report = h.cycle_at(Duration::ZERO, &watches);
        match &report.target("bad").unwrap().outcome {
            Outcome::Failed { error, .. } => assert!(error.contains("parser exploded")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(matches!(
            report.target("good").unwrap().outcome,
            Outcome::Classified { .. }
        ));
    }

    #[test]
    fn test_non_threshold_events_are_gated() {
        let h = Harness::new();
        let target = disk_target("mail").with_cooldowns(
            CooldownPolicy::new(Duration::ZERO).with_cooldown("handshake_failed", 10 * MINUTE),
        );
        let source = ScriptedSource::samples(vec![
            Sample::new(1.0).with_event("handshake_failed"),
            Sample::new(1.0).with_event("handshake_failed"),
        ]);
        let watches = vec![watch(target, source)];

        let r0 = h.cycle_at(Duration::ZERO, &watches);
        assert_eq!(kinds(&r0), vec!["handshake_failed"]);
        let r1 = h.cycle_at(MINUTE, &watches);
        assert!(kinds(&r1).is_empty());
        assert_eq!(r1.suppressed().count(), 1);
    }

    #[test]
    fn test_independent_cooldowns_across_targets() {
        let h = Harness::new();
        let policy = CooldownPolicy::new(10 * MINUTE);
        let watches = vec![
            watch(
                disk_target("diskA").with_cooldowns(policy.clone()),
                ScriptedSource::values(&[10.0, 85.0]),
            ),
            watch(
                disk_target("diskB").with_cooldowns(policy),
                ScriptedSource::values(&[10.0, 85.0]),
            ),
        ];

        h.cycle_at(Duration::ZERO, &watches);
        let report = h.cycle_at(MINUTE, &watches);
        assert_eq!(report.admitted().count(), 2);
    }

    #[test]
    fn test_sink_failure_keeps_admission() {
        let h = Harness::with_broken_sink();
        let source = ScriptedSource::values(&[5.0, 25.0, 5.0, 25.0]);
        let watches = vec![watch(iowait_target(), source).with_sinks(vec!["broken".to_string()])];

        h.cycle_at(Duration::ZERO, &watches);
        let r1 = h.cycle_at(MINUTE, &watches);
        assert_eq!(kinds(&r1), vec!["entered_warning"]);

        let waited = std::time::Instant::now();
        while h.engine.dispatcher().stats().failed < 1 {
            assert!(waited.elapsed() < Duration::from_secs(5), "delivery never attempted");
            std::thread::sleep(Duration::from_millis(5));
        }

        h.cycle_at(2 * MINUTE, &watches);
        let r3 = h.cycle_at(3 * MINUTE, &watches);
        assert!(kinds(&r3).is_empty());
        assert_eq!(
            r3.suppressed().next().unwrap().kind,
            AlertKind::Entered(Severity::Warning)
        );
        assert!(h.delivered().is_empty());
    }

    #[test]
    fn test_source_unavailable_is_cooldown_gated() {
        let h = Harness::new();
        let target = disk_target("vpn0").with_cooldowns(
            CooldownPolicy::new(Duration::ZERO).with_cooldown("source_unavailable", 30 * MINUTE),
        );
        let source = ScriptedSource::script(vec![
            Ok(10.0),
            Err("timeout"),
            Err("timeout"),
            Err("timeout"),
            Ok(10.0),
            Err("timeout"),
            Err("timeout"),
            Err("timeout"),
            Ok(10.0),
        ]);
        let watches = vec![watch(target, source)];

        let reports: Vec<_> = (0..9)
            .map(|i| h.cycle_at(i * MINUTE, &watches))
            .collect();

        assert_eq!(kinds(&reports[3]), vec!["source_unavailable"]);
        assert_eq!(kinds(&reports[4]), vec!["source_restored"]);

        // second streak ends inside the 30 minute window
        assert!(kinds(&reports[7]).is_empty());
        assert_eq!(
            reports[7].suppressed().next().unwrap().kind,
            AlertKind::SourceUnavailable
        );
        assert_eq!(kinds(&reports[8]), vec!["source_restored"]);
    }
}
