//! Mock implementations for testing
//!
//! Provides scripted data sources, recording sinks and a manual clock so the
//! engine can be exercised without external tools or real time.

use crate::domain::{AlertEvent, AlertKind, MonitorTarget, Sample, Severity};
use crate::engine::Clock;
use crate::error::{SampleError, SinkError};
use crate::sinks::NotificationSink;
use crate::sources::DataSource;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Data source that replays a script; the last step repeats once exhausted
#[derive(Debug)]
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Result<Sample, String>>>,
    last: Mutex<Option<Result<Sample, String>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    /// Replay full samples
    pub fn samples(samples: Vec<Sample>) -> Self {
        Self::from_steps(samples.into_iter().map(Ok).collect())
    }

    /// Replay plain values
    pub fn values(values: &[f64]) -> Self {
        Self::samples(values.iter().copied().map(Sample::new).collect())
    }

    /// Replay values and failures
    pub fn script(steps: Vec<Result<f64, &str>>) -> Self {
        Self::from_steps(
            steps
                .into_iter()
                .map(|s| s.map(Sample::new).map_err(str::to_string))
                .collect(),
        )
    }

    /// Always fail
    pub fn failing() -> Self {
        Self::from_steps(VecDeque::from([Err("scripted failure".to_string())]))
    }

    fn from_steps(steps: VecDeque<Result<Sample, String>>) -> Self {
        Self {
            steps: Mutex::new(steps),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times `sample` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataSource for ScriptedSource {
    fn sample(&self, _target: &MonitorTarget) -> Result<Sample, SampleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut last = self.last.lock().unwrap();
        if let Some(step) = self.steps.lock().unwrap().pop_front() {
            *last = Some(step);
        }

        match last.clone() {
            Some(Ok(sample)) => Ok(sample),
            Some(Err(message)) => Err(SampleError::Malformed(message)),
            None => Err(SampleError::Malformed("empty script".to_string())),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Data source that counts calls and optionally takes its time
#[derive(Debug, Default)]
pub struct CountingSource {
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CountingSource {
    /// Source that answers after `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping calls seen
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl DataSource for CountingSource {
    fn sample(&self, _target: &MonitorTarget) -> Result<Sample, SampleError> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Sample::new(1.0))
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

/// Sink that keeps every event it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AlertEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &AlertEvent) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Sink that always fails
#[derive(Debug, Clone, Copy)]
pub struct FailingSink;

impl NotificationSink for FailingSink {
    fn notify(&self, _event: &AlertEvent) -> Result<(), SinkError> {
        Err(SinkError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "sink unavailable",
        )))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Sink that takes a while to deliver
#[derive(Debug, Clone, Copy)]
pub struct SlowSink(pub Duration);

impl NotificationSink for SlowSink {
    fn notify(&self, _event: &AlertEvent) -> Result<(), SinkError> {
        std::thread::sleep(self.0);
        Ok(())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Clock moved by hand
#[derive(Debug)]
pub struct ManualClock {
    origin: SystemTime,
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new() -> Self {
        let origin = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        Self {
            origin,
            now: Mutex::new(origin),
        }
    }

    /// Jump to `offset` after the origin
    pub fn set_offset(&self, offset: Duration) {
        *self.now.lock().unwrap() = self.origin + offset;
    }

    /// Move forward
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }
}

/// A NORMAL -> WARNING event at the epoch
pub fn sample_event(target: &str) -> AlertEvent {
    AlertEvent::new(
        target,
        AlertKind::Entered(Severity::Warning),
        Some(Severity::Normal),
        Severity::Warning,
        Some(Sample::new(85.0)),
        SystemTime::UNIX_EPOCH,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ThresholdRuleSet;

    #[test]
    fn test_scripted_source_repeats_last() {
        let source = ScriptedSource::values(&[1.0, 2.0]);
        let target = MonitorTarget::new("t", ThresholdRuleSet::default());
        assert_eq!(source.sample(&target).unwrap().value, 1.0);
        assert_eq!(source.sample(&target).unwrap().value, 2.0);
        assert_eq!(source.sample(&target).unwrap().value, 2.0);
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(30));
        assert_eq!(clock.now().duration_since(start).unwrap().as_secs(), 30);
    }
}
