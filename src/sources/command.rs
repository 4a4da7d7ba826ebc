//! Command data source
//!
//! Runs an external tool and reads the first numeric or boolean token from
//! its stdout. The child is killed if it outlives its time budget.

use super::DataSource;
use crate::domain::{MonitorTarget, Sample};
use crate::error::SampleError;
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is polled for exit
const POLL_STEP: Duration = Duration::from_millis(20);

/// External command data source
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSource {
    /// Default time budget for one invocation
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a command source
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Set the time budget
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured time budget
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn spawn(&self) -> Result<Child, SampleError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SampleError::NotFound(self.program.clone()),
                _ => SampleError::Io(e),
            })
    }

    fn timed_out(&self) -> SampleError {
        SampleError::Timeout {
            program: self.program.clone(),
            after: self.timeout,
        }
    }

    fn wait_bounded(
        &self,
        child: &mut Child,
        deadline: Instant,
    ) -> Result<std::process::ExitStatus, SampleError> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    log::warn!("Failed to kill timed out '{}': {}", self.program, e);
                }
                // Reap so the child does not linger as a zombie
                let _ = child.wait();
                return Err(self.timed_out());
            }
            thread::sleep(POLL_STEP);
        }
    }
}

impl DataSource for CommandSource {
    fn sample(&self, target: &MonitorTarget) -> Result<Sample, SampleError> {
        let deadline = Instant::now() + self.timeout;
        let mut child = self.spawn()?;

        // Drain stdout concurrently so a chatty child cannot block on a full pipe.
        // Descendants may keep the pipe open after the child exits, so the
        // reader is only waited on until the deadline and detached after that.
        let (tx, rx) = mpsc::channel();
        if let Some(mut stdout) = child.stdout.take() {
            thread::spawn(move || {
                let mut output = String::new();
                let _ = tx.send(stdout.read_to_string(&mut output).map(|_| output));
            });
        } else {
            let _ = tx.send(Ok(String::new()));
        }

        let status = self.wait_bounded(&mut child, deadline)?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        let output = match rx.recv_timeout(remaining) {
            Ok(output) => output?,
            Err(RecvTimeoutError::Timeout) => return Err(self.timed_out()),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(SampleError::Malformed("stdout reader panicked".into()))
            }
        };

        if !status.success() {
            return Err(SampleError::ExitStatus {
                program: self.program.clone(),
                code: status.code(),
            });
        }

        log::trace!("{}: '{}' printed {:?}", target.key, self.program, output.trim());
        Sample::parse(&output)
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}
