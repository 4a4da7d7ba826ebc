//! Data sources
//!
//! A data source produces the current sample for a target. Concrete
//! monitors plug in here; the engine does not care how a value is obtained.

mod command;
mod file;

pub use command::CommandSource;
pub use file::FileSource;

use crate::domain::{MonitorTarget, Sample};
use crate::error::SampleError;

/// Trait for anything that can sample a monitor target
///
/// Implementations that block (external tools, network I/O) must bound
/// their own execution time.
pub trait DataSource: Send + Sync {
    /// Obtain the current sample for `target`
    fn sample(&self, target: &MonitorTarget) -> Result<Sample, SampleError>;

    /// Short description for logs and listings
    fn describe(&self) -> String;
}

impl<F> DataSource for F
where
    F: Fn(&MonitorTarget) -> Result<Sample, SampleError> + Send + Sync,
{
    fn sample(&self, target: &MonitorTarget) -> Result<Sample, SampleError> {
        self(target)
    }

    fn describe(&self) -> String {
        "closure".to_string()
    }
}
