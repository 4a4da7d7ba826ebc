//! File data source
//!
//! Reads a counter or status file such as `/sys/class/net/eth0/carrier`.

use super::DataSource;
use crate::domain::{MonitorTarget, Sample};
use crate::error::SampleError;
use std::path::{Path, PathBuf};

/// Single-value file data source
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a file source
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path being read
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn sample(&self, _target: &MonitorTarget) -> Result<Sample, SampleError> {
        let contents = std::fs::read_to_string(&self.path)?;
        Sample::parse(&contents)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ThresholdRuleSet;
    use std::io::Write;

    #[test]
    fn test_reads_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1").unwrap();

        let source = FileSource::new(file.path());
        let target = MonitorTarget::new("eth0", ThresholdRuleSet::default());
        assert_eq!(source.sample(&target).unwrap().value, 1.0);
    }

    #[test]
    fn test_missing_file() {
        let source = FileSource::new("/nonexistent/edgewatch/value");
        let target = MonitorTarget::new("eth0", ThresholdRuleSet::default());
        assert!(matches!(source.sample(&target), Err(SampleError::Io(_))));
    }
}
