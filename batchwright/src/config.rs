//! Per-job and per-executor configuration surface.
//!
//! There is no file- or YAML-driven configuration layer in this crate: callers build these
//! structs directly, the same way the engine's readers, writers and stages are supplied as code.

use serde::{Deserialize, Serialize};

/// The whole per-job configuration surface.
///
/// # Example
///
/// ```
/// use batchwright::JobParameters;
///
/// let params = JobParameters::default()
///     .with_name("nightly-import")
///     .with_batch_size(100)
///     .with_error_threshold(5);
/// assert_eq!(params.name, "nightly-import");
/// assert_eq!(params.effective_batch_size(), 100);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters {
    /// Job name, used for logging, the monitor registry key, and the report.
    pub name: String,
    /// Maximum number of records accumulated before a write; must be at least 1.
    pub batch_size: usize,
    /// Maximum tolerated `errorCount` before the job is escalated to `FAILED`. `None` means no
    /// threshold (infinite tolerance), matching the source default.
    pub error_threshold: Option<u64>,
    /// Whether to publish this job's status/metrics into the process-wide [`crate::Monitor`]
    /// registry.
    pub jmx_enabled: bool,
    /// Whether a non-scanning batch write failure should instead trigger the batch-scanning
    /// recovery protocol (§4.4).
    pub batch_scanning_enabled: bool,
}

impl Default for JobParameters {
    fn default() -> Self {
        JobParameters {
            name: "job".to_string(),
            batch_size: 500,
            error_threshold: None,
            jmx_enabled: false,
            batch_scanning_enabled: false,
        }
    }
}

impl JobParameters {
    /// Set the job name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the batch size. Zero is coerced to 1 (see [`JobParameters::effective_batch_size`]).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set a finite error threshold.
    pub fn with_error_threshold(mut self, error_threshold: u64) -> Self {
        self.error_threshold = Some(error_threshold);
        self
    }

    /// Enable monitor registration.
    pub fn with_jmx_enabled(mut self, jmx_enabled: bool) -> Self {
        self.jmx_enabled = jmx_enabled;
        self
    }

    /// Enable batch-scanning recovery.
    pub fn with_batch_scanning_enabled(mut self, batch_scanning_enabled: bool) -> Self {
        self.batch_scanning_enabled = batch_scanning_enabled;
        self
    }

    /// The batch size the loop will actually use; a configured `0` is treated as `1` rather than
    /// stalling the loop forever.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// The threshold the loop will actually check against, with "no threshold" resolved to
    /// `u64::MAX` so a plain `errorCount > threshold` comparison implements §4.3/§4.4 directly.
    pub fn effective_error_threshold(&self) -> u64 {
        self.error_threshold.unwrap_or(u64::MAX)
    }
}

/// Configuration for a [`crate::JobExecutor`].
#[derive(Clone, Debug, Default)]
pub struct ExecutorConfig {
    /// Optional label used in log spans to distinguish multiple executors in one process.
    pub label: Option<String>,
}

impl ExecutorConfig {
    /// Set the executor's label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_match_documented_defaults() {
        let params = JobParameters::default();
        assert_eq!(params.name, "job");
        assert_eq!(params.batch_size, 500);
        assert_eq!(params.effective_error_threshold(), u64::MAX);
        assert!(!params.jmx_enabled);
        assert!(!params.batch_scanning_enabled);
    }

    #[test]
    fn zero_batch_size_is_coerced_to_one() {
        let params = JobParameters::default().with_batch_size(0);
        assert_eq!(params.effective_batch_size(), 1);
    }

    #[test]
    fn explicit_threshold_is_used_verbatim() {
        let params = JobParameters::default().with_error_threshold(3);
        assert_eq!(params.effective_error_threshold(), 3);
    }

    #[test]
    fn builder_methods_chain() {
        let params = JobParameters::default()
            .with_name("demo")
            .with_batch_size(10)
            .with_error_threshold(2)
            .with_jmx_enabled(true)
            .with_batch_scanning_enabled(true);
        assert_eq!(params.name, "demo");
        assert_eq!(params.batch_size, 10);
        assert_eq!(params.error_threshold, Some(2));
        assert!(params.jmx_enabled);
        assert!(params.batch_scanning_enabled);
    }
}
