//! Terminal job status and the immutable report produced once per run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::JobParameters;
use crate::metrics::MetricsSnapshot;

/// A job's lifecycle state. Transitions: `Starting -> Started -> (Completed | Failed | Aborted)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// The job has been constructed but `run` has not yet opened the reader/writer.
    #[default]
    Starting,
    /// `open` succeeded on both reader and writer; the loop is driving batches.
    Started,
    /// The reader was exhausted and every buffered batch was written successfully.
    Completed,
    /// A fatal error (setup, read, processing-over-threshold, or write) ended the job early.
    Failed,
    /// Cancellation was observed and honored; no error occurred.
    Aborted,
}

impl JobStatus {
    /// Whether this status represents a finished job (anything but `Starting`/`Started`).
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Aborted)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            JobStatus::Starting => "STARTING",
            JobStatus::Started => "STARTED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Aborted => "ABORTED",
        };
        f.write_str(label)
    }
}

impl JobStatus {
    fn from_repr(repr: u8) -> Self {
        match repr {
            0 => JobStatus::Starting,
            1 => JobStatus::Started,
            2 => JobStatus::Completed,
            3 => JobStatus::Failed,
            _ => JobStatus::Aborted,
        }
    }

    fn to_repr(self) -> u8 {
        match self {
            JobStatus::Starting => 0,
            JobStatus::Started => 1,
            JobStatus::Completed => 2,
            JobStatus::Failed => 3,
            JobStatus::Aborted => 4,
        }
    }
}

/// Lock-free holder for a [`JobStatus`], shared between a running job's loop (single writer) and
/// any number of [`crate::Monitor`] readers.
#[derive(Debug, Default)]
pub struct AtomicJobStatus(std::sync::atomic::AtomicU8);

impl AtomicJobStatus {
    /// Build a holder initialized to `Starting`.
    pub fn new() -> Self {
        AtomicJobStatus(std::sync::atomic::AtomicU8::new(JobStatus::Starting.to_repr()))
    }

    /// Read the current status.
    pub fn load(&self) -> JobStatus {
        JobStatus::from_repr(self.0.load(std::sync::atomic::Ordering::Acquire))
    }

    /// Store a new status. The job loop is the only writer.
    pub fn store(&self, status: JobStatus) {
        self.0.store(status.to_repr(), std::sync::atomic::Ordering::Release);
    }
}

/// Terminal, immutable summary of one job's execution. Produced exactly once per run and handed
/// by reference to every `afterJob` listener.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobReport {
    /// The job's configured name.
    pub job_name: String,
    /// The parameters the job was built with.
    pub parameters: JobParameters,
    /// Final lifecycle status.
    pub status: JobStatus,
    /// Counters and timestamps at job end.
    pub metrics: MetricsSnapshot,
    /// The first-or-worst error recorded during the run, if any (see the close-failure policy).
    pub last_error: Option<String>,
    /// A small snapshot of process context taken at job start, for reports that outlive the job.
    pub system_properties: HashMap<String, String>,
}

impl JobReport {
    pub(crate) fn new(
        parameters: JobParameters,
        status: JobStatus,
        metrics: MetricsSnapshot,
        last_error: Option<String>,
    ) -> Self {
        let job_name = parameters.name.clone();
        let mut system_properties = HashMap::new();
        system_properties.insert("job_name".to_string(), job_name.clone());
        system_properties.insert("pid".to_string(), std::process::id().to_string());
        // The job's actual start instant (set by `Metrics::mark_started`), not when this report is
        // assembled at the end of the run.
        if let Some(start_time) = metrics.start_time {
            system_properties.insert("start_instant".to_string(), start_time.to_rfc3339());
        }

        JobReport {
            job_name,
            parameters,
            status,
            metrics,
            last_error,
            system_properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_uppercase_names() {
        assert_eq!(JobStatus::Starting.to_string(), "STARTING");
        assert_eq!(JobStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(JobStatus::Failed.to_string(), "FAILED");
        assert_eq!(JobStatus::Aborted.to_string(), "ABORTED");
    }

    #[test]
    fn only_final_states_are_terminal() {
        assert!(!JobStatus::Starting.is_terminal());
        assert!(!JobStatus::Started.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Aborted.is_terminal());
    }

    #[test]
    fn atomic_job_status_round_trips_through_every_variant() {
        let atomic = AtomicJobStatus::new();
        assert_eq!(atomic.load(), JobStatus::Starting);
        for status in [
            JobStatus::Started,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Aborted,
        ] {
            atomic.store(status);
            assert_eq!(atomic.load(), status);
        }
    }

    #[test]
    fn report_carries_job_name_into_system_properties() {
        let params = JobParameters::default().with_name("demo");
        let report = JobReport::new(params, JobStatus::Completed, MetricsSnapshot::default(), None);
        assert_eq!(report.system_properties.get("job_name").unwrap(), "demo");
        assert_eq!(report.job_name, "demo");
    }
}
