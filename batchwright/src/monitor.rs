//! Read-only, process-wide view of running jobs' status and metrics.
//!
//! Mirrors the registry key naming a JMX `MBean` would use (`…:type=JobMonitor,name=<jobName>`)
//! without standing up any actual management transport — this is purely an in-process table,
//! the same shape as this codebase's existing static plugin registry, sampled on demand rather
//! than pushed to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

use crate::metrics::Metrics;
use crate::report::{AtomicJobStatus, JobStatus};

static REGISTRY: Lazy<Mutex<HashMap<String, MonitorEntry>>> = Lazy::new(|| Mutex::new(HashMap::new()));

struct MonitorEntry {
    status: Arc<AtomicJobStatus>,
    metrics: Arc<Metrics>,
    last_error: Arc<Mutex<Option<String>>>,
}

/// A consistent-enough, point-in-time copy of one job's monitor attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobMonitorSnapshot {
    /// The registered job name.
    pub job_name: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Records read so far.
    pub read_count: u64,
    /// Records written so far.
    pub write_count: u64,
    /// Records filtered so far.
    pub filter_count: u64,
    /// Records errored so far.
    pub error_count: u64,
    /// When the job entered `OPEN`, if it has.
    pub start_time: Option<DateTime<Utc>>,
    /// When the job entered `DONE`, if it has.
    pub end_time: Option<DateTime<Utc>>,
    /// String form of the job's last recorded error, if any.
    pub last_error: Option<String>,
}

/// Read-only handle onto the process-wide job registry. `jmxEnabled` on a job's
/// [`crate::JobParameters`] gates whether that job ever appears here.
#[derive(Debug, Default, Clone, Copy)]
pub struct Monitor;

impl Monitor {
    /// Take a snapshot of the named job's attributes, or `None` if no such job is registered
    /// (never registered, `jmxEnabled=false`, or already unregistered after completion).
    pub fn snapshot(job_name: &str) -> Option<JobMonitorSnapshot> {
        let registry = REGISTRY.lock().expect("monitor registry lock poisoned");
        registry.get(job_name).map(|entry| {
            let metrics = entry.metrics.snapshot();
            JobMonitorSnapshot {
                job_name: job_name.to_string(),
                status: entry.status.load(),
                read_count: metrics.read_count,
                write_count: metrics.write_count,
                filter_count: metrics.filter_count,
                error_count: metrics.error_count,
                start_time: metrics.start_time,
                end_time: metrics.end_time,
                last_error: entry.last_error.lock().expect("monitor last_error lock poisoned").clone(),
            }
        })
    }

    /// Names of every job currently registered.
    pub fn registered_jobs() -> Vec<String> {
        REGISTRY
            .lock()
            .expect("monitor registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

/// Register a job's live handles under `job_name`. A second registration under the same name
/// replaces the first. Called by [`crate::Job::run`] when `jmxEnabled` is set.
pub(crate) fn register(
    job_name: String,
    status: Arc<AtomicJobStatus>,
    metrics: Arc<Metrics>,
    last_error: Arc<Mutex<Option<String>>>,
) {
    REGISTRY.lock().expect("monitor registry lock poisoned").insert(
        job_name,
        MonitorEntry {
            status,
            metrics,
            last_error,
        },
    );
}

/// Remove a job's entry from the registry. Called once the job reaches `DONE`.
pub(crate) fn unregister(job_name: &str) {
    REGISTRY.lock().expect("monitor registry lock poisoned").remove(job_name);
}
