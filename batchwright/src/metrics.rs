//! Monotonic per-job counters, safe to read from the job's own loop and from the [`crate::Monitor`]
//! concurrently.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owns a job's live counters behind atomics so the [`crate::Monitor`] can take a consistent-enough
/// sample without locking out the loop that is still writing to them.
///
/// All counters only ever increase during a run; a `Metrics` is created once per job execution
/// and discarded with it (re-running the same `Job` value is not supported — see [`crate::Job`]).
#[derive(Debug, Default)]
pub struct Metrics {
    read_count: AtomicU64,
    write_count: AtomicU64,
    filter_count: AtomicU64,
    error_count: AtomicU64,
    start_time: Mutex<Option<DateTime<Utc>>>,
    end_time: Mutex<Option<DateTime<Utc>>>,
}

impl Metrics {
    /// Build a fresh, zeroed counter set.
    pub fn new() -> Self {
        Metrics::default()
    }

    /// Record the job's start instant. Called once, entering `OPEN`.
    pub fn mark_started(&self) {
        *self.start_time.lock().expect("metrics start_time lock poisoned") = Some(Utc::now());
    }

    /// Record the job's end instant. Called once, entering `DONE`.
    pub fn mark_ended(&self) {
        *self.end_time.lock().expect("metrics end_time lock poisoned") = Some(Utc::now());
    }

    /// Increment `readCount` by one and return the new value, used to assign `header.number`.
    pub fn record_read(&self) -> u64 {
        self.read_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Increment `writeCount` by `n`.
    pub fn record_write(&self, n: u64) {
        self.write_count.fetch_add(n, Ordering::Relaxed);
    }

    /// Increment `filterCount` by one.
    pub fn record_filter(&self) {
        self.filter_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment `errorCount` by one and return the new value, used to check the error threshold.
    pub fn record_error(&self) -> u64 {
        self.error_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Increment `errorCount` by `n` and return the new value.
    pub fn record_errors(&self, n: u64) -> u64 {
        self.error_count.fetch_add(n, Ordering::Relaxed) + n
    }

    /// Current `readCount`.
    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Current `writeCount`.
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    /// Current `filterCount`.
    pub fn filter_count(&self) -> u64 {
        self.filter_count.load(Ordering::Relaxed)
    }

    /// Current `errorCount`.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Take a point-in-time, consistent-enough snapshot of every counter and timestamp.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            start_time: *self.start_time.lock().expect("metrics start_time lock poisoned"),
            end_time: *self.end_time.lock().expect("metrics end_time lock poisoned"),
            read_count: self.read_count(),
            write_count: self.write_count(),
            filter_count: self.filter_count(),
            error_count: self.error_count(),
        }
    }
}

/// An immutable, owned copy of a job's counters at a single instant. Used by [`crate::JobReport`]
/// and by [`crate::Monitor`] snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// When the job entered `OPEN`, if it got that far.
    pub start_time: Option<DateTime<Utc>>,
    /// When the job entered `DONE`, if it finished.
    pub end_time: Option<DateTime<Utc>>,
    /// Records successfully read.
    pub read_count: u64,
    /// Records successfully written (including scanning singletons).
    pub write_count: u64,
    /// Records dropped by a filter stage or a `beforeRecordProcessing` skip.
    pub filter_count: u64,
    /// Records that failed processing or writing.
    pub error_count: u64,
}
