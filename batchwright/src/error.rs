//! Error type shared by every fallible entry point in the engine.
//!
//! Uses `thiserror` for ergonomic error handling with a proper `std::error::Error`
//! implementation. The batch loop never lets a variant of this type escape `Job::run`; it is
//! always captured into the job's `lastError` and, where §7 requires it, promoted to a fatal
//! status transition.

use thiserror::Error;

/// Enum capturing every way a job, its collaborators, or its listeners can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// `Reader::open` raised.
    #[error("reader open failed: {0}")]
    ReaderOpen(String),

    /// `Writer::open` raised.
    #[error("writer open failed: {0}")]
    WriterOpen(String),

    /// `Reader::read_record` raised.
    #[error("reader read failed: {0}")]
    ReaderRead(String),

    /// `Writer::write_records` raised.
    #[error("writer write failed: {0}")]
    WriterWrite(String),

    /// A pipeline stage raised while processing a record.
    #[error("pipeline stage failed: {0}")]
    Stage(String),

    /// `Reader::close` raised.
    #[error("reader close failed: {0}")]
    ReaderClose(String),

    /// `Writer::close` raised.
    #[error("writer close failed: {0}")]
    WriterClose(String),

    /// A listener callback raised. Never affects the report by itself; see §4.2.
    #[error("listener failed: {0}")]
    Listener(String),

    /// The error-count threshold for the job was exceeded.
    #[error("error threshold exceeded: {error_count} errors over threshold {threshold}")]
    ThresholdExceeded {
        /// Errors observed at the moment the threshold was crossed.
        error_count: u64,
        /// Configured threshold.
        threshold: u64,
    },

    /// A `JobBuilder` was asked to `build` without a required collaborator configured.
    #[error("job build failed: {0}")]
    MissingCollaborator(String),

    /// A job with this name is already running on the executor.
    #[error("job already running: {0}")]
    JobAlreadyRunning(String),

    /// No running job matches the given identifier.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// The executor was asked to operate after it had already shut down.
    #[error("executor has shut down")]
    ExecutorShutdown,

    /// A submitted job's task terminated abnormally (panicked or was aborted).
    #[error("job task failed to run to completion: {0}")]
    JobTaskFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_exceeded_message_carries_both_counts() {
        let err = Error::ThresholdExceeded {
            error_count: 5,
            threshold: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn display_messages_are_non_empty() {
        let errors: Vec<Error> = vec![
            Error::ReaderOpen("boom".into()),
            Error::WriterOpen("boom".into()),
            Error::ReaderRead("boom".into()),
            Error::WriterWrite("boom".into()),
            Error::Stage("boom".into()),
            Error::ReaderClose("boom".into()),
            Error::WriterClose("boom".into()),
            Error::Listener("boom".into()),
            Error::MissingCollaborator("no reader".into()),
            Error::JobAlreadyRunning("job".into()),
            Error::JobNotFound("job".into()),
            Error::ExecutorShutdown,
            Error::JobTaskFailed("panic".into()),
        ];
        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
