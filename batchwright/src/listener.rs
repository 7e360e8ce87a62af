//! Listener traits and the hub that fan them out in the ordering §4.2 requires.
//!
//! `before*` hooks run forward (first registered, first called); `after*` and `on*Exception`
//! hooks run in reverse (last registered, first called) so that listener invocation "unwinds"
//! symmetrically, the same way a middleware stack would. A listener that returns an error is
//! logged and does not stop its peers from being invoked, nor does it affect the report — the one
//! exception is `beforeRecordProcessing`, whose error is reinterpreted as a pipeline error for
//! that record (§4.2).

use async_trait::async_trait;
use tracing::warn;

use crate::config::JobParameters;
use crate::error::Error;
use crate::record::{Batch, Record};
use crate::report::JobReport;

/// Job-level lifecycle hooks. Not generic over the payload type: these only ever see parameters
/// and the final report.
#[async_trait]
pub trait JobListener: Send + Sync {
    /// Called once, before the reader/writer are opened.
    async fn before_job(&self, _params: &JobParameters) -> Result<(), Error> {
        Ok(())
    }

    /// Called once, after the job has reached a terminal status, with the final report.
    async fn after_job(&self, _report: &JobReport) -> Result<(), Error> {
        Ok(())
    }
}

/// Batch-level lifecycle hooks.
#[async_trait]
pub trait BatchListener<T>: Send + Sync {
    /// Called before the loop starts filling a new batch.
    async fn before_batch_reading(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Called after the batch has been filled (successfully or by reader exhaustion) and before
    /// it is handed to the writer.
    async fn after_batch_processing(&self, _batch: &Batch<T>) -> Result<(), Error> {
        Ok(())
    }

    /// Called after the batch (or scanning singleton) has been written successfully.
    async fn after_batch_writing(&self, _batch: &Batch<T>) -> Result<(), Error> {
        Ok(())
    }

    /// Called when `writer.write_records` raised for this batch (or scanning singleton).
    async fn on_batch_writing_exception(&self, _batch: &Batch<T>, _cause: &Error) -> Result<(), Error> {
        Ok(())
    }
}

/// Reader-level lifecycle hooks, fired once per record read attempt.
#[async_trait]
pub trait ReaderListener<T>: Send + Sync {
    /// Called before each call to `reader.read_record`.
    async fn before_record_reading(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Called after a record has been read successfully.
    async fn after_record_reading(&self, _record: &Record<T>) -> Result<(), Error> {
        Ok(())
    }

    /// Called when `reader.read_record` raised.
    async fn on_record_reading_exception(&self, _cause: &Error) -> Result<(), Error> {
        Ok(())
    }
}

/// Writer-level lifecycle hooks, fired once per write attempt (a full batch or a scanning
/// singleton).
#[async_trait]
pub trait WriterListener<T>: Send + Sync {
    /// Called before `writer.write_records` is invoked.
    async fn before_record_writing(&self, _batch: &Batch<T>) -> Result<(), Error> {
        Ok(())
    }

    /// Called after a write succeeds.
    async fn after_record_writing(&self, _batch: &Batch<T>) -> Result<(), Error> {
        Ok(())
    }

    /// Called when a write raised.
    async fn on_record_writing_exception(&self, _batch: &Batch<T>, _cause: &Error) -> Result<(), Error> {
        Ok(())
    }
}

/// Pipeline-level hooks, fired once per record entering/leaving the pipeline.
#[async_trait]
pub trait PipelineListener<T>: Send + Sync {
    /// Pre-processing hook. Chained forward across all pipeline listeners; returning `Ok(None)`
    /// skips the record (it is not filtered, not errored — see §4.1/§3 invariant 3).
    async fn before_record_processing(&self, record: Record<T>) -> Result<Option<Record<T>>, Error> {
        Ok(Some(record))
    }

    /// Called after a record exits the pipeline, whatever the outcome. `output` is `None` when
    /// the record was skipped by a pre-processing hook or filtered by a stage.
    async fn after_record_processing(&self, _input: &Record<T>, _output: Option<&Record<T>>) -> Result<(), Error> {
        Ok(())
    }

    /// Called when a pipeline stage raised while processing `record`.
    async fn on_record_processing_exception(&self, _record: &Record<T>, _cause: &Error) -> Result<(), Error> {
        Ok(())
    }
}

fn log_listener_error(hook: &str, err: Error) {
    warn!(hook, error = %err, "listener callback failed");
}

/// Holds the five listener lists and dispatches them in registration order (`before*`) or reverse
/// registration order (`after*`/`on*`).
pub struct ListenerHub<T> {
    job: Vec<Box<dyn JobListener>>,
    batch: Vec<Box<dyn BatchListener<T>>>,
    reader: Vec<Box<dyn ReaderListener<T>>>,
    writer: Vec<Box<dyn WriterListener<T>>>,
    pipeline: Vec<Box<dyn PipelineListener<T>>>,
}

impl<T> Default for ListenerHub<T> {
    fn default() -> Self {
        ListenerHub {
            job: Vec::new(),
            batch: Vec::new(),
            reader: Vec::new(),
            writer: Vec::new(),
            pipeline: Vec::new(),
        }
    }
}

impl<T> ListenerHub<T> {
    /// Build an empty hub.
    pub fn new() -> Self {
        ListenerHub::default()
    }

    /// Register a job listener. Later registrations run later in `before*`, earlier in `after*`.
    pub fn add_job_listener(&mut self, listener: Box<dyn JobListener>) {
        self.job.push(listener);
    }

    /// Register a batch listener.
    pub fn add_batch_listener(&mut self, listener: Box<dyn BatchListener<T>>) {
        self.batch.push(listener);
    }

    /// Register a reader listener.
    pub fn add_reader_listener(&mut self, listener: Box<dyn ReaderListener<T>>) {
        self.reader.push(listener);
    }

    /// Register a writer listener.
    pub fn add_writer_listener(&mut self, listener: Box<dyn WriterListener<T>>) {
        self.writer.push(listener);
    }

    /// Register a pipeline listener.
    pub fn add_pipeline_listener(&mut self, listener: Box<dyn PipelineListener<T>>) {
        self.pipeline.push(listener);
    }

    /// Fire `beforeJob` forward across all job listeners.
    pub async fn before_job(&self, params: &JobParameters) {
        for listener in self.job.iter() {
            if let Err(err) = listener.before_job(params).await {
                log_listener_error("beforeJob", err);
            }
        }
    }

    /// Fire `afterJob` in reverse across all job listeners.
    pub async fn after_job(&self, report: &JobReport) {
        for listener in self.job.iter().rev() {
            if let Err(err) = listener.after_job(report).await {
                log_listener_error("afterJob", err);
            }
        }
    }

    /// Fire `beforeBatchReading` forward across all batch listeners.
    pub async fn before_batch_reading(&self) {
        for listener in self.batch.iter() {
            if let Err(err) = listener.before_batch_reading().await {
                log_listener_error("beforeBatchReading", err);
            }
        }
    }

    /// Fire `afterBatchProcessing` in reverse across all batch listeners.
    pub async fn after_batch_processing(&self, batch: &Batch<T>) {
        for listener in self.batch.iter().rev() {
            if let Err(err) = listener.after_batch_processing(batch).await {
                log_listener_error("afterBatchProcessing", err);
            }
        }
    }

    /// Fire `afterBatchWriting` in reverse across all batch listeners.
    pub async fn after_batch_writing(&self, batch: &Batch<T>) {
        for listener in self.batch.iter().rev() {
            if let Err(err) = listener.after_batch_writing(batch).await {
                log_listener_error("afterBatchWriting", err);
            }
        }
    }

    /// Fire `onBatchWritingException` in reverse across all batch listeners.
    pub async fn on_batch_writing_exception(&self, batch: &Batch<T>, cause: &Error) {
        for listener in self.batch.iter().rev() {
            if let Err(err) = listener.on_batch_writing_exception(batch, cause).await {
                log_listener_error("onBatchWritingException", err);
            }
        }
    }

    /// Fire `beforeRecordReading` forward across all reader listeners.
    pub async fn before_record_reading(&self) {
        for listener in self.reader.iter() {
            if let Err(err) = listener.before_record_reading().await {
                log_listener_error("beforeRecordReading", err);
            }
        }
    }

    /// Fire `afterRecordReading` in reverse across all reader listeners.
    pub async fn after_record_reading(&self, record: &Record<T>) {
        for listener in self.reader.iter().rev() {
            if let Err(err) = listener.after_record_reading(record).await {
                log_listener_error("afterRecordReading", err);
            }
        }
    }

    /// Fire `onRecordReadingException` in reverse across all reader listeners.
    pub async fn on_record_reading_exception(&self, cause: &Error) {
        for listener in self.reader.iter().rev() {
            if let Err(err) = listener.on_record_reading_exception(cause).await {
                log_listener_error("onRecordReadingException", err);
            }
        }
    }

    /// Fire `beforeRecordWriting` forward across all writer listeners.
    pub async fn before_record_writing(&self, batch: &Batch<T>) {
        for listener in self.writer.iter() {
            if let Err(err) = listener.before_record_writing(batch).await {
                log_listener_error("beforeRecordWriting", err);
            }
        }
    }

    /// Fire `afterRecordWriting` in reverse across all writer listeners.
    pub async fn after_record_writing(&self, batch: &Batch<T>) {
        for listener in self.writer.iter().rev() {
            if let Err(err) = listener.after_record_writing(batch).await {
                log_listener_error("afterRecordWriting", err);
            }
        }
    }

    /// Fire `onRecordWritingException` in reverse across all writer listeners.
    pub async fn on_record_writing_exception(&self, batch: &Batch<T>, cause: &Error) {
        for listener in self.writer.iter().rev() {
            if let Err(err) = listener.on_record_writing_exception(batch, cause).await {
                log_listener_error("onRecordWritingException", err);
            }
        }
    }

    /// Run the pre-processing hook chain forward. `Ok(None)` from any listener skips the record:
    /// remaining listeners are not consulted for `before_record_processing`, but the caller is
    /// still responsible for firing `afterRecordProcessing(input, None)` in reverse afterwards.
    pub async fn before_record_processing(&self, record: Record<T>) -> Result<Option<Record<T>>, Error> {
        let mut current = record;
        for listener in self.pipeline.iter() {
            match listener.before_record_processing(current).await {
                Ok(Some(next)) => current = next,
                Ok(None) => return Ok(None),
                Err(err) => return Err(err),
            }
        }
        Ok(Some(current))
    }

    /// Fire `afterRecordProcessing` in reverse across all pipeline listeners.
    pub async fn after_record_processing(&self, input: &Record<T>, output: Option<&Record<T>>) {
        for listener in self.pipeline.iter().rev() {
            if let Err(err) = listener.after_record_processing(input, output).await {
                log_listener_error("afterRecordProcessing", err);
            }
        }
    }

    /// Fire `onRecordProcessingException` in reverse across all pipeline listeners.
    pub async fn on_record_processing_exception(&self, record: &Record<T>, cause: &Error) {
        for listener in self.pipeline.iter().rev() {
            if let Err(err) = listener.on_record_processing_exception(record, cause).await {
                log_listener_error("onRecordProcessingException", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingJobListener {
        id: &'static str,
        log: std::sync::Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl JobListener for RecordingJobListener {
        async fn before_job(&self, _params: &JobParameters) -> Result<(), Error> {
            self.log.lock().unwrap().push(self.id);
            Ok(())
        }

        async fn after_job(&self, _report: &JobReport) -> Result<(), Error> {
            self.log.lock().unwrap().push(self.id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn before_job_runs_forward_after_job_runs_reverse() {
        let log = std::sync::Arc::new(Mutex::new(Vec::new()));
        let mut hub: ListenerHub<i32> = ListenerHub::new();
        hub.add_job_listener(Box::new(RecordingJobListener { id: "a", log: log.clone() }));
        hub.add_job_listener(Box::new(RecordingJobListener { id: "b", log: log.clone() }));

        let params = JobParameters::default();
        hub.before_job(&params).await;
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);

        log.lock().unwrap().clear();
        let report = JobReport::new(
            params,
            crate::report::JobStatus::Completed,
            crate::metrics::MetricsSnapshot::default(),
            None,
        );
        hub.after_job(&report).await;
        assert_eq!(*log.lock().unwrap(), vec!["b", "a"]);
    }

    struct SkippingPipelineListener;

    #[async_trait]
    impl PipelineListener<i32> for SkippingPipelineListener {
        async fn before_record_processing(&self, record: Record<i32>) -> Result<Option<Record<i32>>, Error> {
            if record.payload == 2 {
                Ok(None)
            } else {
                Ok(Some(record))
            }
        }
    }

    #[tokio::test]
    async fn before_record_processing_skip_short_circuits() {
        let mut hub: ListenerHub<i32> = ListenerHub::new();
        hub.add_pipeline_listener(Box::new(SkippingPipelineListener));

        let kept = hub.before_record_processing(Record::new(1, "s")).await.unwrap();
        assert!(kept.is_some());

        let skipped = hub.before_record_processing(Record::new(2, "s")).await.unwrap();
        assert!(skipped.is_none());
    }

    struct FailingListener;

    #[async_trait]
    impl JobListener for FailingListener {
        async fn before_job(&self, _params: &JobParameters) -> Result<(), Error> {
            Err(Error::Listener("boom".into()))
        }
    }

    #[tokio::test]
    async fn a_failing_listener_does_not_prevent_its_peers() {
        let log = std::sync::Arc::new(Mutex::new(Vec::new()));
        let mut hub: ListenerHub<i32> = ListenerHub::new();
        hub.add_job_listener(Box::new(FailingListener));
        hub.add_job_listener(Box::new(RecordingJobListener { id: "b", log: log.clone() }));

        hub.before_job(&JobParameters::default()).await;
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }
}
