//! The driver: owns the `INIT -> OPEN -> LOOP -> DRAIN -> CLOSE -> DONE` state machine, batching,
//! scanning-on-failure, the error threshold, cancellation, and resource lifecycle.
//!
//! The five states are not reified as a public enum — the control flow below *is* the state
//! machine, expressed the same way this codebase's other state-driven loop
//! (its original streaming runtime) reads: a sequence of awaited steps with early returns on any
//! terminal transition, rather than a dispatch loop over an explicit state value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, instrument, warn};

use crate::config::JobParameters;
use crate::error::Error;
use crate::io::{Reader, Writer};
use crate::listener::ListenerHub;
use crate::metrics::Metrics;
use crate::monitor;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::record::{Batch, Record};
use crate::report::{AtomicJobStatus, JobReport, JobStatus};

/// A lightweight, cloneable handle used to request cancellation of a running [`Job`] and to read
/// its live status, without holding the job itself (which is moved into `run`).
#[derive(Clone)]
pub struct JobHandle {
    cancel: Arc<AtomicBool>,
    status: Arc<AtomicJobStatus>,
}

impl JobHandle {
    /// Request cancellation. Idempotent; safe to call more than once or after the job has
    /// already finished.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested (not necessarily yet observed by the loop).
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// The job's current status, read without blocking the loop.
    pub fn status(&self) -> JobStatus {
        self.status.load()
    }
}

/// Outcome of feeding one record through the pre-processing hook chain and the pipeline.
enum RecordOutcome<T> {
    Accepted(Record<T>),
    Filtered,
    Skipped,
    Errored,
}

/// Outcome of attempting to write one batch (or, while scanning, one singleton).
enum WriteOutcome {
    Done,
    Fatal,
}

/// One configured run of reader -> pipeline -> writer. Build with [`JobBuilder`].
pub struct Job<T> {
    parameters: JobParameters,
    reader: Box<dyn Reader<T>>,
    writer: Box<dyn Writer<T>>,
    pipeline: Pipeline<T>,
    listeners: ListenerHub<T>,
    metrics: Arc<Metrics>,
    status: Arc<AtomicJobStatus>,
    cancel: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl<T: Clone + Send + Sync + 'static> Job<T> {
    /// A cloneable handle for cancelling this job and polling its status from outside `run`.
    pub fn handle(&self) -> JobHandle {
        JobHandle {
            cancel: self.cancel.clone(),
            status: self.status.clone(),
        }
    }

    /// The job's configured name.
    pub fn name(&self) -> &str {
        &self.parameters.name
    }

    fn record_first_error(&self, message: String) {
        let mut guard = self.last_error.lock().expect("job last_error lock poisoned");
        if guard.is_none() {
            *guard = Some(message);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Drive the job to completion: open, loop batches to exhaustion or a fatal/cancelled exit,
    /// close, and produce the final report. Consumes the job — a `Job` runs exactly once.
    #[instrument(skip_all, fields(job = %self.parameters.name))]
    pub async fn run(mut self) -> JobReport {
        let params = self.parameters.clone();
        self.listeners.before_job(&params).await;

        if params.jmx_enabled {
            monitor::register(
                params.name.clone(),
                self.status.clone(),
                self.metrics.clone(),
                self.last_error.clone(),
            );
        }

        self.metrics.mark_started();
        debug!("job opening reader and writer");

        match self.reader.open().await {
            Ok(()) => match self.writer.open().await {
                Ok(()) => {
                    self.status.store(JobStatus::Started);
                    debug!("job started");
                }
                Err(err) => {
                    error!(error = %err, "writer open failed");
                    self.record_first_error(format!("writer open failed: {err}"));
                    self.status.store(JobStatus::Failed);
                }
            },
            Err(err) => {
                error!(error = %err, "reader open failed");
                self.record_first_error(format!("reader open failed: {err}"));
                self.status.store(JobStatus::Failed);
            }
        }

        if self.status.load() == JobStatus::Started {
            self.drive().await;
        }

        // Both collaborators' `close` are safe to call even if `open` failed or was never
        // reached (see `Reader`/`Writer`'s contract), so both are always attempted here,
        // regardless of which open call (if any) failed.
        if let Err(err) = self.reader.close().await {
            warn!(error = %err, "reader close failed");
            self.record_first_error(format!("reader close failed: {err}"));
        }
        if let Err(err) = self.writer.close().await {
            warn!(error = %err, "writer close failed");
            self.record_first_error(format!("writer close failed: {err}"));
        }

        if self.status.load() == JobStatus::Started {
            self.status.store(JobStatus::Completed);
        }
        self.metrics.mark_ended();
        info!(status = %self.status.load(), "job done");

        let report = JobReport::new(
            params.clone(),
            self.status.load(),
            self.metrics.snapshot(),
            self.last_error.lock().expect("job last_error lock poisoned").clone(),
        );
        self.listeners.after_job(&report).await;

        if params.jmx_enabled {
            monitor::unregister(&params.name);
        }

        report
    }

    /// `LOOP`/`DRAIN`: repeatedly fill and write batches until the reader is exhausted, a fatal
    /// error occurs, or cancellation is observed. Always leaves `self.status` set to `Started`
    /// (meaning: ran to exhaustion, to be resolved to `Completed` by the caller), `Failed`, or
    /// `Aborted`.
    async fn drive(&mut self) {
        loop {
            if self.is_cancelled() {
                debug!("cancellation observed between batches");
                self.status.store(JobStatus::Aborted);
                return;
            }

            self.listeners.before_batch_reading().await;
            let mut batch: Batch<T> = Batch::new();
            let mut reader_exhausted = false;

            while batch.len() < self.parameters.effective_batch_size() {
                if self.is_cancelled() {
                    debug!("cancellation observed mid-batch at the read boundary");
                    self.status.store(JobStatus::Aborted);
                    return;
                }

                self.listeners.before_record_reading().await;
                match self.reader.read_record().await {
                    Ok(None) => {
                        reader_exhausted = true;
                        break;
                    }
                    Ok(Some(payload)) => {
                        let number = self.metrics.record_read();
                        let mut record = Record::new(payload, self.parameters.name.clone());
                        record.header.number = number;
                        self.listeners.after_record_reading(&record).await;

                        match self.process_record(record).await {
                            RecordOutcome::Filtered => {
                                self.metrics.record_filter();
                            }
                            RecordOutcome::Skipped => {
                                // Neither filtered nor errored, per §3 invariant 3.
                            }
                            RecordOutcome::Errored => {
                                let count = self.metrics.record_error();
                                if count > self.parameters.effective_error_threshold() {
                                    warn!(error_count = count, "error threshold exceeded");
                                    self.record_first_error(format!(
                                        "error threshold exceeded: {count} errors"
                                    ));
                                    self.status.store(JobStatus::Failed);
                                    return;
                                }
                            }
                            RecordOutcome::Accepted(accepted) => {
                                batch.push(accepted);
                            }
                        }
                    }
                    Err(err) => {
                        error!(error = %err, "reader read failed");
                        self.listeners.on_record_reading_exception(&err).await;
                        self.record_first_error(format!("reader read failed: {err}"));
                        self.status.store(JobStatus::Failed);
                        return;
                    }
                }
            }

            if !batch.is_empty() {
                self.listeners.after_batch_processing(&batch).await;

                if self.is_cancelled() {
                    debug!("cancellation observed before write boundary, batch dropped");
                    self.status.store(JobStatus::Aborted);
                    return;
                }

                match self.write_batch(&batch).await {
                    WriteOutcome::Done => {}
                    WriteOutcome::Fatal => {
                        self.status.store(JobStatus::Failed);
                        return;
                    }
                }
            }

            if reader_exhausted {
                return;
            }
        }
    }

    /// Run one record through the pre-processing hook chain and, if not skipped, the pipeline.
    async fn process_record(&self, record: Record<T>) -> RecordOutcome<T> {
        match self.listeners.before_record_processing(record.clone()).await {
            Ok(None) => {
                self.listeners.after_record_processing(&record, None).await;
                RecordOutcome::Skipped
            }
            Ok(Some(staged)) => {
                let original_input = staged.clone();
                match self.pipeline.process(staged).await {
                    PipelineOutcome::Accepted(output) => {
                        self.listeners
                            .after_record_processing(&original_input, Some(&output))
                            .await;
                        RecordOutcome::Accepted(output)
                    }
                    PipelineOutcome::Filtered => {
                        self.listeners.after_record_processing(&original_input, None).await;
                        RecordOutcome::Filtered
                    }
                    PipelineOutcome::Errored(cause) => {
                        self.listeners
                            .on_record_processing_exception(&original_input, &cause)
                            .await;
                        RecordOutcome::Errored
                    }
                }
            }
            Err(cause) => {
                self.listeners.on_record_processing_exception(&record, &cause).await;
                RecordOutcome::Errored
            }
        }
    }

    /// Attempt to write a full batch. On failure, either fails the job outright (no scanning) or
    /// enters the batch-scanning recovery protocol (§4.4).
    async fn write_batch(&mut self, batch: &Batch<T>) -> WriteOutcome {
        self.listeners.before_record_writing(batch).await;
        match self.writer.write_records(batch).await {
            Ok(()) => {
                self.metrics.record_write(batch.len() as u64);
                self.listeners.after_record_writing(batch).await;
                self.listeners.after_batch_writing(batch).await;
                WriteOutcome::Done
            }
            Err(cause) => {
                warn!(error = %cause, batch_size = batch.len(), "batch write failed");
                self.listeners.on_record_writing_exception(batch, &cause).await;
                self.listeners.on_batch_writing_exception(batch, &cause).await;

                if !self.parameters.batch_scanning_enabled {
                    self.metrics.record_errors(batch.len() as u64);
                    self.record_first_error(format!("writer write failed: {cause}"));
                    WriteOutcome::Fatal
                } else {
                    // The failed batch itself counts as one error event, separate from whatever
                    // scan_batch finds while re-presenting its records one at a time.
                    self.metrics.record_error();
                    self.scan_batch(batch).await
                }
            }
        }
    }

    /// Re-present every record of a failed batch as its own singleton batch, in insertion order,
    /// so the poison record(s) can be pinpointed. Never recurses: a singleton that itself fails
    /// is never re-scanned.
    async fn scan_batch(&mut self, batch: &Batch<T>) -> WriteOutcome {
        for record in batch.iter() {
            let mut singleton = Batch::new();
            singleton.push(record.clone().into_scanned());

            self.listeners.before_record_writing(&singleton).await;
            match self.writer.write_records(&singleton).await {
                Ok(()) => {
                    self.metrics.record_write(1);
                    self.listeners.after_record_writing(&singleton).await;
                    self.listeners.after_batch_writing(&singleton).await;
                }
                Err(cause) => {
                    self.listeners.on_record_writing_exception(&singleton, &cause).await;
                    self.listeners.on_batch_writing_exception(&singleton, &cause).await;
                    let count = self.metrics.record_error();
                    if count > self.parameters.effective_error_threshold() {
                        warn!(error_count = count, "error threshold exceeded during batch scanning");
                        self.record_first_error(format!(
                            "writer write failed during batch scanning: {cause}"
                        ));
                        return WriteOutcome::Fatal;
                    }
                }
            }
        }
        WriteOutcome::Done
    }
}

/// Fluent builder for [`Job`], mirroring this codebase's other configuration builders.
pub struct JobBuilder<T> {
    parameters: JobParameters,
    reader: Option<Box<dyn Reader<T>>>,
    writer: Option<Box<dyn Writer<T>>>,
    pipeline: Pipeline<T>,
    listeners: ListenerHub<T>,
}

impl<T: Send + Sync> Default for JobBuilder<T> {
    fn default() -> Self {
        JobBuilder {
            parameters: JobParameters::default(),
            reader: None,
            writer: None,
            pipeline: Pipeline::new(),
            listeners: ListenerHub::new(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> JobBuilder<T> {
    /// Start a builder with default parameters.
    pub fn new() -> Self {
        JobBuilder::default()
    }

    /// Replace the job parameters wholesale.
    pub fn parameters(mut self, parameters: JobParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the reader. Required before `build`.
    pub fn reader(mut self, reader: Box<dyn Reader<T>>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Set the writer. Required before `build`.
    pub fn writer(mut self, writer: Box<dyn Writer<T>>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Append a pipeline stage.
    pub fn add_stage(mut self, stage: Box<dyn crate::pipeline::Stage<T>>) -> Self {
        self.pipeline.add_stage(stage);
        self
    }

    /// Register a job listener.
    pub fn add_job_listener(mut self, listener: Box<dyn crate::listener::JobListener>) -> Self {
        self.listeners.add_job_listener(listener);
        self
    }

    /// Register a batch listener.
    pub fn add_batch_listener(mut self, listener: Box<dyn crate::listener::BatchListener<T>>) -> Self {
        self.listeners.add_batch_listener(listener);
        self
    }

    /// Register a reader listener.
    pub fn add_reader_listener(mut self, listener: Box<dyn crate::listener::ReaderListener<T>>) -> Self {
        self.listeners.add_reader_listener(listener);
        self
    }

    /// Register a writer listener.
    pub fn add_writer_listener(mut self, listener: Box<dyn crate::listener::WriterListener<T>>) -> Self {
        self.listeners.add_writer_listener(listener);
        self
    }

    /// Register a pipeline listener.
    pub fn add_pipeline_listener(mut self, listener: Box<dyn crate::listener::PipelineListener<T>>) -> Self {
        self.listeners.add_pipeline_listener(listener);
        self
    }

    /// Build the job. Fails if no reader or writer was supplied.
    pub fn build(self) -> Result<Job<T>, Error> {
        let reader = self
            .reader
            .ok_or_else(|| Error::MissingCollaborator("no reader configured".to_string()))?;
        let writer = self
            .writer
            .ok_or_else(|| Error::MissingCollaborator("no writer configured".to_string()))?;

        Ok(Job {
            parameters: self.parameters,
            reader,
            writer,
            pipeline: self.pipeline,
            listeners: self.listeners,
            metrics: Arc::new(Metrics::new()),
            status: Arc::new(AtomicJobStatus::new()),
            cancel: Arc::new(AtomicBool::new(false)),
            last_error: Arc::new(Mutex::new(None)),
        })
    }
}
