//! A record-oriented batch processing engine core.
//!
//! Wires a [`Reader`] through a [`Pipeline`] of [`Stage`]s into a batch accumulator and a
//! [`Writer`], with listener hooks at every lifecycle boundary, an error-count threshold, and an
//! optional batch-scanning recovery path for write failures. A [`JobExecutor`] runs one or many
//! jobs concurrently; a read-only [`Monitor`] exposes live status and metrics for jobs that opt
//! into it.
//!
//! ```
//! use batchwright::{Batch, Error, Job, JobBuilder, JobParameters, JobStatus, Reader, Writer};
//! use async_trait::async_trait;
//!
//! struct Numbers(std::vec::IntoIter<i32>);
//!
//! #[async_trait]
//! impl Reader<i32> for Numbers {
//!     async fn read_record(&mut self) -> Result<Option<i32>, Error> {
//!         Ok(self.0.next())
//!     }
//! }
//!
//! struct Sink;
//!
//! #[async_trait]
//! impl Writer<i32> for Sink {
//!     async fn write_records(&mut self, _batch: &Batch<i32>) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let job: Job<i32> = JobBuilder::new()
//!     .parameters(JobParameters::default().with_name("demo"))
//!     .reader(Box::new(Numbers(vec![1, 2, 3].into_iter())))
//!     .writer(Box::new(Sink))
//!     .build()
//!     .unwrap();
//!
//! let report = job.run().await;
//! assert_eq!(report.status, JobStatus::Completed);
//! # }
//! ```

mod batch_loop;
/// Per-job and per-executor configuration types.
pub mod config;
mod error;
mod executor;
/// Small stock pipeline stages shipped with the engine.
pub mod filters;
mod io;
mod listener;
mod metrics;
mod monitor;
mod pipeline;
mod record;
mod report;

pub use batch_loop::{Job, JobBuilder, JobHandle};
pub use config::{ExecutorConfig, JobParameters};
pub use error::Error;
pub use executor::{JobExecutor, JobId};
pub use filters::NumberRangeFilter;
pub use io::{Reader, Writer};
pub use listener::{
    BatchListener, JobListener, ListenerHub, PipelineListener, ReaderListener, WriterListener,
};
pub use metrics::{Metrics, MetricsSnapshot};
pub use monitor::{JobMonitorSnapshot, Monitor};
pub use pipeline::{Pipeline, PipelineOutcome, Stage};
pub use record::{Batch, Header, Record};
pub use report::{AtomicJobStatus, JobReport, JobStatus};
