//! Reader and writer contracts the batch loop drives. Concrete implementations (file, queue,
//! database, …) are external collaborators supplied by the caller; this crate only defines and
//! drives the contract.

use async_trait::async_trait;

use crate::error::Error;
use crate::record::Batch;

/// Source of records for a job.
///
/// Must be safe to call `close` even if `open` failed or was never called.
#[async_trait]
pub trait Reader<T>: Send {
    /// Acquire any resources needed before reading. Default no-op.
    async fn open(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Read the next record, or `Ok(None)` at end of input.
    async fn read_record(&mut self) -> Result<Option<T>, Error>;

    /// Release resources. Called exactly once per run, regardless of outcome. Default no-op.
    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Sink for batches of records written by a job.
///
/// Must be safe to call `close` even if `open` failed or was never called.
#[async_trait]
pub trait Writer<T>: Send {
    /// Acquire any resources needed before writing. Default no-op.
    async fn open(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Write every record in `batch`. Raising fails the whole batch (§4.4).
    async fn write_records(&mut self, batch: &Batch<T>) -> Result<(), Error>;

    /// Release resources. Called exactly once per run, regardless of outcome. Default no-op.
    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
