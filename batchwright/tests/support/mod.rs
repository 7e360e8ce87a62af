//! In-memory reader/writer test doubles shared by the integration suite.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use batchwright::{Batch, Error, JobHandle, Reader, Writer};

/// Reads a fixed, in-memory list of payloads, one per call, then `Ok(None)`.
pub struct VecReader<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> VecReader<T> {
    pub fn new(items: Vec<T>) -> Self {
        VecReader { items: items.into_iter() }
    }
}

#[async_trait]
impl<T: Send> Reader<T> for VecReader<T> {
    async fn read_record(&mut self) -> Result<Option<T>, Error> {
        Ok(self.items.next())
    }
}

/// Collects every batch it is handed, in order, always succeeding.
pub struct CollectingWriter<T> {
    pub batches: Arc<Mutex<Vec<Vec<T>>>>,
}

impl<T> CollectingWriter<T> {
    pub fn new(batches: Arc<Mutex<Vec<Vec<T>>>>) -> Self {
        CollectingWriter { batches }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> Writer<T> for CollectingWriter<T> {
    async fn write_records(&mut self, batch: &Batch<T>) -> Result<(), Error> {
        let payloads: Vec<T> = batch.iter().map(|r| r.payload.clone()).collect();
        self.batches.lock().unwrap().push(payloads);
        Ok(())
    }
}

/// Fails `write_records` whenever the batch size is at least `fail_at`; otherwise delegates to an
/// inner collecting writer. Used to exercise batch-scanning recovery (§4.4).
pub struct FailAboveSizeWriter<T> {
    pub fail_at: usize,
    pub batches: Arc<Mutex<Vec<Vec<T>>>>,
}

impl<T> FailAboveSizeWriter<T> {
    pub fn new(fail_at: usize, batches: Arc<Mutex<Vec<Vec<T>>>>) -> Self {
        FailAboveSizeWriter { fail_at, batches }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> Writer<T> for FailAboveSizeWriter<T> {
    async fn write_records(&mut self, batch: &Batch<T>) -> Result<(), Error> {
        if batch.len() >= self.fail_at {
            return Err(Error::WriterWrite("batch too large".into()));
        }
        let payloads: Vec<T> = batch.iter().map(|r| r.payload.clone()).collect();
        self.batches.lock().unwrap().push(payloads);
        Ok(())
    }
}

/// Wraps an inner writer and cancels a job's own handle once a write has succeeded `trigger_after`
/// times. The handle is supplied after the job is built (a `Job`'s handle only exists once built,
/// while the writer must be handed to the builder beforehand) via a shared cell filled in before
/// `run`/`submit` is called, so there is no race between the writer's check and the loop's.
pub struct SelfCancelingWriter<T, W> {
    inner: W,
    cell: Arc<Mutex<Option<JobHandle>>>,
    trigger_after: usize,
    seen: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T, W> SelfCancelingWriter<T, W> {
    pub fn new(inner: W, cell: Arc<Mutex<Option<JobHandle>>>, trigger_after: usize) -> Self {
        SelfCancelingWriter {
            inner,
            cell,
            trigger_after,
            seen: 0,
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<T, W> Writer<T> for SelfCancelingWriter<T, W>
where
    T: Clone + Send + Sync,
    W: Writer<T>,
{
    async fn write_records(&mut self, batch: &Batch<T>) -> Result<(), Error> {
        self.inner.write_records(batch).await?;
        self.seen += 1;
        if self.seen >= self.trigger_after {
            if let Some(handle) = self.cell.lock().unwrap().as_ref() {
                handle.cancel();
            }
        }
        Ok(())
    }
}
