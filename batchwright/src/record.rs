//! Immutable record, header and batch types that flow between reader, pipeline and writer.

use chrono::{DateTime, Utc};

/// Metadata carried alongside every record's payload.
///
/// `number` is assigned by the batch loop when the record is read (1-based, monotonic within a
/// job) and is not meaningful before that point. `scanned` is set by the batch loop only while
/// re-presenting a previously failed batch one record at a time; callers never set it themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// 1-based sequence number assigned at read time.
    pub number: u64,
    /// Name of the source the record was read from, echoed for provenance/logging.
    pub source_name: String,
    /// Instant the record was constructed.
    pub creation_timestamp: DateTime<Utc>,
    /// True while this record is being re-written individually during batch scanning.
    pub scanned: bool,
}

impl Header {
    /// Build a fresh, unscanned header for a record about to be read.
    pub fn new(source_name: impl Into<String>) -> Self {
        Header {
            number: 0,
            source_name: source_name.into(),
            creation_timestamp: Utc::now(),
            scanned: false,
        }
    }
}

/// A single typed payload plus its header. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record<T> {
    /// Provenance and sequencing metadata.
    pub header: Header,
    /// The record's payload.
    pub payload: T,
}

impl<T> Record<T> {
    /// Wrap a payload with a fresh header sourced from `source_name`.
    pub fn new(payload: T, source_name: impl Into<String>) -> Self {
        Record {
            header: Header::new(source_name),
            payload,
        }
    }

    /// Return a copy of this record with `header.scanned` set to `true`.
    pub fn into_scanned(mut self) -> Self {
        self.header.scanned = true;
        self
    }
}

/// An ordered, read-only group of records handed to the writer atomically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch<T> {
    records: Vec<Record<T>>,
}

impl<T> Batch<T> {
    /// Build an empty batch.
    pub fn new() -> Self {
        Batch { records: Vec::new() }
    }

    /// Build a batch from an existing vector of records, preserving order.
    pub fn from_records(records: Vec<Record<T>>) -> Self {
        Batch { records }
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Read-only iteration over the batch's records, in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record<T>> {
        self.records.iter()
    }

    /// Append a record to the end of the batch.
    pub fn push(&mut self, record: Record<T>) {
        self.records.push(record);
    }

    /// Consume the batch, returning its records in order.
    pub fn into_records(self) -> Vec<Record<T>> {
        self.records
    }
}

impl<T> IntoIterator for Batch<T> {
    type Item = Record<T>;
    type IntoIter = std::vec::IntoIter<Record<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Batch<T> {
    type Item = &'a Record<T>;
    type IntoIter = std::slice::Iter<'a, Record<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_starts_unscanned_with_zero_number() {
        let header = Header::new("test-source");
        assert_eq!(header.number, 0);
        assert!(!header.scanned);
        assert_eq!(header.source_name, "test-source");
    }

    #[test]
    fn into_scanned_flips_only_the_flag() {
        let record = Record::new(42, "src").into_scanned();
        assert!(record.header.scanned);
        assert_eq!(record.payload, 42);
    }

    #[test]
    fn batch_preserves_insertion_order() {
        let mut batch = Batch::new();
        batch.push(Record::new(1, "src"));
        batch.push(Record::new(2, "src"));
        let payloads: Vec<_> = batch.iter().map(|r| r.payload).collect();
        assert_eq!(payloads, vec![1, 2]);
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
    }

    #[test]
    fn empty_batch_reports_empty() {
        let batch: Batch<i32> = Batch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}
