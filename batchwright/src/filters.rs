//! Small stock stages shipped with the engine. Everything else (real filters, validators,
//! processors) is supplied by the caller.

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::Error;
use crate::pipeline::Stage;
use crate::record::Record;

/// Deprecated-in-spirit utility filter: drops any record whose `header.number` falls inside
/// `[low, high]` (inclusive). Included only for completeness — the predicate direction is
/// intentionally "filters records inside the range", not outside it; get this backwards and every
/// record in the common case (an unbounded, mostly-in-range source) is dropped instead of kept.
pub struct NumberRangeFilter<T> {
    low: u64,
    high: u64,
    _marker: PhantomData<T>,
}

impl<T> NumberRangeFilter<T> {
    /// Build a filter over the inclusive range `[low, high]`.
    pub fn new(low: u64, high: u64) -> Self {
        NumberRangeFilter {
            low,
            high,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> Stage<T> for NumberRangeFilter<T> {
    async fn apply(&self, record: &Record<T>) -> Result<Option<Record<T>>, Error> {
        if record.header.number >= self.low && record.header.number <= self.high {
            Ok(None)
        } else {
            Ok(Some(record.clone()))
        }
    }
}
