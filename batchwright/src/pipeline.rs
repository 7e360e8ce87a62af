//! The ordered, record-level transformation chain between reader and writer.
//!
//! The source model names three stage kinds — filter, validator, and a cross-type
//! `processor<A,B>` — that are really one shape from the pipeline's point of view: given one
//! record, either transform it, drop it, or fail. This crate unifies all three behind a single
//! [`Stage`] trait fixed to one payload type `T` per [`Pipeline`]. A caller who needs genuine
//! `A -> B` conversion does it in the reader's decode step or the writer's encode step, both of
//! which already sit outside the pipeline. See `SPEC_FULL.md` §4.1 for the full reasoning.

use async_trait::async_trait;

use crate::error::Error;
use crate::record::Record;

/// A single record-level transformation, filter, or validation step.
///
/// Returning `Ok(None)` drops the record ("filtered"). Returning `Err` fails the record
/// ("errored") and short-circuits the remaining stages.
#[async_trait]
pub trait Stage<T>: Send + Sync {
    /// Apply this stage to one record.
    async fn apply(&self, record: &Record<T>) -> Result<Option<Record<T>>, Error>;
}

/// Outcome of running one record through a [`Pipeline`].
pub enum PipelineOutcome<T> {
    /// Every stage accepted the record; this is the transformed result.
    Accepted(Record<T>),
    /// A stage returned `None`: the record is dropped, not an error.
    Filtered,
    /// A stage raised: the record is dropped, recorded as an error.
    Errored(Error),
}

/// An ordered chain of [`Stage`]s applied to one record at a time.
pub struct Pipeline<T> {
    stages: Vec<Box<dyn Stage<T>>>,
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Pipeline { stages: Vec::new() }
    }
}

impl<T: Send + Sync> Pipeline<T> {
    /// Build an empty pipeline; records pass through unchanged.
    pub fn new() -> Self {
        Pipeline::default()
    }

    /// Append a stage to the end of the chain.
    pub fn add_stage(&mut self, stage: Box<dyn Stage<T>>) {
        self.stages.push(stage);
    }

    /// Run `record` through every stage in order, stopping at the first drop or failure.
    pub async fn process(&self, record: Record<T>) -> PipelineOutcome<T> {
        let mut current = record;
        for stage in self.stages.iter() {
            match stage.apply(&current).await {
                Ok(Some(next)) => current = next,
                Ok(None) => return PipelineOutcome::Filtered,
                Err(err) => return PipelineOutcome::Errored(err),
            }
        }
        PipelineOutcome::Accepted(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    #[async_trait]
    impl Stage<i32> for Identity {
        async fn apply(&self, record: &Record<i32>) -> Result<Option<Record<i32>>, Error> {
            Ok(Some(record.clone()))
        }
    }

    struct DropEvens;

    #[async_trait]
    impl Stage<i32> for DropEvens {
        async fn apply(&self, record: &Record<i32>) -> Result<Option<Record<i32>>, Error> {
            if record.payload % 2 == 0 {
                Ok(None)
            } else {
                Ok(Some(record.clone()))
            }
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Stage<i32> for AlwaysFails {
        async fn apply(&self, _record: &Record<i32>) -> Result<Option<Record<i32>>, Error> {
            Err(Error::Stage("always fails".into()))
        }
    }

    #[tokio::test]
    async fn empty_pipeline_accepts_unchanged() {
        let pipeline: Pipeline<i32> = Pipeline::new();
        let record = Record::new(7, "src");
        match pipeline.process(record.clone()).await {
            PipelineOutcome::Accepted(out) => assert_eq!(out.payload, record.payload),
            _ => panic!("expected Accepted"),
        }
    }

    #[tokio::test]
    async fn two_identity_stages_chain() {
        let mut pipeline: Pipeline<i32> = Pipeline::new();
        pipeline.add_stage(Box::new(Identity));
        pipeline.add_stage(Box::new(Identity));
        match pipeline.process(Record::new(5, "src")).await {
            PipelineOutcome::Accepted(out) => assert_eq!(out.payload, 5),
            _ => panic!("expected Accepted"),
        }
    }

    #[tokio::test]
    async fn a_filtering_stage_short_circuits() {
        let mut pipeline: Pipeline<i32> = Pipeline::new();
        pipeline.add_stage(Box::new(DropEvens));
        pipeline.add_stage(Box::new(AlwaysFails));
        match pipeline.process(Record::new(4, "src")).await {
            PipelineOutcome::Filtered => {}
            _ => panic!("expected Filtered, AlwaysFails must not run"),
        }
    }

    #[tokio::test]
    async fn a_failing_stage_short_circuits_and_reports_errored() {
        let mut pipeline: Pipeline<i32> = Pipeline::new();
        pipeline.add_stage(Box::new(AlwaysFails));
        pipeline.add_stage(Box::new(Identity));
        match pipeline.process(Record::new(1, "src")).await {
            PipelineOutcome::Errored(_) => {}
            _ => panic!("expected Errored"),
        }
    }
}
