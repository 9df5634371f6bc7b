//! Named transformation steps.

use super::transforms::{sort_records, update_scores, SortRecordsParams, UpdateScoresParams};
use super::FlowError;
use crate::record::{format_flag, Record};

/// One step of a transformation pipeline.
///
/// A step reads the previous collection and returns a new one; the input is
/// never modified, so intermediate states can be inspected or replayed.
pub trait TransformationStep: Send + Sync {
    /// Human-readable description including parameters
    fn name(&self) -> String;

    fn apply(&self, records: &[Record]) -> Result<Vec<Record>, FlowError>;
}

#[derive(Debug, Clone)]
pub struct UpdateScoresStep {
    params: UpdateScoresParams,
}

impl UpdateScoresStep {
    pub fn new(params: UpdateScoresParams) -> Self {
        Self { params }
    }
}

impl TransformationStep for UpdateScoresStep {
    fn name(&self) -> String {
        format!(
            "UpdateScores(delta={:?}, only_active={})",
            self.params.delta,
            format_flag(self.params.only_active)
        )
    }

    fn apply(&self, records: &[Record]) -> Result<Vec<Record>, FlowError> {
        Ok(update_scores(records, &self.params))
    }
}

#[derive(Debug, Clone)]
pub struct SortRecordsStep {
    params: SortRecordsParams,
}

impl SortRecordsStep {
    pub fn new(params: SortRecordsParams) -> Self {
        Self { params }
    }
}

impl TransformationStep for SortRecordsStep {
    fn name(&self) -> String {
        format!(
            "SortRecords(by={}, descending={})",
            self.params.by,
            format_flag(self.params.descending)
        )
    }

    fn apply(&self, records: &[Record]) -> Result<Vec<Record>, FlowError> {
        sort_records(records, &self.params)
    }
}
