//! Orchestration services: read, transform, save, and the full flow.

use serde::Serialize;
use std::sync::Arc;

use super::format::OutputFormat;
use super::io::{SourceReader, SourceWriter};
use super::steps::TransformationStep;
use super::FlowError;
use crate::record::Record;

pub struct ReadService {
    reader: Arc<dyn SourceReader>,
}

impl ReadService {
    pub fn new(reader: Arc<dyn SourceReader>) -> Self {
        Self { reader }
    }

    pub fn execute(&self) -> Result<Vec<Record>, FlowError> {
        self.reader.read()
    }
}

/// Applies an ordered list of steps, each to the previous step's output.
#[derive(Clone, Default)]
pub struct TransformationPipelineService {
    steps: Vec<Arc<dyn TransformationStep>>,
}

impl TransformationPipelineService {
    pub fn new(steps: Vec<Arc<dyn TransformationStep>>) -> Self {
        Self { steps }
    }

    pub fn with_step(mut self, step: impl TransformationStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn execute(&self, records: &[Record]) -> Result<Vec<Record>, FlowError> {
        let mut current = records.to_vec();
        for step in &self.steps {
            current = step.apply(&current)?;
            tracing::debug!("Step {} produced {} records", step.name(), current.len());
        }
        Ok(current)
    }

    pub fn describe_steps(&self) -> Vec<String> {
        self.steps.iter().map(|step| step.name()).collect()
    }
}

pub struct SaveService {
    writer: Arc<dyn SourceWriter>,
}

impl SaveService {
    pub fn new(writer: Arc<dyn SourceWriter>) -> Self {
        Self { writer }
    }

    pub fn execute(&self, records: &[Record], format: &OutputFormat) -> Result<(), FlowError> {
        self.writer.write(records, format)
    }
}

/// Outcome of one flow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowResult {
    pub read_count: usize,
    pub written_count: usize,
    /// Descriptions of the steps the pipeline was built with.
    pub steps: Vec<String>,
}

/// Drives read → transform → write.
pub struct DataFlowService {
    read_service: Arc<ReadService>,
    transform_service: Arc<TransformationPipelineService>,
    save_service: Arc<SaveService>,
    output_format: OutputFormat,
}

impl DataFlowService {
    pub fn new(
        read_service: Arc<ReadService>,
        transform_service: Arc<TransformationPipelineService>,
        save_service: Arc<SaveService>,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            read_service,
            transform_service,
            save_service,
            output_format,
        }
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format
    }

    pub fn execute(&self) -> Result<FlowResult, FlowError> {
        let source_records = self.read_service.execute()?;
        let transformed = self.transform_service.execute(&source_records)?;
        self.save_service.execute(&transformed, &self.output_format)?;

        let result = FlowResult {
            read_count: source_records.len(),
            written_count: transformed.len(),
            steps: self.transform_service.describe_steps(),
        };
        tracing::info!(
            "Flow finished: read={} written={} format={}",
            result.read_count,
            result.written_count,
            self.output_format.tag()
        );
        Ok(result)
    }
}
