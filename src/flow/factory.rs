//! Builds a wired [`DataFlowService`] from a [`ChainConfig`].

use std::sync::Arc;

use super::config::{ChainConfig, ReaderConfig, WriterConfig};
use super::container::{ServiceCollection, ServiceProvider};
use super::io::{ConsoleWriter, FileJsonReader, FileWriter, InlineReader, RandomReader, SourceReader, SourceWriter};
use super::serializer::{RecordSerializer, TaggedUnionSerializer};
use super::services::{DataFlowService, ReadService, SaveService, TransformationPipelineService};
use super::steps::{SortRecordsStep, TransformationStep, UpdateScoresStep};
use super::FlowError;

/// Service keys registered by [`DataFlowServiceFactory::register`].
pub mod keys {
    pub const CONFIG: &str = "config";
    pub const SERIALIZER: &str = "serializer";
    pub const READER: &str = "reader";
    pub const WRITER: &str = "writer";
    pub const TRANSFORM_STEPS: &str = "transform_steps";
    pub const READ_SERVICE: &str = "read_service";
    pub const TRANSFORM_SERVICE: &str = "transform_service";
    pub const SAVE_SERVICE: &str = "save_service";
    pub const FLOW_SERVICE: &str = "flow_service";
}

pub fn build_reader(config: &ReaderConfig) -> Arc<dyn SourceReader> {
    match config {
        ReaderConfig::File { path } => Arc::new(FileJsonReader::new(path)),
        ReaderConfig::Random { count, seed } => Arc::new(RandomReader::new(*count, *seed)),
        ReaderConfig::Inline { records } => Arc::new(InlineReader::new(records.clone())),
    }
}

pub fn build_writer(config: &WriterConfig, serializer: Arc<dyn RecordSerializer>) -> Arc<dyn SourceWriter> {
    match config {
        WriterConfig::File { path } => Arc::new(FileWriter::new(path, serializer)),
        WriterConfig::Console => Arc::new(ConsoleWriter::new(serializer)),
    }
}

pub fn build_transform_steps(config: &ChainConfig) -> Vec<Arc<dyn TransformationStep>> {
    vec![
        Arc::new(UpdateScoresStep::new(config.update_scores.clone())),
        Arc::new(SortRecordsStep::new(config.sort_records.clone())),
    ]
}

pub struct DataFlowServiceFactory;

impl DataFlowServiceFactory {
    /// Register every service a chain needs.
    ///
    /// Callers may replace any key afterwards (for example `writer`) before
    /// building the provider.
    pub fn register(services: &mut ServiceCollection, config: &ChainConfig) {
        let config = Arc::new(config.clone());

        services.add_singleton_instance(keys::CONFIG, Arc::clone(&config));
        services.add_singleton(keys::SERIALIZER, |_| {
            Ok(Arc::new(TaggedUnionSerializer) as Arc<dyn RecordSerializer>)
        });
        services.add_singleton(keys::READER, |provider| {
            let config: Arc<ChainConfig> = provider.get(keys::CONFIG)?;
            Ok(build_reader(&config.reader))
        });
        services.add_singleton(keys::WRITER, |provider| {
            let config: Arc<ChainConfig> = provider.get(keys::CONFIG)?;
            let serializer: Arc<dyn RecordSerializer> = provider.get(keys::SERIALIZER)?;
            Ok(build_writer(&config.writer, serializer))
        });
        services.add_singleton(keys::TRANSFORM_STEPS, |provider| {
            let config: Arc<ChainConfig> = provider.get(keys::CONFIG)?;
            Ok(Arc::new(build_transform_steps(&config)))
        });
        services.add_singleton(keys::READ_SERVICE, |provider| {
            Ok(Arc::new(ReadService::new(provider.get(keys::READER)?)))
        });
        services.add_singleton(keys::TRANSFORM_SERVICE, |provider| {
            let steps: Arc<Vec<Arc<dyn TransformationStep>>> = provider.get(keys::TRANSFORM_STEPS)?;
            Ok(Arc::new(TransformationPipelineService::new(steps.as_ref().clone())))
        });
        services.add_singleton(keys::SAVE_SERVICE, |provider| {
            Ok(Arc::new(SaveService::new(provider.get(keys::WRITER)?)))
        });
        services.add_singleton(keys::FLOW_SERVICE, |provider| {
            let config: Arc<ChainConfig> = provider.get(keys::CONFIG)?;
            Ok(Arc::new(DataFlowService::new(
                provider.get(keys::READ_SERVICE)?,
                provider.get(keys::TRANSFORM_SERVICE)?,
                provider.get(keys::SAVE_SERVICE)?,
                config.output_format.clone(),
            )))
        });
    }

    /// Resolve the flow service from an already-built provider.
    pub fn resolve(provider: &ServiceProvider) -> Result<Arc<DataFlowService>, FlowError> {
        provider.get(keys::FLOW_SERVICE)
    }

    /// Validate `config` and build its flow service.
    pub fn create(config: &ChainConfig) -> Result<Arc<DataFlowService>, FlowError> {
        config.validate()?;

        let mut services = ServiceCollection::new();
        Self::register(&mut services, config);
        let provider = services.build_provider();
        Self::resolve(&provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::format::OutputFormat;
    use crate::flow::io::MemoryWriter;
    use crate::flow::transforms::{SortRecordsParams, UpdateScoresParams};
    use crate::record::Record;

    fn inline_config() -> ChainConfig {
        ChainConfig {
            reader: ReaderConfig::Inline {
                records: vec![
                    Record::new(1, "Mia", 78.5, true, "file"),
                    Record::new(2, "Noah", 61.0, false, "file"),
                    Record::new(3, "Liam", 90.2, true, "file"),
                ],
            },
            writer: WriterConfig::Console,
            output_format: OutputFormat::Text { include_index: false },
            update_scores: UpdateScoresParams::new(5.0),
            sort_records: SortRecordsParams::default(),
        }
    }

    #[test]
    fn test_overridden_writer_receives_output() {
        let config = inline_config();
        let mut services = ServiceCollection::new();
        DataFlowServiceFactory::register(&mut services, &config);

        let memory = Arc::new(MemoryWriter::new(Arc::new(TaggedUnionSerializer)));
        let sink = Arc::clone(&memory);
        services.add_singleton(keys::WRITER, move |_| Ok(Arc::clone(&sink) as Arc<dyn SourceWriter>));

        let provider = services.build_provider();
        let flow = DataFlowServiceFactory::resolve(&provider).unwrap();
        let result = flow.execute().unwrap();

        assert_eq!(result.read_count, 3);
        assert_eq!(result.written_count, 3);
        assert_eq!(
            result.steps,
            vec![
                "UpdateScores(delta=5.0, only_active=True)",
                "SortRecords(by=score, descending=True)"
            ]
        );
        assert_eq!(
            memory.payloads(),
            vec![
                "id=3, name=Liam, score=95.2, active=True, source=file\n\
                 id=1, name=Mia, score=83.5, active=True, source=file\n\
                 id=2, name=Noah, score=61.0, active=False, source=file"
            ]
        );
    }

    #[test]
    fn test_flow_service_is_a_singleton() {
        let mut services = ServiceCollection::new();
        DataFlowServiceFactory::register(&mut services, &inline_config());
        let provider = services.build_provider();

        let a = DataFlowServiceFactory::resolve(&provider).unwrap();
        let b = DataFlowServiceFactory::resolve(&provider).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let mut config = inline_config();
        config.sort_records.by = "email".to_string();
        assert!(matches!(
            DataFlowServiceFactory::create(&config),
            Err(FlowError::Validation(_))
        ));
    }
}
