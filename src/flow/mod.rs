//! Record data flows: read → transform → serialize → write.
//!
//! A [`ChainConfig`] names a reader, a writer, an output format and the
//! transformation parameters. [`DataFlowServiceFactory`] registers the
//! components in a [`ServiceCollection`] and resolves a [`DataFlowService`],
//! whose `execute` runs the chain and reports a [`FlowResult`].

pub mod config;
pub mod container;
pub mod error;
pub mod factory;
pub mod format;
pub mod io;
pub mod serializer;
pub mod services;
pub mod steps;
pub mod transforms;

pub use config::{ChainConfig, ChainFile, NamedChain, ReaderConfig, WriterConfig};
pub use container::{ServiceCollection, ServiceProvider};
pub use error::FlowError;
pub use factory::DataFlowServiceFactory;
pub use format::OutputFormat;
pub use io::{
    ConsoleWriter, FileJsonReader, FileWriter, InlineReader, MemoryWriter, RandomReader, SourceReader,
    SourceWriter,
};
pub use serializer::{RecordSerializer, TaggedUnionSerializer};
pub use services::{DataFlowService, FlowResult, ReadService, SaveService, TransformationPipelineService};
pub use steps::{SortRecordsStep, TransformationStep, UpdateScoresStep};
pub use transforms::{sort_records, update_scores, SortField, SortRecordsParams, UpdateScoresParams};
