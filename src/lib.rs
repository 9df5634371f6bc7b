//! # Recflow: Typed Record Chains and Dynamic Entity Properties
//!
//! Recflow reads records from a pluggable source, runs them through an ordered
//! list of transformation steps, renders them into JSON, CSV or text, and
//! writes the payload to a pluggable destination. Components are wired from a
//! declarative configuration through a small dependency-injection container.
//!
//! It also provides a dynamic property layer: a registry of strongly-typed,
//! collision-checked keys shared by independent modules, property bags that
//! check every write against the key's type, and short-circuiting operation
//! pipelines over entities.
//!
//! ## Features
//!
//! - **Tagged-union configuration**: readers, writers and output formats are closed enums
//! - **DI container**: singleton (lazy, memoized) and transient services resolved by key
//! - **Transformation pipeline**: named steps, each producing a new record collection
//! - **Typed key registry**: cross-module keys with conflict detection
//!
//! ## Example: chain file
//!
//! ```yaml
//! chains:
//!   - name: random_to_json
//!     reader: { kind: random, count: 6, seed: 42 }
//!     writer: { kind: file, path: data/output_random_to_json.json }
//!     output_format: { tag: json, indent: 2 }
//!     update_scores: { delta: -3.0, only_active: false, deactivate_below: 20.0 }
//!     sort_records: { by: name, descending: false }
//! ```
//!
//! ## Example: running a chain
//!
//! ```
//! use recflow::flow::{ChainConfig, DataFlowServiceFactory, OutputFormat, ReaderConfig, WriterConfig};
//! use recflow::flow::{SortRecordsParams, UpdateScoresParams};
//! use recflow::Record;
//!
//! let config = ChainConfig {
//!     reader: ReaderConfig::Inline {
//!         records: vec![Record::new(1, "Mia", 78.5, true, "file")],
//!     },
//!     writer: WriterConfig::Console,
//!     output_format: OutputFormat::text(),
//!     update_scores: UpdateScoresParams::new(5.0),
//!     sort_records: SortRecordsParams::default(),
//! };
//!
//! let flow = DataFlowServiceFactory::create(&config).unwrap();
//! let result = flow.execute().unwrap();
//! assert_eq!(result.written_count, 1);
//! ```

// Core modules
pub mod record;

// Dynamic typed properties and entity pipelines
pub mod dynamic;
pub mod rules;

// Record chains
pub mod flow;

// Re-export key types
pub use record::{records_from_json, Record};
pub use dynamic::{
    Entity, EntityPipeline, KeyError, KeyInfo, KeyRegistry, OperationContext, PropertyBag, PropertyError,
    PropertyValue, TypedKey, ValueType,
};
pub use flow::{ChainConfig, ChainFile, DataFlowService, DataFlowServiceFactory, FlowError, FlowResult, OutputFormat};
