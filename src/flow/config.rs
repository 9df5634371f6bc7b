//! Declarative chain configuration and its YAML loader.
//!
//! A chain file lists named chains:
//!
//! ```yaml
//! chains:
//!   - name: file_to_csv
//!     reader: { kind: file, path: data/input_records.json }
//!     writer: { kind: file, path: data/output_file_to_csv.csv }
//!     output_format: { tag: csv, delimiter: ";" }
//!     update_scores: { delta: 5.0, only_active: true, deactivate_below: 40.0 }
//!     sort_records: { by: score, descending: true }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::format::{OutputFormat, FORMAT_TAGS};
use super::transforms::{SortField, SortRecordsParams, UpdateScoresParams};
use super::FlowError;
use crate::record::Record;

/// Where a chain reads records from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReaderConfig {
    File {
        #[serde(default = "default_input_path")]
        path: String,
    },
    Random {
        #[serde(default = "default_random_count")]
        count: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
    Inline {
        records: Vec<Record>,
    },
}

pub const READER_KINDS: [&str; 3] = ["file", "random", "inline"];

/// Where a chain writes its payload to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WriterConfig {
    File {
        #[serde(default = "default_output_path")]
        path: String,
    },
    Console,
}

pub const WRITER_KINDS: [&str; 2] = ["file", "console"];

fn default_input_path() -> String {
    "data/input_records.json".to_string()
}

fn default_output_path() -> String {
    "data/output.txt".to_string()
}

fn default_random_count() -> usize {
    5
}

/// Everything needed to build one data flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
    pub output_format: OutputFormat,
    pub update_scores: UpdateScoresParams,
    #[serde(default)]
    pub sort_records: SortRecordsParams,
}

impl ChainConfig {
    /// Check every field and report all problems at once.
    pub fn validate(&self) -> Result<(), FlowError> {
        let mut problems = Vec::new();

        match &self.reader {
            ReaderConfig::File { path } if path.trim().is_empty() => {
                problems.push("reader.path cannot be empty".to_string())
            }
            ReaderConfig::Random { count: 0, .. } => {
                problems.push("reader.count must be greater than zero".to_string())
            }
            _ => {}
        }

        if let WriterConfig::File { path } = &self.writer {
            if path.trim().is_empty() {
                problems.push("writer.path cannot be empty".to_string());
            }
        }

        problems.extend(
            self.output_format
                .problems()
                .into_iter()
                .map(|p| format!("output_format: {}", p)),
        );

        if !self.update_scores.delta.is_finite() {
            problems.push("update_scores.delta must be a finite number".to_string());
        }
        if let Some(threshold) = self.update_scores.deactivate_below {
            if !threshold.is_finite() {
                problems.push("update_scores.deactivate_below must be a finite number".to_string());
            }
        }

        if let Err(e) = self.sort_records.by.parse::<SortField>() {
            problems.push(format!("sort_records.by: {}", e));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(FlowError::Validation(problems))
        }
    }
}

/// A chain with a name, as listed in a chain file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedChain {
    pub name: String,
    #[serde(flatten)]
    pub config: ChainConfig,
}

/// Contents of a chain file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainFile {
    pub chains: Vec<NamedChain>,
}

impl ChainFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FlowError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        tracing::debug!("Loading chains from {}", path.display());
        Self::from_yaml_str(&contents)
    }

    /// Parse chains, rejecting unknown reader/writer kinds and format tags
    /// before deserializing the typed configuration.
    pub fn from_yaml_str(contents: &str) -> Result<Self, FlowError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(contents)?;

        let chains_yaml = yaml
            .get("chains")
            .and_then(|c| c.as_sequence())
            .ok_or_else(|| FlowError::InvalidArgument("Config missing 'chains' list".to_string()))?;

        for chain in chains_yaml {
            check_tag(chain, "reader", "kind", &READER_KINDS, FlowError::UnsupportedConfig)?;
            check_tag(chain, "writer", "kind", &WRITER_KINDS, FlowError::UnsupportedConfig)?;
            check_tag(chain, "output_format", "tag", &FORMAT_TAGS, FlowError::UnsupportedFormat)?;
        }

        Ok(serde_yaml::from_value(yaml)?)
    }

    pub fn get(&self, name: &str) -> Option<&NamedChain> {
        self.chains.iter().find(|chain| chain.name == name)
    }

    /// Validate every chain, collecting problems from all of them.
    pub fn validate(&self) -> Result<(), FlowError> {
        let mut problems = Vec::new();
        for chain in &self.chains {
            match chain.config.validate() {
                Ok(()) => {}
                Err(FlowError::Validation(found)) => {
                    problems.extend(found.into_iter().map(|p| format!("{}: {}", chain.name, p)))
                }
                Err(other) => problems.push(format!("{}: {}", chain.name, other)),
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(FlowError::Validation(problems))
        }
    }
}

fn check_tag(
    chain: &serde_yaml::Value,
    section: &str,
    tag_field: &str,
    known: &[&str],
    unsupported: fn(String) -> FlowError,
) -> Result<(), FlowError> {
    let Some(tag) = chain.get(section).and_then(|s| s.get(tag_field)) else {
        // Missing sections are reported by the typed deserialization.
        return Ok(());
    };
    match tag.as_str() {
        Some(tag) if known.contains(&tag) => Ok(()),
        Some(tag) => Err(unsupported(format!("{}.{}={}", section, tag_field, tag))),
        None => Err(unsupported(format!("{}.{} is not a string", section, tag_field))),
    }
}
