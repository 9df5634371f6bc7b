//! Record sources and sinks.
//!
//! A chain only needs two capabilities: `read() -> records` and
//! `write(records, format)`. The implementations here cover JSON files,
//! seeded random data, inline records, files, stdout and an in-memory sink.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::format::OutputFormat;
use super::serializer::RecordSerializer;
use super::transforms::round_score;
use super::FlowError;
use crate::record::{records_from_json, Record};

pub trait SourceReader: Send + Sync {
    fn read(&self) -> Result<Vec<Record>, FlowError>;
}

pub trait SourceWriter: Send + Sync {
    fn write(&self, records: &[Record], format: &OutputFormat) -> Result<(), FlowError>;
}

/// Reads a top-level JSON array of records from a file.
#[derive(Debug, Clone)]
pub struct FileJsonReader {
    path: PathBuf,
}

impl FileJsonReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceReader for FileJsonReader {
    fn read(&self) -> Result<Vec<Record>, FlowError> {
        let contents = fs::read_to_string(&self.path)?;
        let payload: serde_json::Value = serde_json::from_str(&contents)?;
        let records = records_from_json(&payload)?;
        tracing::debug!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }
}

const RANDOM_NAMES: [&str; 8] = ["Alice", "Bob", "Carol", "David", "Eve", "Frank", "Grace", "Heidi"];

/// First id handed out by [`RandomReader`].
pub const RANDOM_ID_BASE: i64 = 1000;

/// Generates `count` records; the same seed always yields the same records.
#[derive(Debug, Clone)]
pub struct RandomReader {
    count: usize,
    seed: Option<u64>,
}

impl RandomReader {
    pub fn new(count: usize, seed: Option<u64>) -> Self {
        Self { count, seed }
    }
}

impl SourceReader for RandomReader {
    fn read(&self) -> Result<Vec<Record>, FlowError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let records = (0..self.count)
            .map(|index| {
                let name = RANDOM_NAMES[rng.gen_range(0..RANDOM_NAMES.len())];
                let score = round_score(rng.gen_range(10.0..100.0));
                // Two in three records are active.
                let active = rng.gen_range(0..3) != 2;
                Record::new(RANDOM_ID_BASE + index as i64, name, score, active, "random")
            })
            .collect();
        Ok(records)
    }
}

/// Serves a fixed set of records.
#[derive(Debug, Clone, Default)]
pub struct InlineReader {
    records: Vec<Record>,
}

impl InlineReader {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl SourceReader for InlineReader {
    fn read(&self) -> Result<Vec<Record>, FlowError> {
        Ok(self.records.clone())
    }
}

/// Serializes records into a file, creating parent directories.
pub struct FileWriter {
    path: PathBuf,
    serializer: Arc<dyn RecordSerializer>,
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>, serializer: Arc<dyn RecordSerializer>) -> Self {
        Self {
            path: path.into(),
            serializer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceWriter for FileWriter {
    fn write(&self, records: &[Record], format: &OutputFormat) -> Result<(), FlowError> {
        let content = self.serializer.serialize(records, format)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, content)?;
        tracing::debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Prints the serialized payload to stdout.
pub struct ConsoleWriter {
    serializer: Arc<dyn RecordSerializer>,
}

impl ConsoleWriter {
    pub fn new(serializer: Arc<dyn RecordSerializer>) -> Self {
        Self { serializer }
    }
}

impl SourceWriter for ConsoleWriter {
    fn write(&self, records: &[Record], format: &OutputFormat) -> Result<(), FlowError> {
        let content = self.serializer.serialize(records, format)?;
        println!("{}", content);
        Ok(())
    }
}

/// Keeps every serialized payload in memory.
pub struct MemoryWriter {
    serializer: Arc<dyn RecordSerializer>,
    payloads: Mutex<Vec<String>>,
}

impl MemoryWriter {
    pub fn new(serializer: Arc<dyn RecordSerializer>) -> Self {
        Self {
            serializer,
            payloads: Mutex::new(Vec::new()),
        }
    }

    /// Payloads written so far, oldest first.
    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SourceWriter for MemoryWriter {
    fn write(&self, records: &[Record], format: &OutputFormat) -> Result<(), FlowError> {
        let content = self.serializer.serialize(records, format)?;
        self.payloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::serializer::TaggedUnionSerializer;

    #[test]
    fn test_random_reader_is_deterministic_per_seed() {
        let first = RandomReader::new(6, Some(42)).read().unwrap();
        let second = RandomReader::new(6, Some(42)).read().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn test_random_reader_value_ranges() {
        let records = RandomReader::new(50, Some(7)).read().unwrap();
        for (idx, record) in records.iter().enumerate() {
            assert_eq!(record.record_id, RANDOM_ID_BASE + idx as i64);
            assert!(record.score >= 10.0 && record.score <= 100.0);
            assert!(RANDOM_NAMES.contains(&record.name.as_str()));
            assert_eq!(record.source, "random");
        }
    }

    #[test]
    fn test_file_reader_missing_file() {
        let result = FileJsonReader::new("/nonexistent/records.json").read();
        assert!(matches!(result, Err(FlowError::IoError(_))));
    }

    #[test]
    fn test_memory_writer_captures_payloads() {
        let writer = MemoryWriter::new(Arc::new(TaggedUnionSerializer));
        let records = vec![Record::new(1, "Mia", 78.5, true, "file")];
        writer
            .write(&records, &OutputFormat::Text { include_index: false })
            .unwrap();
        assert_eq!(
            writer.payloads(),
            vec!["id=1, name=Mia, score=78.5, active=True, source=file"]
        );
    }
}
