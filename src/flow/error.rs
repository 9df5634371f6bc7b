//! Error type for the data-flow chain.

use std::fmt;

/// Error type for reading, transforming, serializing and wiring records
#[derive(Debug)]
pub enum FlowError {
    InvalidArgument(String),
    /// Every problem found while validating a batch or a configuration.
    Validation(Vec<String>),
    UnsupportedField(String),
    UnsupportedFormat(String),
    UnsupportedConfig(String),
    ServiceNotFound(String),
    ServiceTypeMismatch {
        key: String,
        expected: &'static str,
    },
    CircularDependency(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
    CsvError(csv::Error),
}

impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        FlowError::IoError(err)
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::JsonError(err)
    }
}

impl From<serde_yaml::Error> for FlowError {
    fn from(err: serde_yaml::Error) -> Self {
        FlowError::YamlError(err)
    }
}

impl From<csv::Error> for FlowError {
    fn from(err: csv::Error) -> Self {
        FlowError::CsvError(err)
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            FlowError::Validation(problems) => {
                write!(f, "Validation failed with {} problem(s): {}", problems.len(), problems.join("; "))
            }
            FlowError::UnsupportedField(field) => write!(f, "Unsupported sort field: {}", field),
            FlowError::UnsupportedFormat(tag) => write!(f, "Unsupported format type: {}", tag),
            FlowError::UnsupportedConfig(kind) => write!(f, "Unsupported config type: {}", kind),
            FlowError::ServiceNotFound(key) => write!(f, "Service not registered: {}", key),
            FlowError::ServiceTypeMismatch { key, expected } => {
                write!(f, "Service '{}' is not of type {}", key, expected)
            }
            FlowError::CircularDependency(key) => {
                write!(f, "Circular dependency while resolving service '{}'", key)
            }
            FlowError::IoError(e) => write!(f, "IO error: {}", e),
            FlowError::JsonError(e) => write!(f, "JSON error: {}", e),
            FlowError::YamlError(e) => write!(f, "YAML error: {}", e),
            FlowError::CsvError(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FlowError::IoError(e) => Some(e),
            FlowError::JsonError(e) => Some(e),
            FlowError::YamlError(e) => Some(e),
            FlowError::CsvError(e) => Some(e),
            _ => None,
        }
    }
}
