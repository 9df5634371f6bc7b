//! Output formats a chain can render records into.

use serde::{Deserialize, Serialize};

/// Output format with its rendering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum OutputFormat {
    Json {
        #[serde(default = "default_indent")]
        indent: usize,
    },
    Csv {
        #[serde(default = "default_delimiter")]
        delimiter: char,
        #[serde(default = "default_true")]
        include_header: bool,
    },
    Text {
        #[serde(default = "default_true")]
        include_index: bool,
    },
}

/// Tags accepted in configuration files.
pub const FORMAT_TAGS: [&str; 3] = ["json", "csv", "text"];

fn default_indent() -> usize {
    2
}

fn default_delimiter() -> char {
    ','
}

fn default_true() -> bool {
    true
}

impl OutputFormat {
    pub fn json() -> Self {
        OutputFormat::Json {
            indent: default_indent(),
        }
    }

    pub fn csv() -> Self {
        OutputFormat::Csv {
            delimiter: default_delimiter(),
            include_header: true,
        }
    }

    pub fn text() -> Self {
        OutputFormat::Text { include_index: true }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            OutputFormat::Json { .. } => "json",
            OutputFormat::Csv { .. } => "csv",
            OutputFormat::Text { .. } => "text",
        }
    }

    /// Problems with the format parameters, empty when valid.
    pub fn problems(&self) -> Vec<String> {
        match self {
            OutputFormat::Csv { delimiter, .. } if !delimiter.is_ascii() => {
                vec![format!("csv delimiter {:?} must be a single ASCII character", delimiter)]
            }
            OutputFormat::Csv { delimiter, .. } if *delimiter == '"' || *delimiter == '\n' => {
                vec![format!("csv delimiter {:?} is reserved", delimiter)]
            }
            _ => Vec::new(),
        }
    }
}
