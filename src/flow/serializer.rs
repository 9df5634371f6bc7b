//! Rendering record collections into textual payloads.

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::io;

use super::format::OutputFormat;
use super::FlowError;
use crate::record::{format_flag, Record, FIELD_NAMES};

/// Converts records into a payload for a given output format.
pub trait RecordSerializer: Send + Sync {
    fn serialize(&self, records: &[Record], format: &OutputFormat) -> Result<String, FlowError>;
}

/// Serializer that dispatches on every [`OutputFormat`] variant.
///
/// The match has no fallback arm, so adding a format variant does not
/// compile until it gets a rendering branch here.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedUnionSerializer;

impl RecordSerializer for TaggedUnionSerializer {
    fn serialize(&self, records: &[Record], format: &OutputFormat) -> Result<String, FlowError> {
        let problems = format.problems();
        if !problems.is_empty() {
            return Err(FlowError::InvalidArgument(problems.join("; ")));
        }

        match format {
            OutputFormat::Json { indent } => serialize_json(records, *indent),
            OutputFormat::Csv {
                delimiter,
                include_header,
            } => serialize_csv(records, *delimiter, *include_header),
            OutputFormat::Text { include_index } => Ok(serialize_text(records, *include_index)),
        }
    }
}

/// Scores always carry a decimal point (`61.0`, `83.5`).
pub fn format_score(score: f64) -> String {
    format!("{:?}", score)
}

/// Pretty-printing formatter that writes non-ASCII characters as `\uXXXX`
/// escapes, using surrogate pairs outside the basic multilingual plane.
struct AsciiFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> Formatter for AsciiFormatter<'a> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..idx].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                writer.write_all(format!("\\u{:04x}", unit).as_bytes())?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Indent 0 still breaks lines, one element per line without indentation.
fn serialize_json(records: &[Record], indent: usize) -> Result<String, FlowError> {
    let indent = " ".repeat(indent);
    let formatter = AsciiFormatter {
        inner: PrettyFormatter::with_indent(indent.as_bytes()),
    };
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser)?;

    String::from_utf8(buf).map_err(|e| FlowError::InvalidArgument(format!("JSON output is not UTF-8: {}", e)))
}

fn serialize_csv(records: &[Record], delimiter: char, include_header: bool) -> Result<String, FlowError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .terminator(csv::Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(Vec::new());

    if include_header {
        writer.write_record(FIELD_NAMES)?;
    }
    for record in records {
        writer.write_record([
            record.record_id.to_string(),
            record.name.clone(),
            format_score(record.score),
            format_flag(record.active).to_string(),
            record.source.clone(),
        ])?;
    }

    let buf = writer.into_inner().map_err(|e| FlowError::IoError(e.into_error()))?;
    String::from_utf8(buf).map_err(|e| FlowError::InvalidArgument(format!("CSV output is not UTF-8: {}", e)))
}

fn serialize_text(records: &[Record], include_index: bool) -> String {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let prefix = if include_index {
                format!("{}. ", idx + 1)
            } else {
                String::new()
            };
            format!(
                "{}id={}, name={}, score={}, active={}, source={}",
                prefix,
                record.record_id,
                record.name,
                format_score(record.score),
                format_flag(record.active),
                record.source
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
