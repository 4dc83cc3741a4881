//! Output formatting for JSON and JSONL output.
//!
//! Every processed image becomes an [`EstimateRecord`]. JSONL streams one
//! record per line as soon as it is ready; JSON collects records into a
//! single array written by [`OutputWriter::finish`].

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// One image's result, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord<T> {
    /// Input file
    pub file_path: PathBuf,
    /// BLAKE3 hash of the input file
    pub content_hash: String,
    /// Mode-specific result
    pub result: T,
}

/// A writer that serializes records to JSON or JSONL format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    pending: Vec<serde_json::Value>,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects the JSON format; JSONL is always one line per item.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            pending: Vec::new(),
        }
    }

    /// Write a single item. JSON items are held until [`finish`](Self::finish).
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                self.pending
                    .push(serde_json::to_value(item).map_err(io::Error::other)?);
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
        }
        Ok(())
    }

    /// Emit the JSON array (if any) and flush. Returns the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.format == OutputFormat::Json {
            let items = std::mem::take(&mut self.pending);
            if self.pretty {
                serde_json::to_writer_pretty(&mut self.writer, &items)
                    .map_err(io::Error::other)?;
            } else {
                serde_json::to_writer(&mut self.writer, &items).map_err(io::Error::other)?;
            }
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScoredTag, SegmentedTags};

    fn record(name: &str) -> EstimateRecord<SegmentedTags> {
        EstimateRecord {
            file_path: PathBuf::from(format!("{name}.png")),
            content_hash: "abc".to_string(),
            result: SegmentedTags {
                general: vec![ScoredTag::new(name, 0.5)],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_write_jsonl_streams_lines() {
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::JsonLines, true);
        writer.write(&record("a")).unwrap();
        writer.write(&record("b")).unwrap();

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);
        let first: EstimateRecord<SegmentedTags> = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, record("a"));
    }

    #[test]
    fn test_write_json_array_on_finish() {
        let mut writer = OutputWriter::new(Vec::new(), OutputFormat::Json, false);
        writer.write(&record("a")).unwrap();
        writer.write(&record("b")).unwrap();

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(output.starts_with('['));
        assert!(output.trim().ends_with(']'));
        assert!(output.contains("\"file_path\":\"a.png\""));
        assert!(output.contains("\"content_hash\":\"abc\""));
    }

    #[test]
    fn test_empty_json_is_empty_array() {
        let writer = OutputWriter::new(Vec::new(), OutputFormat::Json, false);
        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(output, "[]\n");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("jsonl"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("JSONL"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("invalid"), None);
    }
}
