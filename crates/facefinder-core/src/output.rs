//! JSON and JSON Lines writers for embedding records.
//!
//! JSON output buffers the whole run into one array; JSON Lines streams one
//! record per line as soon as it is produced. [`read_records`] loads either
//! back.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

use crate::config::OutputConfig;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Single JSON object or array
    #[default]
    Json,
    /// One JSON object per line
    JsonLines,
}

impl OutputFormat {
    /// Parse a format name (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Format configured under `[output]`, falling back to JSON.
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::parse(&config.format).unwrap_or_default()
    }

    /// Whether records can be written as soon as they are produced.
    pub fn is_streaming(self) -> bool {
        matches!(self, Self::JsonLines)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::JsonLines => write!(f, "jsonl"),
        }
    }
}

/// Serializes records to JSON or JSON Lines.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`]; JSON Lines is always compact.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write a single record followed by a newline.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write a batch: one array for JSON, one line per record for JSON Lines.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, items)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, items).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += items.len();
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    pub fn items_written(&self) -> usize {
        self.items_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Parse records written by [`OutputWriter`] in any format: a JSON array, a
/// single JSON object, or JSON Lines. Blank lines are ignored.
pub fn read_records<T: DeserializeOwned>(content: &str) -> io::Result<Vec<T>> {
    if let Ok(records) = serde_json::from_str::<Vec<T>>(content) {
        return Ok(records);
    }
    if let Ok(record) = serde_json::from_str::<T>(content) {
        return Ok(vec![record]);
    }

    tracing::debug!("Input is not a JSON array or object, reading it as JSON Lines");
    let mut records = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {e}", number + 1),
            )
        })?;
        records.push(record);
    }
    Ok(records)
}
