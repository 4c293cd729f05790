//! Row writers
//!
//! Pipe-delimited CSV and JSON lines sinks for [`OutputRow`]s, plus an
//! in-memory collector.

use crate::error::Result;
use crate::ntfs::data_runs::DataRun;
use crate::pipeline::{OutputRow, SkipEvent};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::{self, Write};

/// Sink for the rows produced by the record pass
pub trait RowWriter {
    fn write_row(&mut self, row: &OutputRow) -> Result<()>;

    /// Called for every record slot that produced no row
    fn skipped(&mut self, _event: &SkipEvent) {}

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// RFC 3339 UTC with nanoseconds; unset is empty
pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .unwrap_or_default()
}

/// `offset:length` pairs separated by `;`
pub fn format_data_runs(runs: &[DataRun]) -> String {
    runs.iter()
        .map(|r| format!("{}:{}", r.absolute_offset, r.length))
        .collect::<Vec<_>>()
        .join(";")
}

// ============================================================================
// CSV
// ============================================================================

pub const CSV_DELIMITER: char = '|';

pub const CSV_HEADER: [&str; 18] = [
    "Record Number",
    "Directory Flag",
    "System File Flag",
    "Hidden Flag",
    "Read-only Flag",
    "Deleted Flag",
    "File Path",
    "File Name",
    "File Size",
    "File Created",
    "File Modified",
    "File Accessed",
    "File Entry Modified",
    "FileName Created",
    "FileName Modified",
    "FileName Accessed",
    "FileName Entry Modified",
    "Data Runs",
];

/// Quote a field if it contains the delimiter, a quote or a line break
fn csv_field(value: &str) -> String {
    if value.contains([CSV_DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub struct CsvWriter<W: Write> {
    out: W,
    header_written: bool,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_fields<S: AsRef<str>>(&mut self, fields: &[S]) -> io::Result<()> {
        let line = fields
            .iter()
            .map(|f| csv_field(f.as_ref()))
            .collect::<Vec<_>>()
            .join(&CSV_DELIMITER.to_string());
        writeln!(self.out, "{}", line)
    }

    fn ensure_header(&mut self) -> io::Result<()> {
        if !self.header_written {
            self.write_fields(&CSV_HEADER)?;
            self.header_written = true;
        }
        Ok(())
    }
}

impl<W: Write> RowWriter for CsvWriter<W> {
    fn write_row(&mut self, row: &OutputRow) -> Result<()> {
        self.ensure_header()?;
        let fields = [
            row.record_number.to_string(),
            row.directory.to_string(),
            row.system.to_string(),
            row.hidden.to_string(),
            row.read_only.to_string(),
            row.deleted.to_string(),
            row.file_path.clone(),
            row.file_name.clone(),
            row.physical_size.to_string(),
            format_timestamp(row.si_created),
            format_timestamp(row.si_modified),
            format_timestamp(row.si_accessed),
            format_timestamp(row.si_changed),
            format_timestamp(row.fn_created),
            format_timestamp(row.fn_modified),
            format_timestamp(row.fn_accessed),
            format_timestamp(row.fn_changed),
            format_data_runs(&row.data_runs),
        ];
        self.write_fields(&fields)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // An empty run still gets a header
        self.ensure_header()?;
        self.out.flush()?;
        Ok(())
    }
}

// ============================================================================
// JSON lines
// ============================================================================

/// One JSON object per line
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RowWriter for JsonLinesWriter<W> {
    fn write_row(&mut self, row: &OutputRow) -> Result<()> {
        serde_json::to_writer(&mut self.out, row).map_err(io::Error::from)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

// ============================================================================
// Collector
// ============================================================================

/// Keeps rows and skip events in memory
#[derive(Debug, Default)]
pub struct CollectingWriter {
    pub rows: Vec<OutputRow>,
    pub skipped: Vec<SkippedSlot>,
}

/// Copy of a [`SkipEvent`] with the reason rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSlot {
    pub offset: u64,
    pub record_number: Option<u32>,
    pub kind: crate::error::ErrorKind,
    pub reason: String,
}

impl RowWriter for CollectingWriter {
    fn write_row(&mut self, row: &OutputRow) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn skipped(&mut self, event: &SkipEvent) {
        self.skipped.push(SkippedSlot {
            offset: event.offset,
            record_number: event.record_number,
            kind: event.reason.kind(),
            reason: event.reason.to_string(),
        });
    }
}
