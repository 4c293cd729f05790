//! Two-Pass MFT Pipeline
//!
//! Pass 1 fans record slots out to a fixed pool of workers that collect
//! directory entries into private maps; a single merge task unions them and
//! resolves paths. Pass 2 rewinds the source, decodes every record on a
//! producer thread and hands rows to the caller's writer in stream order.

use crate::directory_tree::{join_path, DirectoryTree, UnresolvedDirectoryTree};
use crate::error::{MftError, Result};
use crate::logging;
use crate::ntfs::data_runs::DataRun;
use crate::ntfs::mft::{MftParser, MftRecord};
use crate::ntfs::structs::MFT_RECORD_SIZE;
use crate::output::RowWriter;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender};
use indicatif::ProgressBar;
use log::{debug, info, trace};
use serde::Serialize;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Cluster size used to turn data runs into byte extents
    pub bytes_per_cluster: u64,
    /// Drive letter for the resolved root prefix
    pub volume_letter: char,
    /// Directory pass worker count
    pub workers: usize,
    /// Capacity of every bounded queue
    pub queue_capacity: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            bytes_per_cluster: 4096,
            volume_letter: 'C',
            workers: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            queue_capacity: 100,
        }
    }
}

impl ParseConfig {
    pub fn with_bytes_per_cluster(mut self, bytes_per_cluster: u64) -> Self {
        self.bytes_per_cluster = bytes_per_cluster;
        self
    }

    pub fn with_volume_letter(mut self, volume_letter: char) -> Self {
        self.volume_letter = volume_letter.to_ascii_uppercase();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Reject settings that would make decoding meaningless
    pub fn validate(&self) -> Result<()> {
        if self.bytes_per_cluster == 0 {
            return Err(MftError::config("bytes per cluster must be greater than 0"));
        }
        if self.bytes_per_cluster > i64::MAX as u64 {
            return Err(MftError::config(format!(
                "bytes per cluster {} is out of range",
                self.bytes_per_cluster
            )));
        }
        if !self.volume_letter.is_ascii_alphabetic() {
            return Err(MftError::config(format!(
                "volume letter must be a single ASCII letter, got {:?}",
                self.volume_letter
            )));
        }
        if self.workers == 0 {
            return Err(MftError::config("at least one worker is required"));
        }
        if self.queue_capacity == 0 {
            return Err(MftError::config("queue capacity must be greater than 0"));
        }
        Ok(())
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Shared flag checked between records in both passes
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(MftError::Cancelled);
        }
        Ok(())
    }
}

// ============================================================================
// Record Reader
// ============================================================================

/// One raw record slot and its byte offset in the stream
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub offset: u64,
    pub data: Vec<u8>,
}

/// Splits a byte stream into fixed-size record slots.
///
/// A short final chunk is yielded as-is; the framer rejects it.
pub struct RecordReader<R> {
    reader: R,
    record_size: usize,
    offset: u64,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_record_size(reader, MFT_RECORD_SIZE)
    }

    pub fn with_record_size(reader: R, record_size: usize) -> Self {
        Self {
            reader,
            record_size,
            offset: 0,
            done: false,
        }
    }

    fn fill(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buffer.len() {
            match self.reader.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = io::Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut data = vec![0u8; self.record_size];
        let filled = match self.fill(&mut data) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        if filled == 0 {
            self.done = true;
            return None;
        }
        if filled < self.record_size {
            trace!("short final record of {} bytes at {:#x}", filled, self.offset);
            data.truncate(filled);
            self.done = true;
        }

        let record = RawRecord {
            offset: self.offset,
            data,
        };
        self.offset += filled as u64;
        Some(Ok(record))
    }
}

// ============================================================================
// Output Row
// ============================================================================

/// One emitted row per named record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRow {
    pub record_number: u32,
    pub directory: bool,
    pub system: bool,
    pub hidden: bool,
    pub read_only: bool,
    pub deleted: bool,
    /// Resolved path of the parent directory
    pub file_path: String,
    pub full_path: String,
    pub file_name: String,
    pub physical_size: u64,
    pub logical_size: u64,
    pub si_created: Option<DateTime<Utc>>,
    pub si_modified: Option<DateTime<Utc>>,
    pub si_accessed: Option<DateTime<Utc>>,
    pub si_changed: Option<DateTime<Utc>>,
    pub fn_created: Option<DateTime<Utc>>,
    pub fn_modified: Option<DateTime<Utc>>,
    pub fn_accessed: Option<DateTime<Utc>>,
    pub fn_changed: Option<DateTime<Utc>>,
    pub data_runs: Vec<DataRun>,
}

impl OutputRow {
    /// Join a decoded record against the resolved directory tree
    pub fn from_record(record: &MftRecord, tree: &DirectoryTree) -> Result<Self> {
        let name = record
            .canonical_file_name()
            .ok_or(MftError::NoCanonicalName {
                record_number: record.record_number(),
            })?;

        let file_path = tree.parent_path(name.parent_record_number).to_string();
        let full_path = join_path(&file_path, &name.name);
        let si = record.standard_information.unwrap_or_default();

        Ok(Self {
            record_number: record.record_number(),
            directory: record.is_directory(),
            system: name.flags.system,
            hidden: name.flags.hidden,
            read_only: name.flags.read_only,
            deleted: record.is_deleted(),
            file_path,
            full_path,
            file_name: name.name.clone(),
            physical_size: name.physical_size,
            logical_size: name.logical_size,
            si_created: si.created,
            si_modified: si.modified,
            si_accessed: si.accessed,
            si_changed: si.changed,
            fn_created: name.created,
            fn_modified: name.modified,
            fn_accessed: name.accessed,
            fn_changed: name.changed,
            data_runs: record.data_runs().to_vec(),
        })
    }
}

// ============================================================================
// Skip events and summary
// ============================================================================

/// A record slot that produced no row
#[derive(Debug)]
pub struct SkipEvent {
    pub offset: u64,
    /// Known once the header has been framed
    pub record_number: Option<u32>,
    pub reason: MftError,
}

/// Counters for a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub records_read: u64,
    pub rows_emitted: u64,
    pub records_skipped: u64,
    pub attribute_errors: u64,
    /// Directory records collected from the stream; a seeded root is not counted
    pub directories: usize,
    pub orphaned_directories: usize,
}

enum RecordEvent {
    Row {
        row: OutputRow,
        attribute_errors: usize,
    },
    Skipped(SkipEvent),
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct MftPipeline {
    config: ParseConfig,
    parser: MftParser,
    cancelled: CancelToken,
    progress: ProgressBar,
}

impl MftPipeline {
    /// Validate the configuration before any record is touched
    pub fn new(config: ParseConfig) -> Result<Self> {
        config.validate()?;
        let parser = MftParser::new(config.bytes_per_cluster)?;
        Ok(Self {
            config,
            parser,
            cancelled: CancelToken::new(),
            progress: ProgressBar::hidden(),
        })
    }

    /// Report record progress on the given bar (positions reset per pass)
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancelled = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancelled.clone()
    }

    /// Run both passes, writing one row per named record
    pub fn run<R, W>(&self, source: &mut R, writer: &mut W) -> Result<ScanSummary>
    where
        R: Read + Seek + Send,
        W: RowWriter,
    {
        let start = Instant::now();

        logging::separator("DIRECTORY PASS");
        let tree = self.build_directory_tree(&mut *source)?;

        source.seek(SeekFrom::Start(0))?;

        logging::separator("RECORD PASS");
        let mut summary = ScanSummary {
            directories: tree.collected_count(),
            orphaned_directories: tree.orphan_count(),
            ..Default::default()
        };
        self.emit_rows(source, &tree, writer, &mut summary)?;
        writer.finish()?;
        self.progress.finish_and_clear();

        info!(
            "{} records read, {} rows, {} skipped, {} attribute errors in {:.2?}",
            summary.records_read,
            summary.rows_emitted,
            summary.records_skipped,
            summary.attribute_errors,
            start.elapsed()
        );
        Ok(summary)
    }

    /// Pass 1: collect directory entries on the worker pool and resolve them
    pub fn build_directory_tree<R: Read>(&self, reader: R) -> Result<DirectoryTree> {
        let start = Instant::now();
        self.progress.set_position(0);
        self.progress.set_message("directories");

        let (work_tx, work_rx) = bounded::<RawRecord>(self.config.queue_capacity);
        let (local_tx, local_rx) = bounded::<UnresolvedDirectoryTree>(self.config.queue_capacity);
        let volume_letter = self.config.volume_letter;

        let (fed, tree) = thread::scope(|scope| {
            for worker in 0..self.config.workers {
                let work_rx = work_rx.clone();
                let local_tx = local_tx.clone();
                let parser = self.parser;

                scope.spawn(move || collect_directories(&parser, worker, work_rx, local_tx));
            }
            drop(work_rx);
            drop(local_tx);

            let merger = scope.spawn(move || {
                let mut merged = UnresolvedDirectoryTree::new();
                for local in local_rx {
                    merged.merge(local);
                }
                merged.resolve(volume_letter)
            });

            let fed = self.feed(reader, work_tx);
            let tree = merger
                .join()
                .map_err(|_| MftError::Io(io::Error::other("directory merge task panicked")));
            (fed, tree)
        });

        let records = fed?;
        let tree = tree?;
        info!(
            "directory pass: {} records, {} directories ({} orphaned) in {:.2?}",
            records,
            tree.len(),
            tree.orphan_count(),
            start.elapsed()
        );
        Ok(tree)
    }

    /// Push every slot into the work queue; dropping the sender ends the workers
    fn feed<R: Read>(&self, reader: R, work_tx: Sender<RawRecord>) -> Result<u64> {
        let mut records = 0;
        for raw in RecordReader::new(reader) {
            self.cancelled.check()?;
            let raw = raw?;
            if work_tx.send(raw).is_err() {
                break;
            }
            records += 1;
            self.progress.inc(1);
        }
        Ok(records)
    }

    /// Pass 2: decode on a producer thread, write on the caller's thread
    fn emit_rows<R, W>(
        &self,
        source: &mut R,
        tree: &DirectoryTree,
        writer: &mut W,
        summary: &mut ScanSummary,
    ) -> Result<()>
    where
        R: Read + Send,
        W: RowWriter,
    {
        self.progress.set_position(0);
        self.progress.set_message("records");

        let (event_tx, event_rx) = bounded::<Result<RecordEvent>>(self.config.queue_capacity);
        let parser = self.parser;
        let cancelled = &self.cancelled;
        let progress = &self.progress;

        thread::scope(|scope| {
            scope.spawn(move || {
                for raw in RecordReader::new(source) {
                    let event = cancelled
                        .check()
                        .and_then(|_| raw.map_err(MftError::from))
                        .map(|raw| decode_event(&parser, raw, tree));
                    let stop = event.is_err();
                    if event_tx.send(event).is_err() || stop {
                        break;
                    }
                    progress.inc(1);
                }
            });

            for event in event_rx {
                let event = event?;
                summary.records_read += 1;
                match event {
                    RecordEvent::Row {
                        row,
                        attribute_errors,
                    } => {
                        summary.attribute_errors += attribute_errors as u64;
                        writer.write_row(&row)?;
                        summary.rows_emitted += 1;
                    }
                    RecordEvent::Skipped(skip) => {
                        debug!(
                            "skipping record at {:#x}{}: {}",
                            skip.offset,
                            skip.record_number
                                .map(|n| format!(" (record {})", n))
                                .unwrap_or_default(),
                            skip.reason
                        );
                        summary.records_skipped += 1;
                        writer.skipped(&skip);
                    }
                }
            }
            Ok(())
        })
    }
}

/// Drain the work queue into a private map and hand it to the merge task.
///
/// Returns `false` when the merge task is gone and the map was dropped.
fn collect_directories(
    parser: &MftParser,
    worker: usize,
    work_rx: Receiver<RawRecord>,
    local_tx: Sender<UnresolvedDirectoryTree>,
) -> bool {
    let mut local = UnresolvedDirectoryTree::new();
    for mut raw in work_rx {
        match parser.directory_entry(&mut raw.data) {
            Ok(Some(entry)) => local.insert(entry),
            Ok(None) => {}
            Err(e) => trace!("directory pass skip at {:#x}: {}", raw.offset, e),
        }
    }
    trace!("worker {} collected {} directories", worker, local.len());

    match local_tx.send(local) {
        Ok(()) => true,
        Err(e) => {
            debug!(
                "worker {}: merge task gone, dropping {} directories",
                worker,
                e.0.len()
            );
            false
        }
    }
}

fn decode_event(parser: &MftParser, mut raw: RawRecord, tree: &DirectoryTree) -> RecordEvent {
    let record = match parser.parse_record(&mut raw.data) {
        Ok(record) => record,
        Err(reason) => {
            return RecordEvent::Skipped(SkipEvent {
                offset: raw.offset,
                record_number: None,
                reason,
            })
        }
    };

    match OutputRow::from_record(&record, tree) {
        Ok(row) => RecordEvent::Row {
            row,
            attribute_errors: record.attribute_errors.len(),
        },
        Err(reason) => RecordEvent::Skipped(SkipEvent {
            offset: raw.offset,
            record_number: Some(record.record_number()),
            reason,
        }),
    }
}
