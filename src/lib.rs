//! mft-timeline - Offline NTFS Master File Table decoder
//!
//! Decodes an extracted $MFT stream into forensic timeline rows: names,
//! resolved paths, sizes, the eight $STANDARD_INFORMATION / $FILE_NAME
//! timestamps and the data run extents of every named record.
//!
//! # Features
//!
//! - **Record framing**: signature check, update sequence fixups, slack trimming
//! - **Attribute decoding**: $STANDARD_INFORMATION, $FILE_NAME, $DATA
//! - **Data runs**: delta-encoded cluster runs to absolute byte extents
//! - **Path resolution**: parent chains with orphan and cycle handling
//! - **Two-pass pipeline**: parallel directory pass, ordered record pass
//!
//! # Example
//!
//! ```no_run
//! use mft_timeline::{CsvWriter, MftFile, MftPipeline, ParseConfig};
//!
//! fn main() -> mft_timeline::Result<()> {
//!     let mft = MftFile::open("$MFT")?;
//!     let pipeline = MftPipeline::new(ParseConfig::default().with_volume_letter('C'))?;
//!
//!     let mut writer = CsvWriter::new(std::io::stdout().lock());
//!     let summary = pipeline.run(&mut mft.cursor(), &mut writer)?;
//!
//!     eprintln!("{} rows, {} skipped", summary.rows_emitted, summary.records_skipped);
//!     Ok(())
//! }
//! ```

pub mod directory_tree;
pub mod error;
pub mod logging;
pub mod ntfs;
pub mod output;
pub mod pipeline;
pub mod source;

// Re-export main types
pub use directory_tree::{DirectoryEntry, DirectoryTree, UnresolvedDirectoryTree};
pub use error::{ErrorKind, MftError, Result};
pub use output::{CollectingWriter, CsvWriter, JsonLinesWriter, RowWriter};
pub use pipeline::{
    CancelToken, MftPipeline, OutputRow, ParseConfig, RawRecord, RecordReader, ScanSummary,
    SkipEvent,
};
pub use source::MftFile;

// Re-export NTFS types that users might need
pub use ntfs::{DataRun, FileNameAttribute, MftParser, MftRecord, StandardInformation};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
