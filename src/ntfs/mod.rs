//! NTFS MFT decoding
//!
//! This module provides the offline record decoding layers:
//! - Record framing with update sequence fixups and slack trimming
//! - $STANDARD_INFORMATION, $FILE_NAME and $DATA attribute decoding
//! - Data run decompression into absolute byte extents

pub mod attributes;
pub mod data_runs;
pub mod mft;
pub mod record;
pub mod structs;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use attributes::{Attribute, DataAttribute, FileNameAttribute, StandardInformation};
pub use data_runs::{decode_data_runs, DataRun, DataRunSplit};
pub use mft::{MftParser, MftRecord};
pub use record::{frame_record, AttributeBlock, FramedRecord, RecordFlags, RecordHeader};
pub use structs::{AttributeType, FileNameFlags, FilenameNamespace, MFT_RECORD_SIZE};
