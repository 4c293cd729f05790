//! Decoders for the three attribute kinds that carry file identity and
//! content location: $STANDARD_INFORMATION, $FILE_NAME and $DATA.
//!
//! Each decoder consumes one framed [`AttributeBlock`] and works on offsets
//! relative to the start of the attribute header.

use crate::error::{MftError, Result};
use crate::ntfs::data_runs::{decode_data_runs, DataRun};
use crate::ntfs::record::AttributeBlock;
use crate::ntfs::structs::*;
use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

// Attribute offsets (from the attribute header, not the content)
const SI_MIN_SIZE: usize = 0x30;
const SI_OFFSET_CREATED: usize = 0x18;
const SI_OFFSET_MODIFIED: usize = 0x20;
const SI_OFFSET_CHANGED: usize = 0x28;
const SI_OFFSET_ACCESSED: usize = 0x30;

const FN_MIN_SIZE: usize = 0x44;
const FN_OFFSET_PARENT: usize = 0x18;
const FN_PARENT_WIDTH: usize = 6;
const FN_OFFSET_PARENT_SEQUENCE: usize = 0x1E;
const FN_OFFSET_CREATED: usize = 0x20;
const FN_OFFSET_MODIFIED: usize = 0x28;
const FN_OFFSET_CHANGED: usize = 0x30;
const FN_OFFSET_ACCESSED: usize = 0x38;
const FN_OFFSET_LOGICAL_SIZE: usize = 0x40;
const FN_OFFSET_PHYSICAL_SIZE: usize = 0x48;
const FN_OFFSET_FLAGS: usize = 0x50;
const FN_OFFSET_NAME_LENGTH: usize = 0x58;
const FN_OFFSET_NAMESPACE: usize = 0x59;
const FN_OFFSET_NAME: usize = 0x5A;

const DATA_MIN_SIZE: usize = 0x18;
const DATA_OFFSET_RESIDENT_CONTENT: usize = 0x18;
const DATA_OFFSET_RUN_LIST_OFFSET: usize = 0x20;

// ============================================================================
// Bounds-checked field access
// ============================================================================

fn field<'a>(
    bytes: &'a [u8],
    offset: usize,
    width: usize,
    attribute: &'static str,
) -> Result<&'a [u8]> {
    bytes
        .get(offset..offset + width)
        .ok_or(MftError::AttributeTooShort {
            attribute,
            needed: offset + width,
            got: bytes.len(),
        })
}

fn read_u64(bytes: &[u8], offset: usize, attribute: &'static str) -> Result<u64> {
    field(bytes, offset, 8, attribute).map(LittleEndian::read_u64)
}

fn read_timestamp(
    bytes: &[u8],
    offset: usize,
    attribute: &'static str,
) -> Result<Option<DateTime<Utc>>> {
    read_u64(bytes, offset, attribute).map(filetime_to_datetime)
}

fn require(bytes: &[u8], min: usize, attribute: &'static str) -> Result<()> {
    if bytes.len() < min {
        return Err(MftError::AttributeTooShort {
            attribute,
            needed: min,
            got: bytes.len(),
        });
    }
    Ok(())
}

// ============================================================================
// $STANDARD_INFORMATION
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StandardInformation {
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub changed: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
}

impl StandardInformation {
    pub const NAME: &'static str = "$STANDARD_INFORMATION";

    pub fn from_block(block: &AttributeBlock<'_>) -> Result<Self> {
        let bytes = block.bytes;
        require(bytes, SI_MIN_SIZE, Self::NAME)?;
        if !block.is_resident() {
            return Err(MftError::UnsupportedAttributeLayout {
                attribute: Self::NAME,
            });
        }

        Ok(Self {
            created: read_timestamp(bytes, SI_OFFSET_CREATED, Self::NAME)?,
            modified: read_timestamp(bytes, SI_OFFSET_MODIFIED, Self::NAME)?,
            changed: read_timestamp(bytes, SI_OFFSET_CHANGED, Self::NAME)?,
            accessed: read_timestamp(bytes, SI_OFFSET_ACCESSED, Self::NAME)?,
        })
    }
}

// ============================================================================
// $FILE_NAME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNameAttribute {
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub changed: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    /// 48-bit record number of the parent directory
    pub parent_record_number: u64,
    pub parent_sequence_number: u16,
    pub logical_size: u64,
    pub physical_size: u64,
    pub flags: FileNameFlags,
    pub namespace: FilenameNamespace,
    pub name: String,
}

impl FileNameAttribute {
    pub const NAME: &'static str = "$FILE_NAME";

    pub fn from_block(block: &AttributeBlock<'_>) -> Result<Self> {
        let bytes = block.bytes;
        require(bytes, FN_MIN_SIZE, Self::NAME)?;
        if !block.is_resident() {
            return Err(MftError::UnsupportedAttributeLayout {
                attribute: Self::NAME,
            });
        }

        let parent = field(bytes, FN_OFFSET_PARENT, FN_PARENT_WIDTH, Self::NAME)?;
        let parent_record_number = LittleEndian::read_uint(parent, FN_PARENT_WIDTH);
        let parent_sequence_number =
            LittleEndian::read_u16(field(bytes, FN_OFFSET_PARENT_SEQUENCE, 2, Self::NAME)?);
        let flags = LittleEndian::read_u32(field(bytes, FN_OFFSET_FLAGS, 4, Self::NAME)?);

        let name_length = field(bytes, FN_OFFSET_NAME_LENGTH, 1, Self::NAME)?[0] as usize * 2;
        let namespace = field(bytes, FN_OFFSET_NAMESPACE, 1, Self::NAME)?[0];

        let name_end = FN_OFFSET_NAME + name_length;
        let name_bytes = if name_end > bytes.len() {
            debug!(
                "{} name runs {} bytes past the attribute end",
                Self::NAME,
                name_end - bytes.len()
            );
            bytes.get(FN_OFFSET_NAME..).unwrap_or_default()
        } else {
            &bytes[FN_OFFSET_NAME..name_end]
        };

        Ok(Self {
            created: read_timestamp(bytes, FN_OFFSET_CREATED, Self::NAME)?,
            modified: read_timestamp(bytes, FN_OFFSET_MODIFIED, Self::NAME)?,
            changed: read_timestamp(bytes, FN_OFFSET_CHANGED, Self::NAME)?,
            accessed: read_timestamp(bytes, FN_OFFSET_ACCESSED, Self::NAME)?,
            parent_record_number,
            parent_sequence_number,
            logical_size: read_u64(bytes, FN_OFFSET_LOGICAL_SIZE, Self::NAME)?,
            physical_size: read_u64(bytes, FN_OFFSET_PHYSICAL_SIZE, Self::NAME)?,
            flags: FileNameFlags::from_bits(flags),
            namespace: FilenameNamespace::from_u8(namespace),
            name: utf16le_to_printable(name_bytes),
        })
    }
}

// ============================================================================
// $DATA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum DataAttribute {
    /// Raw inline content, not interpreted
    Resident { content: Vec<u8> },
    NonResident { data_runs: Vec<DataRun> },
}

impl DataAttribute {
    pub const NAME: &'static str = "$DATA";

    pub fn from_block(block: &AttributeBlock<'_>, bytes_per_cluster: i64) -> Result<Self> {
        let bytes = block.bytes;
        require(bytes, DATA_MIN_SIZE, Self::NAME)?;

        if block.is_resident() {
            return Ok(DataAttribute::Resident {
                content: bytes[DATA_OFFSET_RESIDENT_CONTENT..].to_vec(),
            });
        }

        let run_list_offset = field(bytes, DATA_OFFSET_RUN_LIST_OFFSET, 1, Self::NAME)?[0] as usize;
        let run_list = bytes.get(run_list_offset..).ok_or(MftError::AttributeTooShort {
            attribute: Self::NAME,
            needed: run_list_offset,
            got: bytes.len(),
        })?;

        Ok(DataAttribute::NonResident {
            data_runs: decode_data_runs(run_list, bytes_per_cluster)?,
        })
    }

    pub fn data_runs(&self) -> &[DataRun] {
        match self {
            DataAttribute::Resident { .. } => &[],
            DataAttribute::NonResident { data_runs } => data_runs,
        }
    }
}

// ============================================================================
// Tagged dispatch
// ============================================================================

/// A decoded attribute block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    StandardInformation(StandardInformation),
    FileName(FileNameAttribute),
    Data(DataAttribute),
    /// Structurally valid but not decoded
    Other(AttributeType),
}

impl Attribute {
    pub fn decode(block: &AttributeBlock<'_>, bytes_per_cluster: i64) -> Result<Self> {
        match block.attribute_type {
            AttributeType::StandardInformation => {
                StandardInformation::from_block(block).map(Attribute::StandardInformation)
            }
            AttributeType::FileName => FileNameAttribute::from_block(block).map(Attribute::FileName),
            AttributeType::Data => {
                DataAttribute::from_block(block, bytes_per_cluster).map(Attribute::Data)
            }
            other => Ok(Attribute::Other(other)),
        }
    }
}
