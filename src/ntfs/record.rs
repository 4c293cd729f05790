//! MFT record framing
//!
//! Validates a raw record slot, restores update-sequence fixups, trims the
//! slack space after the attribute list and walks the attribute blocks.

use crate::error::{MftError, Result};
use crate::ntfs::structs::*;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

// ============================================================================
// Record Header
// ============================================================================

/// Deleted/directory state decoded from the single flag byte at 0x16
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFlags {
    pub deleted: bool,
    pub directory: bool,
}

impl RecordFlags {
    pub fn from_byte(flag: u8) -> Self {
        match flag {
            RECORD_FLAG_DELETED => Self {
                deleted: true,
                directory: false,
            },
            RECORD_FLAG_DIRECTORY => Self {
                deleted: false,
                directory: true,
            },
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub attributes_offset: u16,
    pub record_number: u32,
    pub flags: RecordFlags,
}

impl RecordHeader {
    /// Parse the record header, rejecting anything without the FILE0 magic
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if !is_mft_record(data) {
            return Err(MftError::NotAnMftRecord);
        }
        if data.len() < RECORD_HEADER_SIZE {
            return Err(MftError::TooShort {
                needed: RECORD_HEADER_SIZE,
                got: data.len(),
            });
        }

        Ok(Self {
            attributes_offset: LittleEndian::read_u16(
                &data[OFFSET_ATTRIBUTES_OFFSET..OFFSET_ATTRIBUTES_OFFSET + 2],
            ),
            record_number: LittleEndian::read_u32(
                &data[OFFSET_RECORD_NUMBER..OFFSET_RECORD_NUMBER + 4],
            ),
            flags: RecordFlags::from_byte(data[OFFSET_RECORD_FLAGS]),
        })
    }
}

/// Quick check to see if a buffer starts with the MFT record magic
pub fn is_mft_record(data: &[u8]) -> bool {
    data.len() >= MFT_RECORD_MAGIC.len() && &data[..MFT_RECORD_MAGIC.len()] == MFT_RECORD_MAGIC
}

/// Quick check of the flag byte, used to pre-filter directory records
pub fn is_directory_record(data: &[u8]) -> bool {
    data.len() > OFFSET_RECORD_FLAGS && data[OFFSET_RECORD_FLAGS] == RECORD_FLAG_DIRECTORY
}

// ============================================================================
// Fixups
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupStatus {
    Applied,
    /// Update sequence array absent or out of range
    NotPresent,
    /// A sector tail did not carry the sequence number; buffer left untouched
    Mismatch,
}

/// Apply the update sequence array to restore sector tail bytes.
///
/// NTFS stores the last 2 bytes of each sector in the fixup array and replaces
/// them with a sequence number. Sectors that fall outside the buffer are left
/// alone. Nothing is written unless every in-range sector verifies.
pub fn apply_fixup(data: &mut [u8]) -> FixupStatus {
    if data.len() < RECORD_HEADER_SIZE {
        return FixupStatus::NotPresent;
    }

    let usa_offset = LittleEndian::read_u16(
        &data[OFFSET_UPDATE_SEQUENCE_OFFSET..OFFSET_UPDATE_SEQUENCE_OFFSET + 2],
    ) as usize;
    let usa_count = LittleEndian::read_u16(
        &data[OFFSET_UPDATE_SEQUENCE_COUNT..OFFSET_UPDATE_SEQUENCE_COUNT + 2],
    ) as usize;

    if usa_count < 2
        || usa_offset < OFFSET_UPDATE_SEQUENCE_COUNT + 2
        || usa_offset + usa_count * 2 > data.len()
    {
        return FixupStatus::NotPresent;
    }

    let seq_number = [data[usa_offset], data[usa_offset + 1]];

    let sectors: Vec<(usize, usize)> = (1..usa_count)
        .map(|i| (i * SECTOR_SIZE - 2, usa_offset + i * 2))
        .take_while(|&(sector_end, _)| sector_end + 2 <= data.len())
        .collect();

    if sectors.is_empty() {
        return FixupStatus::NotPresent;
    }

    let verified = sectors
        .iter()
        .all(|&(sector_end, _)| data[sector_end..sector_end + 2] == seq_number);
    if !verified {
        return FixupStatus::Mismatch;
    }

    for (sector_end, fixup_offset) in sectors {
        data[sector_end] = data[fixup_offset];
        data[sector_end + 1] = data[fixup_offset + 1];
    }

    FixupStatus::Applied
}

// ============================================================================
// Slack space
// ============================================================================

/// Position of the first end-of-attributes sequence at or after `from`
pub fn slack_boundary(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(END_OF_ATTRIBUTES.len())
        .position(|w| w == END_OF_ATTRIBUTES)
        .map(|p| from + p)
}

// ============================================================================
// Attribute blocks
// ============================================================================

/// One attribute's raw span, borrowed from the owning record buffer
#[derive(Debug, Clone, Copy)]
pub struct AttributeBlock<'a> {
    pub attribute_type: AttributeType,
    /// Size as declared by the attribute header
    pub declared_size: u32,
    /// Offset of the block within the record
    pub offset: usize,
    /// UTF-16 units in the attribute name; 0 for the unnamed stream
    pub name_length: u8,
    /// The block bytes, clipped to the record
    pub bytes: &'a [u8],
}

impl<'a> AttributeBlock<'a> {
    pub fn is_resident(&self) -> bool {
        self.bytes.get(OFFSET_RESIDENT_FLAG) == Some(&RESIDENT)
    }

    pub fn is_named(&self) -> bool {
        self.name_length != 0
    }
}

/// Iterator over the attribute blocks of a framed record
#[derive(Debug, Clone)]
pub struct AttributeBlocks<'a> {
    data: &'a [u8],
    cursor: usize,
    done: bool,
}

impl<'a> Iterator for AttributeBlocks<'a> {
    type Item = AttributeBlock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let offset = self.cursor;
        let size_end = offset + OFFSET_ATTRIBUTE_SIZE + 4;

        if offset + 4 > self.data.len() || size_end > self.data.len() {
            self.done = true;
            return None;
        }

        // An unknown type byte is the normal end of the list
        let attribute_type = match AttributeType::from_u8(self.data[offset]) {
            Some(t) => t,
            None => {
                self.done = true;
                return None;
            }
        };

        let declared_size =
            LittleEndian::read_u32(&self.data[offset + OFFSET_ATTRIBUTE_SIZE..size_end]);
        if declared_size == 0 {
            trace!("zero-sized {} at offset {:#x}", attribute_type.name(), offset);
            self.done = true;
            return None;
        }

        let end = match offset.checked_add(declared_size as usize) {
            Some(end) if end <= self.data.len() => end,
            _ => {
                // Clip and stop: the next header would lie outside the record
                self.done = true;
                self.data.len()
            }
        };

        self.cursor = end;
        let bytes = &self.data[offset..end];

        Some(AttributeBlock {
            attribute_type,
            declared_size,
            offset,
            name_length: bytes.get(OFFSET_ATTRIBUTE_NAME_LENGTH).copied().unwrap_or(0),
            bytes,
        })
    }
}

// ============================================================================
// Framed record
// ============================================================================

/// A validated record: parsed header plus the slack-trimmed working buffer
#[derive(Debug, Clone, Copy)]
pub struct FramedRecord<'a> {
    pub header: RecordHeader,
    body: &'a [u8],
}

impl<'a> FramedRecord<'a> {
    /// Validate the header and trim slack space. Fixups must already be applied.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let header = RecordHeader::from_bytes(data)?;

        let attributes_offset = header.attributes_offset as usize;
        let body = match slack_boundary(data, attributes_offset) {
            Some(end) => &data[..end],
            None => data,
        };

        Ok(Self { header, body })
    }

    /// Working buffer after slack trimming
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    pub fn attributes(&self) -> AttributeBlocks<'a> {
        AttributeBlocks {
            data: self.body,
            cursor: self.header.attributes_offset as usize,
            done: false,
        }
    }
}

/// Restore fixups in place, then frame the record
pub fn frame_record(data: &mut [u8]) -> Result<FramedRecord<'_>> {
    if !is_mft_record(data) {
        return Err(MftError::NotAnMftRecord);
    }

    if apply_fixup(data) == FixupStatus::Mismatch {
        debug!("update sequence mismatch, decoding record without fixups");
    }

    FramedRecord::new(data)
}
