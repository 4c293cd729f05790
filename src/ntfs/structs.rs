//! NTFS on-disk constants, enumerations and small value types

use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// NTFS Constants
// ============================================================================

/// MFT record magic as found in extracted MFT streams
pub const MFT_RECORD_MAGIC: &[u8; 5] = b"FILE0";

/// Standard MFT record size
pub const MFT_RECORD_SIZE: usize = 1024;

/// Minimum record header size
pub const RECORD_HEADER_SIZE: usize = 0x38;

/// Standard sector size (fixup stride)
pub const SECTOR_SIZE: usize = 512;

/// Record number of the volume root directory
pub const ROOT_RECORD_NUMBER: u64 = 5;

/// Attribute list terminator / slack space boundary
pub const END_OF_ATTRIBUTES: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Path prefix for entries whose parent chain cannot be resolved
pub const ORPHAN_MARKER: &str = "$ORPHANFILE";

// Record header offsets
pub const OFFSET_UPDATE_SEQUENCE_OFFSET: usize = 0x04;
pub const OFFSET_UPDATE_SEQUENCE_COUNT: usize = 0x06;
pub const OFFSET_ATTRIBUTES_OFFSET: usize = 0x14;
pub const OFFSET_RECORD_FLAGS: usize = 0x16;
pub const OFFSET_RECORD_NUMBER: usize = 0x2C;

// Record header flag byte values
pub const RECORD_FLAG_DELETED: u8 = 0x00;
pub const RECORD_FLAG_DIRECTORY: u8 = 0x03;

// Common attribute header offsets
pub const OFFSET_ATTRIBUTE_SIZE: usize = 0x04;
pub const OFFSET_RESIDENT_FLAG: usize = 0x08;
pub const OFFSET_ATTRIBUTE_NAME_LENGTH: usize = 0x09;
pub const RESIDENT: u8 = 0x00;

// ============================================================================
// Attribute Types
// ============================================================================

/// The fifteen attribute type bytes recognised while framing a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttributeType {
    StandardInformation = 0x10,
    AttributeList = 0x20,
    FileName = 0x30,
    VolumeVersion = 0x40,
    SecurityDescriptor = 0x50,
    VolumeName = 0x60,
    VolumeInformation = 0x70,
    Data = 0x80,
    IndexRoot = 0x90,
    IndexAllocation = 0xA0,
    Bitmap = 0xB0,
    SymbolicLink = 0xC0,
    ReparsePoint = 0xD0,
    EaInformation = 0xE0,
    PropertySet = 0xF0,
}

impl AttributeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x10 => Some(Self::StandardInformation),
            0x20 => Some(Self::AttributeList),
            0x30 => Some(Self::FileName),
            0x40 => Some(Self::VolumeVersion),
            0x50 => Some(Self::SecurityDescriptor),
            0x60 => Some(Self::VolumeName),
            0x70 => Some(Self::VolumeInformation),
            0x80 => Some(Self::Data),
            0x90 => Some(Self::IndexRoot),
            0xA0 => Some(Self::IndexAllocation),
            0xB0 => Some(Self::Bitmap),
            0xC0 => Some(Self::SymbolicLink),
            0xD0 => Some(Self::ReparsePoint),
            0xE0 => Some(Self::EaInformation),
            0xF0 => Some(Self::PropertySet),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StandardInformation => "$STANDARD_INFORMATION",
            Self::AttributeList => "$ATTRIBUTE_LIST",
            Self::FileName => "$FILE_NAME",
            Self::VolumeVersion => "$VOLUME_VERSION",
            Self::SecurityDescriptor => "$SECURITY_DESCRIPTOR",
            Self::VolumeName => "$VOLUME_NAME",
            Self::VolumeInformation => "$VOLUME_INFORMATION",
            Self::Data => "$DATA",
            Self::IndexRoot => "$INDEX_ROOT",
            Self::IndexAllocation => "$INDEX_ALLOCATION",
            Self::Bitmap => "$BITMAP",
            Self::SymbolicLink => "$SYMBOLIC_LINK",
            Self::ReparsePoint => "$REPARSE_POINT",
            Self::EaInformation => "$EA_INFORMATION",
            Self::PropertySet => "$PROPERTY_SET",
        }
    }
}

// ============================================================================
// Filename Namespace
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilenameNamespace {
    Posix,
    Win32,
    Dos,
    Win32AndDos,
    Unknown,
}

impl FilenameNamespace {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Posix,
            1 => Self::Win32,
            2 => Self::Dos,
            3 => Self::Win32AndDos,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posix => "POSIX",
            Self::Win32 => "WIN32",
            Self::Dos => "DOS",
            Self::Win32AndDos => "WIN32 & DOS",
            Self::Unknown => "",
        }
    }

    /// WIN32 and POSIX names are canonical; pure DOS short names are aliases
    pub fn is_canonical(&self) -> bool {
        matches!(self, Self::Posix | Self::Win32 | Self::Win32AndDos)
    }
}

impl std::fmt::Display for FilenameNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// File Attributes
// ============================================================================

pub mod file_attributes {
    pub const READONLY: u32 = 0x00000001;
    pub const HIDDEN: u32 = 0x00000002;
    pub const SYSTEM: u32 = 0x00000004;
    pub const DIRECTORY: u32 = 0x00000010;
    pub const ARCHIVE: u32 = 0x00000020;
    pub const DEVICE: u32 = 0x00000040;
    pub const NORMAL: u32 = 0x00000080;
    pub const TEMPORARY: u32 = 0x00000100;
    pub const SPARSE_FILE: u32 = 0x00000200;
    pub const REPARSE_POINT: u32 = 0x00000400;
    pub const COMPRESSED: u32 = 0x00000800;
    pub const OFFLINE: u32 = 0x00001000;
    pub const NOT_CONTENT_INDEXED: u32 = 0x00002000;
    pub const ENCRYPTED: u32 = 0x00004000;
    /// Directory bit as copied from the MFT record into $FILE_NAME
    pub const DUP_FILE_NAME_INDEX_PRESENT: u32 = 0x10000000;
    pub const DUP_VIEW_INDEX_PRESENT: u32 = 0x20000000;
}

/// The fifteen independent $FILE_NAME flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileNameFlags {
    pub read_only: bool,
    pub hidden: bool,
    pub system: bool,
    pub directory: bool,
    pub archive: bool,
    pub device: bool,
    pub normal: bool,
    pub temporary: bool,
    pub sparse: bool,
    pub reparse: bool,
    pub compressed: bool,
    pub offline: bool,
    pub not_content_indexed: bool,
    pub encrypted: bool,
    pub index_view: bool,
}

impl FileNameFlags {
    pub fn from_bits(bits: u32) -> Self {
        use file_attributes::*;
        let set = |mask: u32| bits & mask != 0;

        Self {
            read_only: set(READONLY),
            hidden: set(HIDDEN),
            system: set(SYSTEM),
            // Both layouts alias the directory bit
            directory: set(DIRECTORY) || set(DUP_FILE_NAME_INDEX_PRESENT),
            archive: set(ARCHIVE),
            device: set(DEVICE),
            normal: set(NORMAL),
            temporary: set(TEMPORARY),
            sparse: set(SPARSE_FILE),
            reparse: set(REPARSE_POINT),
            compressed: set(COMPRESSED),
            offline: set(OFFLINE),
            not_content_indexed: set(NOT_CONTENT_INDEXED),
            encrypted: set(ENCRYPTED),
            index_view: set(DUP_VIEW_INDEX_PRESENT),
        }
    }
}

// ============================================================================
// FILETIME conversion utilities
// ============================================================================

/// Seconds between 1601-01-01 and 1970-01-01
const FILETIME_UNIX_EPOCH_SECONDS: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SECOND: u64 = 10_000_000;

/// Convert Windows FILETIME (100-nanosecond ticks since 1601) to a UTC timestamp.
///
/// A raw value of zero means "unset" and yields `None`, as do values that fall
/// outside chrono's representable range.
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }

    let seconds = (filetime / FILETIME_TICKS_PER_SECOND) as i64;
    let nanos = ((filetime % FILETIME_TICKS_PER_SECOND) * 100) as u32;

    DateTime::<Utc>::from_timestamp(seconds - FILETIME_UNIX_EPOCH_SECONDS, nanos)
}

/// Decode UTF-16LE name bytes, keeping only printable characters
pub fn utf16le_to_printable(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]));

    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .filter(|c| !c.is_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn namespace_mapping() {
        assert_eq!(FilenameNamespace::from_u8(0x00).as_str(), "POSIX");
        assert_eq!(FilenameNamespace::from_u8(0x01).as_str(), "WIN32");
        assert_eq!(FilenameNamespace::from_u8(0x02).as_str(), "DOS");
        assert_eq!(FilenameNamespace::from_u8(0x03).as_str(), "WIN32 & DOS");
        assert_eq!(FilenameNamespace::from_u8(0x04).as_str(), "");
        assert!(!FilenameNamespace::Dos.is_canonical());
        assert!(!FilenameNamespace::Unknown.is_canonical());
        assert!(FilenameNamespace::Win32AndDos.is_canonical());
    }

    #[test]
    fn flags_hidden_system() {
        let flags = FileNameFlags::from_bits(u32::from_le_bytes([0x06, 0, 0, 0]));
        assert_eq!(
            flags,
            FileNameFlags {
                hidden: true,
                system: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn flags_read_only_directory_high_bit() {
        let flags = FileNameFlags::from_bits(u32::from_le_bytes([0x01, 0, 0, 0x10]));
        assert_eq!(
            flags,
            FileNameFlags {
                read_only: true,
                directory: true,
                ..Default::default()
            }
        );
        assert_eq!(flags, FileNameFlags::from_bits(0x1000_0001));
    }

    #[test]
    fn flags_every_bit_independent() {
        let all = FileNameFlags::from_bits(0x3000_7FF7);
        assert!(all.read_only && all.hidden && all.system && all.directory);
        assert!(all.archive && all.device && all.normal && all.temporary);
        assert!(all.sparse && all.reparse && all.compressed && all.offline);
        assert!(all.not_content_indexed && all.encrypted && all.index_view);

        let index_view_only = FileNameFlags::from_bits(0x2000_0000);
        assert_eq!(
            index_view_only,
            FileNameFlags {
                index_view: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn filetime_zero_is_unset() {
        assert_eq!(filetime_to_datetime(0), None);
    }

    #[test]
    fn filetime_keeps_sub_second_ticks() {
        let raw = u64::from_le_bytes([49, 147, 66, 169, 237, 209, 211, 1]);
        let ts = filetime_to_datetime(raw).unwrap();
        assert_eq!(
            ts.with_nanosecond(0).unwrap(),
            Utc.with_ymd_and_hms(2018, 4, 11, 23, 34, 40).unwrap()
        );
        assert_eq!(ts.nanosecond(), 104_324_900);
    }

    #[test]
    fn filetime_one_tick_after_epoch() {
        let ts = filetime_to_datetime(1).unwrap();
        assert_eq!(ts.timestamp(), -FILETIME_UNIX_EPOCH_SECONDS);
        assert_eq!(ts.nanosecond(), 100);
    }

    #[test]
    fn printable_name_drops_control_characters() {
        let bytes = [b'$', 0, b'M', 0, 0x07, 0, b'F', 0, b'T', 0];
        assert_eq!(utf16le_to_printable(&bytes), "$MFT");
    }
}
