//! Whole-record decoding on top of the framer and attribute decoders

use crate::directory_tree::DirectoryEntry;
use crate::error::{MftError, Result};
use crate::ntfs::attributes::{Attribute, DataAttribute, FileNameAttribute, StandardInformation};
use crate::ntfs::data_runs::DataRun;
use crate::ntfs::record::{frame_record, is_directory_record, RecordHeader};
use crate::ntfs::structs::AttributeType;
use log::{debug, trace};

// ============================================================================
// Decoded record
// ============================================================================

/// A fully decoded MFT record
#[derive(Debug)]
pub struct MftRecord {
    pub header: RecordHeader,
    pub standard_information: Option<StandardInformation>,
    /// Every $FILE_NAME instance, in attribute order
    pub file_names: Vec<FileNameAttribute>,
    pub data: Option<DataAttribute>,
    /// Attributes that failed to decode; the rest of the record is still usable
    pub attribute_errors: Vec<MftError>,
}

impl MftRecord {
    pub fn record_number(&self) -> u32 {
        self.header.record_number
    }

    pub fn is_directory(&self) -> bool {
        self.header.flags.directory
    }

    pub fn is_deleted(&self) -> bool {
        self.header.flags.deleted
    }

    /// First WIN32, POSIX or WIN32 & DOS name; DOS short names are never chosen
    pub fn canonical_file_name(&self) -> Option<&FileNameAttribute> {
        self.file_names.iter().find(|f| f.namespace.is_canonical())
    }

    /// Extents of the $DATA attribute, empty when resident or undecodable
    pub fn data_runs(&self) -> &[DataRun] {
        self.data.as_ref().map(DataAttribute::data_runs).unwrap_or_default()
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Decodes raw record slots. Cheap to copy into worker threads.
#[derive(Debug, Clone, Copy)]
pub struct MftParser {
    bytes_per_cluster: i64,
}

impl MftParser {
    pub fn new(bytes_per_cluster: u64) -> Result<Self> {
        if bytes_per_cluster == 0 {
            return Err(MftError::config("bytes per cluster must be greater than 0"));
        }
        let bytes_per_cluster = i64::try_from(bytes_per_cluster)
            .map_err(|_| MftError::config("bytes per cluster is out of range"))?;
        Ok(Self { bytes_per_cluster })
    }

    /// Decode a record slot in place (fixups are applied to `data`).
    ///
    /// Only framing failures are returned as errors; broken attributes are
    /// collected in [`MftRecord::attribute_errors`].
    pub fn parse_record(&self, data: &mut [u8]) -> Result<MftRecord> {
        let framed = frame_record(data)?;

        let mut record = MftRecord {
            header: framed.header,
            standard_information: None,
            file_names: Vec::new(),
            data: None,
            attribute_errors: Vec::new(),
        };

        for block in framed.attributes() {
            trace!(
                "record {}: {} ({} bytes) at {:#x}",
                record.header.record_number,
                block.attribute_type.name(),
                block.declared_size,
                block.offset
            );

            // Alternate data streams never replace the file's unnamed stream
            if block.attribute_type == AttributeType::Data && block.is_named() {
                trace!(
                    "record {}: skipping named $DATA at {:#x}",
                    record.header.record_number,
                    block.offset
                );
                continue;
            }

            match Attribute::decode(&block, self.bytes_per_cluster) {
                Ok(Attribute::StandardInformation(si)) => record.standard_information = Some(si),
                Ok(Attribute::FileName(name)) => record.file_names.push(name),
                Ok(Attribute::Data(data)) => record.data = Some(data),
                Ok(Attribute::Other(_)) => {}
                Err(e) => {
                    debug!(
                        "record {}: {} at {:#x}: {}",
                        record.header.record_number,
                        block.attribute_type.name(),
                        block.offset,
                        e
                    );
                    record.attribute_errors.push(e);
                }
            }
        }

        Ok(record)
    }

    /// Extract the directory tuple of a directory-flagged record.
    ///
    /// Returns `Ok(None)` for anything that is not a directory. Only
    /// $FILE_NAME attributes are decoded.
    pub fn directory_entry(&self, data: &mut [u8]) -> Result<Option<DirectoryEntry>> {
        if !is_directory_record(data) {
            return Ok(None);
        }

        let framed = frame_record(data)?;
        let record_number = framed.header.record_number;

        let canonical = framed
            .attributes()
            .filter(|block| block.attribute_type == AttributeType::FileName)
            .filter_map(|block| match FileNameAttribute::from_block(&block) {
                Ok(name) => Some(name),
                Err(e) => {
                    debug!("directory record {}: {}", record_number, e);
                    None
                }
            })
            .find(|name| name.namespace.is_canonical());

        match canonical {
            Some(name) => Ok(Some(DirectoryEntry {
                record_number: record_number as u64,
                name: name.name,
                parent_record_number: name.parent_record_number,
            })),
            None => Err(MftError::NoCanonicalName { record_number }),
        }
    }
}
