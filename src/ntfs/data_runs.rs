//! Data run (cluster run list) decoding for non-resident attributes
//!
//! Each run starts with a control byte: the low nibble is the byte width of
//! the cluster count that follows, the high nibble the byte width of the
//! signed cluster offset after it. Offsets are deltas from the previous run's
//! starting cluster. A control byte of 0x00 ends the list.

use crate::error::{MftError, Result};
use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

/// One resolved extent, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataRun {
    pub absolute_offset: i64,
    pub length: i64,
}

/// Field widths encoded in a run's control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRunSplit {
    pub offset_byte_count: usize,
    pub length_byte_count: usize,
}

impl DataRunSplit {
    pub fn from_control(control: u8) -> Self {
        Self {
            offset_byte_count: (control >> 4) as usize,
            length_byte_count: (control & 0x0F) as usize,
        }
    }

    /// Total bytes of the two fields following the control byte
    pub fn field_bytes(&self) -> usize {
        self.offset_byte_count + self.length_byte_count
    }
}

/// Decode a run list into absolute byte extents, preserving stream order.
///
/// Running out of input at a run boundary ends the list like a terminator.
pub fn decode_data_runs(data: &[u8], bytes_per_cluster: i64) -> Result<Vec<DataRun>> {
    if bytes_per_cluster <= 0 {
        return Err(MftError::config("bytes per cluster must be positive"));
    }

    let mut runs = Vec::new();
    let mut pos = 0;
    let mut current_cluster: i64 = 0;

    while pos < data.len() {
        let control = data[pos];
        if control == 0 {
            break;
        }

        let split = DataRunSplit::from_control(control);
        validate_split(&split, pos)?;
        pos += 1;

        let available = data.len() - pos;
        if split.field_bytes() > available {
            return Err(MftError::TruncatedDataRun {
                offset: pos - 1,
                needed: split.field_bytes(),
                available,
            });
        }

        let cluster_count = LittleEndian::read_int(&data[pos..], split.length_byte_count);
        pos += split.length_byte_count;
        let cluster_delta = LittleEndian::read_int(&data[pos..], split.offset_byte_count);
        pos += split.offset_byte_count;

        if cluster_count <= 0 {
            return Err(MftError::InvalidDataRun(format!(
                "run {} has cluster count {}",
                runs.len(),
                cluster_count
            )));
        }
        if runs.is_empty() && cluster_delta == 0 {
            return Err(MftError::InvalidDataRun(
                "first run starts at cluster 0".to_string(),
            ));
        }

        current_cluster = current_cluster
            .checked_add(cluster_delta)
            .ok_or_else(|| MftError::InvalidDataRun("cluster offset overflow".to_string()))?;

        let absolute_offset = current_cluster
            .checked_mul(bytes_per_cluster)
            .ok_or_else(|| MftError::InvalidDataRun("byte offset overflow".to_string()))?;
        let length = cluster_count
            .checked_mul(bytes_per_cluster)
            .ok_or_else(|| MftError::InvalidDataRun("byte length overflow".to_string()))?;

        runs.push(DataRun {
            absolute_offset,
            length,
        });
    }

    Ok(runs)
}

fn validate_split(split: &DataRunSplit, pos: usize) -> Result<()> {
    if split.length_byte_count == 0 || split.length_byte_count > 8 {
        return Err(MftError::InvalidDataRun(format!(
            "length field width {} at offset {}",
            split.length_byte_count, pos
        )));
    }
    // Sparse runs (no offset field) are not supported
    if split.offset_byte_count == 0 || split.offset_byte_count > 8 {
        return Err(MftError::InvalidDataRun(format!(
            "offset field width {} at offset {}",
            split.offset_byte_count, pos
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntfs::testing::{DATA, DATA_RUNS};

    #[test]
    fn control_byte_split() {
        let split = DataRunSplit::from_control(0x33);
        assert_eq!(split.offset_byte_count, 3);
        assert_eq!(split.length_byte_count, 3);

        let split = DataRunSplit::from_control(0x04);
        assert_eq!(split.offset_byte_count, 0);
        assert_eq!(split.length_byte_count, 4);

        let split = DataRunSplit::from_control(0x42);
        assert_eq!(split.offset_byte_count, 4);
        assert_eq!(split.length_byte_count, 2);
    }

    #[test]
    fn two_runs_accumulate_offsets() {
        // 0x33: 3-byte length then 3-byte offset
        let runs = [
            0x33, 0x10, 0x00, 0x00, 0x00, 0x01, 0x00, // 16 clusters at 0x100
            0x33, 0x08, 0x00, 0x00, 0x00, 0x02, 0x00, // 8 clusters at +0x200
            0x00,
        ];
        let decoded = decode_data_runs(&runs, 4096).unwrap();
        assert_eq!(
            decoded,
            vec![
                DataRun { absolute_offset: 0x100 * 4096, length: 16 * 4096 },
                DataRun { absolute_offset: 0x300 * 4096, length: 8 * 4096 },
            ]
        );
    }

    #[test]
    fn mixed_field_widths() {
        // linux-ntfs documentation example
        let runs = [
            0x31, 0x38, 0x73, 0x25, 0x34, 0x32, 0x14, 0x01, 0xE5, 0x11, 0x02, 0x31, 0x42, 0xAA,
            0x00, 0x03, 0x00,
        ];
        let decoded = decode_data_runs(&runs, 1).unwrap();
        assert_eq!(
            decoded,
            vec![
                DataRun { absolute_offset: 0x342573, length: 0x38 },
                DataRun { absolute_offset: 0x363758, length: 0x114 },
                DataRun { absolute_offset: 0x393802, length: 0x42 },
            ]
        );
    }

    #[test]
    fn negative_delta_moves_backwards() {
        let runs = [0x11, 0x01, 0x10, 0x11, 0x01, 0xF8, 0x00];
        let decoded = decode_data_runs(&runs, 4096).unwrap();
        assert_eq!(decoded[0].absolute_offset, 16 * 4096);
        assert_eq!(decoded[1].absolute_offset, 8 * 4096);
    }

    #[test]
    fn reference_run_list_keeps_stream_order() {
        let decoded = decode_data_runs(&DATA[0x40..], 4096).unwrap();
        let expected: Vec<DataRun> = DATA_RUNS
            .iter()
            .map(|&(absolute_offset, length)| DataRun { absolute_offset, length })
            .collect();
        assert_eq!(decoded, expected);
        // Run 4 jumps backwards; order is not sorted
        assert!(decoded[3].absolute_offset < decoded[2].absolute_offset);
    }

    #[test]
    fn truncated_field_fails() {
        let runs = [0x33, 0x10, 0x00];
        match decode_data_runs(&runs, 4096) {
            Err(MftError::TruncatedDataRun { offset, needed, available }) => {
                assert_eq!(offset, 0);
                assert_eq!(needed, 6);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn zero_width_offset_fails() {
        assert!(matches!(
            decode_data_runs(&[0x04, 0x10, 0x00, 0x00, 0x00, 0x00], 4096),
            Err(MftError::InvalidDataRun(_))
        ));
    }

    #[test]
    fn zero_first_offset_fails() {
        assert!(matches!(
            decode_data_runs(&[0x11, 0x10, 0x00, 0x00], 4096),
            Err(MftError::InvalidDataRun(_))
        ));
    }

    #[test]
    fn zero_length_fails() {
        assert!(matches!(
            decode_data_runs(&[0x11, 0x00, 0x10, 0x00], 4096),
            Err(MftError::InvalidDataRun(_))
        ));
    }

    #[test]
    fn empty_and_terminator_only() {
        assert_eq!(decode_data_runs(&[], 4096).unwrap(), vec![]);
        assert_eq!(decode_data_runs(&[0x00, 0x33, 0xFF], 4096).unwrap(), vec![]);
    }

    #[test]
    fn missing_terminator_at_boundary_is_accepted() {
        let runs = [0x11, 0x02, 0x05];
        assert_eq!(
            decode_data_runs(&runs, 512).unwrap(),
            vec![DataRun { absolute_offset: 5 * 512, length: 2 * 512 }]
        );
    }

    #[test]
    fn zero_cluster_size_is_configuration_error() {
        assert!(matches!(
            decode_data_runs(&[0x11, 0x02, 0x05, 0x00], 0),
            Err(MftError::Configuration(_))
        ));
    }
}
