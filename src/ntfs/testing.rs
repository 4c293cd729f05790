//! Hand-built record fixtures shared by the unit tests

use crate::ntfs::structs::MFT_RECORD_SIZE;

/// $STANDARD_INFORMATION of a real $MFT record
pub const STANDARD_INFORMATION: [u8; 96] = [
    16, 0, 0, 0, 96, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 72, 0, 0, 0, 24, 0, 0, 0, 49, 147, 66, 169,
    237, 209, 211, 1, 49, 147, 66, 169, 237, 209, 211, 1, 44, 238, 221, 229, 226, 245, 211, 1, 49,
    147, 66, 169, 237, 209, 211, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    253, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 168, 220, 169, 88, 0, 0, 0, 0,
];

/// $FILE_NAME "$MFT" (parent 5, WIN32 & DOS, hidden + system)
pub const FILE_NAME: [u8; 104] = [
    48, 0, 0, 0, 104, 0, 0, 0, 0, 0, 24, 0, 0, 0, 3, 0, 74, 0, 0, 0, 24, 0, 1, 0, 5, 0, 0, 0, 0,
    0, 5, 0, 234, 36, 205, 74, 116, 212, 209, 1, 234, 36, 205, 74, 116, 212, 209, 1, 234, 36, 205,
    74, 116, 212, 209, 1, 234, 36, 205, 74, 116, 212, 209, 1, 0, 64, 0, 0, 0, 0, 0, 0, 0, 64, 0, 0,
    0, 0, 0, 0, 6, 0, 0, 0, 0, 0, 0, 0, 4, 3, 36, 0, 77, 0, 70, 0, 84, 0, 0, 0, 0, 0, 0, 0,
];

/// Non-resident $DATA with seven data runs
pub const DATA: [u8; 120] = [
    128, 0, 0, 0, 120, 0, 0, 0, 1, 0, 64, 0, 0, 0, 6, 0, 0, 0, 0, 0, 0, 0, 0, 0, 63, 55, 5, 0, 0,
    0, 0, 0, 64, 0, 0, 0, 0, 0, 0, 0, 0, 0, 116, 83, 0, 0, 0, 0, 0, 0, 116, 83, 0, 0, 0, 0, 0, 0,
    116, 83, 0, 0, 0, 0, 51, 32, 200, 0, 0, 0, 12, 67, 109, 148, 1, 212, 133, 226, 1, 67, 54, 210,
    0, 106, 250, 123, 9, 66, 253, 12, 241, 48, 8, 245, 66, 69, 99, 201, 78, 228, 8, 67, 97, 209, 0,
    235, 81, 198, 1, 67, 218, 198, 0, 17, 228, 150, 1, 0, 0, 0,
];

/// (absolute offset, length) of the runs in [`DATA`] at 4096 bytes per cluster
pub const DATA_RUNS: [(i64, i64); 7] = [
    (3221225472, 209846272),
    (132747444224, 424071168),
    (784502874112, 220422144),
    (30787432448, 13619200),
    (641829142528, 104091648),
    (763784736768, 219549696),
    (873008676864, 208510976),
];

/// Build a resident $FILE_NAME attribute
pub fn file_name_attribute(parent: u64, name: &str, namespace: u8, flags: u32) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let content_len = 0x42 + units.len() * 2;
    let size = (0x18 + content_len + 7) & !7;

    let mut attr = vec![0u8; size];
    attr[0] = 0x30;
    attr[4..8].copy_from_slice(&(size as u32).to_le_bytes());
    attr[0x10..0x14].copy_from_slice(&(content_len as u32).to_le_bytes());
    attr[0x14..0x16].copy_from_slice(&0x18u16.to_le_bytes());
    attr[0x18..0x1E].copy_from_slice(&parent.to_le_bytes()[..6]);
    attr[0x1E..0x20].copy_from_slice(&1u16.to_le_bytes());
    for ts in [0x20, 0x28, 0x30, 0x38] {
        attr[ts..ts + 8].copy_from_slice(&0x01d1_d474_4acd_24eau64.to_le_bytes());
    }
    attr[0x40..0x48].copy_from_slice(&512u64.to_le_bytes());
    attr[0x48..0x50].copy_from_slice(&4096u64.to_le_bytes());
    attr[0x50..0x54].copy_from_slice(&flags.to_le_bytes());
    attr[0x58] = units.len() as u8;
    attr[0x59] = namespace;
    for (i, unit) in units.iter().enumerate() {
        attr[0x5A + i * 2..0x5C + i * 2].copy_from_slice(&unit.to_le_bytes());
    }
    attr
}

/// Build a resident named $DATA stream (an alternate data stream)
pub fn named_data_attribute(name: &str, content: &[u8]) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let content_offset = (0x18 + units.len() * 2 + 7) & !7;
    let size = (content_offset + content.len() + 7) & !7;

    let mut attr = vec![0u8; size];
    attr[0] = 0x80;
    attr[4..8].copy_from_slice(&(size as u32).to_le_bytes());
    attr[0x09] = units.len() as u8;
    attr[0x0A..0x0C].copy_from_slice(&0x18u16.to_le_bytes());
    attr[0x10..0x14].copy_from_slice(&(content.len() as u32).to_le_bytes());
    attr[0x14..0x16].copy_from_slice(&(content_offset as u16).to_le_bytes());
    for (i, unit) in units.iter().enumerate() {
        attr[0x18 + i * 2..0x1A + i * 2].copy_from_slice(&unit.to_le_bytes());
    }
    attr[content_offset..content_offset + content.len()].copy_from_slice(content);
    attr
}

/// Assembles a 1024-byte record with a valid update sequence array
pub struct RecordBuilder {
    record_number: u32,
    flags: u8,
    attributes: Vec<Vec<u8>>,
}

impl RecordBuilder {
    pub fn new(record_number: u32) -> Self {
        Self {
            record_number,
            flags: 0x01,
            attributes: Vec::new(),
        }
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    /// Zero-filled resident attribute of the given type and size
    pub fn attribute(mut self, attribute_type: u8, size: usize) -> Self {
        let mut attr = vec![0u8; size];
        attr[0] = attribute_type;
        attr[4..8].copy_from_slice(&(size as u32).to_le_bytes());
        self.attributes.push(attr);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.attributes.push(bytes.to_vec());
        self
    }

    pub fn file_name(self, parent: u64, name: &str, namespace: u8) -> Self {
        self.raw(&file_name_attribute(parent, name, namespace, 0))
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = vec![0u8; MFT_RECORD_SIZE];
        data[0..4].copy_from_slice(b"FILE");
        data[4..6].copy_from_slice(&0x30u16.to_le_bytes());
        data[6..8].copy_from_slice(&3u16.to_le_bytes());
        data[0x14..0x16].copy_from_slice(&0x38u16.to_le_bytes());
        data[0x16] = self.flags;
        data[0x2C..0x30].copy_from_slice(&self.record_number.to_le_bytes());

        let mut offset = 0x38;
        for attr in &self.attributes {
            data[offset..offset + attr.len()].copy_from_slice(attr);
            offset += attr.len();
        }
        data[offset..offset + 4].copy_from_slice(&[0xFF; 4]);

        // Update sequence array: sequence number then the original tails
        let seq = [0x1d, 0x07];
        data[0x30..0x32].copy_from_slice(&seq);
        for (i, tail) in [510usize, 1022].into_iter().enumerate() {
            let slot = 0x32 + i * 2;
            data[slot] = data[tail];
            data[slot + 1] = data[tail + 1];
            data[tail..tail + 2].copy_from_slice(&seq);
        }
        data
    }
}
