//! Memory-mapped MFT file source

use crate::error::Result;
use crate::ntfs::structs::MFT_RECORD_SIZE;
use log::{info, warn};
use memmap2::Mmap;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// An extracted $MFT file mapped read-only into memory
pub struct MftFile {
    path: PathBuf,
    // Empty files cannot be mapped
    map: Option<Mmap>,
}

impl MftFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();

        let map = if len == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only; the file must not be truncated
            // while it is open
            Some(unsafe { Mmap::map(&file)? })
        };

        if len % MFT_RECORD_SIZE as u64 != 0 {
            warn!(
                "{}: length {} is not a multiple of {} bytes, final record is partial",
                path.display(),
                len,
                MFT_RECORD_SIZE
            );
        }
        info!("mapped {} ({} bytes)", path.display(), len);

        Ok(Self { path, map })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or_default()
    }

    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// Number of record slots, counting a trailing partial slot
    pub fn record_count(&self) -> u64 {
        self.len().div_ceil(MFT_RECORD_SIZE as u64)
    }

    /// Sequential, rewindable reader over the mapped bytes
    pub fn cursor(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes())
    }

    /// The slot holding `record_number`, if it lies inside the file
    pub fn record_slot(&self, record_number: u64) -> Option<&[u8]> {
        let start = usize::try_from(record_number)
            .ok()?
            .checked_mul(MFT_RECORD_SIZE)?;
        let bytes = self.bytes();
        if start >= bytes.len() {
            return None;
        }
        let end = (start + MFT_RECORD_SIZE).min(bytes.len());
        Some(&bytes[start..end])
    }
}
