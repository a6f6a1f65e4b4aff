//! File header
//!
//! The header occupies the whole first page of the file:
//!
//! ```text
//! +------------------+
//! | Magic            | (8 bytes, "KEELDB\0\x01")
//! +------------------+
//! | Format Version   | (u32 LE)
//! +------------------+
//! | Page Size        | (u32 LE)
//! +------------------+
//! | Checksum         | (u32 LE, over the 16 bytes above)
//! +------------------+
//! | Zero padding     | (to page_size)
//! +------------------+
//! ```
//!
//! Any failure here is fatal: without a trusted page size the trailer scan
//! has no alignment to work from.

use super::checksum::{compute_checksum, read_u32, verify_checksum};
use super::errors::{StorageError, StorageResult};

/// Magic bytes at offset 0 of every keeldb file
pub const HEADER_MAGIC: [u8; 8] = *b"KEELDB\0\x01";

/// On-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Bytes of the header that carry information (the rest of the page is padding)
pub const HEADER_LEN: usize = 8 + 4 + 4 + 4;

/// Smallest page size accepted
pub const MIN_PAGE_SIZE: u32 = 512;

/// Largest page size accepted
pub const MAX_PAGE_SIZE: u32 = 64 * 1024;

/// Default page size for new files
pub const DEFAULT_PAGE_SIZE: u32 = 4096;

/// Returns whether `page_size` is acceptable for a new or existing file.
pub fn is_valid_page_size(page_size: u32) -> bool {
    page_size.is_power_of_two() && (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size)
}

/// Decoded file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Format version stored in the file
    pub format_version: u32,
    /// Page size every trailer is aligned to
    pub page_size: u32,
}

impl FileHeader {
    /// Creates a header for a new file.
    pub fn new(page_size: u32) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            page_size,
        }
    }

    /// Length of the header region (one page).
    pub fn region_len(&self) -> u64 {
        self.page_size as u64
    }

    /// Serializes the header, padded to a full page.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.page_size as usize);
        buf.extend_from_slice(&HEADER_MAGIC);
        buf.extend_from_slice(&self.format_version.to_le_bytes());
        buf.extend_from_slice(&self.page_size.to_le_bytes());
        let checksum = compute_checksum(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf.resize(self.page_size as usize, 0);
        buf
    }

    /// Parses and validates the header at the start of `data`.
    pub fn parse(data: &[u8]) -> StorageResult<Self> {
        if data.len() < HEADER_LEN {
            return Err(StorageError::header_corruption(format!(
                "file is {} bytes, too short for a header",
                data.len()
            )));
        }

        if data[0..8] != HEADER_MAGIC {
            return Err(StorageError::header_corruption(
                "header magic mismatch: not a keeldb file or header damaged",
            ));
        }

        let stored_checksum = read_u32(data, 16);
        if !verify_checksum(&data[0..16], stored_checksum) {
            return Err(StorageError::header_corruption(format!(
                "header checksum mismatch: stored {:08x}",
                stored_checksum
            )));
        }

        let format_version = read_u32(data, 8);
        if format_version != FORMAT_VERSION {
            return Err(StorageError::header_corruption(format!(
                "unsupported format version {}",
                format_version
            )));
        }

        let page_size = read_u32(data, 12);
        if !is_valid_page_size(page_size) {
            return Err(StorageError::header_corruption(format!(
                "invalid page size {}",
                page_size
            )));
        }

        if (data.len() as u64) < page_size as u64 {
            return Err(StorageError::header_corruption(format!(
                "file is {} bytes, shorter than the {}-byte header page",
                data.len(),
                page_size
            )));
        }

        Ok(Self {
            format_version,
            page_size,
        })
    }
}
