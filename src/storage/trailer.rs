//! Checkpoint trailer format
//!
//! A trailer closes every checkpoint and always ends on a page boundary:
//!
//! ```text
//! +------------------+
//! | Magic            | (u64 LE)
//! +------------------+
//! | Previous Trailer | (u64 LE, file offset, 0 = none)
//! +------------------+
//! | Checkpoint Size  | (u64 LE, file size once this trailer is written)
//! +------------------+
//! | Blocks Start     | (u64 LE, offset of this checkpoint's first block)
//! +------------------+
//! | Block Count      | (u32 LE)
//! +------------------+
//! | Checksum         | (u32 LE, over the 36 bytes above)
//! +------------------+
//! ```
//!
//! The checkpoint size doubles as the checkpoint's public identifier.

use super::checksum::{compute_checksum, read_u32, read_u64, verify_checksum};
use super::errors::{StorageError, StorageResult};

/// Serialized trailer length
pub const TRAILER_LEN: u64 = 8 + 8 + 8 + 8 + 4 + 4;

/// Magic value opening every trailer ("KEELTRLR")
pub const TRAILER_MAGIC: u64 = u64::from_le_bytes(*b"KEELTRLR");

/// Decoded checkpoint trailer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Offset of the previous checkpoint's trailer, 0 if none
    pub previous_trailer: u64,
    /// File size at commit time; the checkpoint id
    pub checkpoint_size: u64,
    /// Offset of the first data block written by this checkpoint
    pub blocks_start: u64,
    /// Number of data blocks written by this checkpoint
    pub block_count: u32,
}

impl Trailer {
    /// File offset of this trailer
    pub fn offset(&self) -> u64 {
        self.checkpoint_size - TRAILER_LEN
    }

    /// Public id of the previous checkpoint, 0 if none
    pub fn previous_checkpoint(&self) -> u64 {
        if self.previous_trailer == 0 {
            0
        } else {
            self.previous_trailer + TRAILER_LEN
        }
    }

    /// Serializes the trailer.
    pub fn serialize(&self) -> [u8; TRAILER_LEN as usize] {
        let mut buf = [0u8; TRAILER_LEN as usize];
        buf[0..8].copy_from_slice(&TRAILER_MAGIC.to_le_bytes());
        buf[8..16].copy_from_slice(&self.previous_trailer.to_le_bytes());
        buf[16..24].copy_from_slice(&self.checkpoint_size.to_le_bytes());
        buf[24..32].copy_from_slice(&self.blocks_start.to_le_bytes());
        buf[32..36].copy_from_slice(&self.block_count.to_le_bytes());
        let checksum = compute_checksum(&buf[0..36]);
        buf[36..40].copy_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// Reads the trailer that ends at `end` and checks its own fields.
    ///
    /// This validates magic, checksum, alignment and the back-pointer range.
    /// It does not look at the data blocks; see
    /// [`super::layout::validate_checkpoint`].
    pub fn read_ending_at(image: &[u8], end: u64, page_size: u32) -> StorageResult<Self> {
        let page = page_size as u64;
        if end < page + TRAILER_LEN || end > image.len() as u64 {
            return Err(StorageError::checkpoint_corruption(
                end,
                "trailer position outside the file",
            ));
        }
        if end % page != 0 {
            return Err(StorageError::checkpoint_corruption(
                end,
                "trailer does not end on a page boundary",
            ));
        }

        let start = (end - TRAILER_LEN) as usize;
        let raw = &image[start..end as usize];

        if read_u64(raw, 0) != TRAILER_MAGIC {
            return Err(StorageError::checkpoint_corruption(
                start as u64,
                "trailer magic mismatch",
            ));
        }

        let stored_checksum = read_u32(raw, 36);
        if !verify_checksum(&raw[0..36], stored_checksum) {
            return Err(StorageError::checkpoint_corruption(
                start as u64,
                format!("trailer checksum mismatch: stored {:08x}", stored_checksum),
            ));
        }

        let trailer = Self {
            previous_trailer: read_u64(raw, 8),
            checkpoint_size: read_u64(raw, 16),
            blocks_start: read_u64(raw, 24),
            block_count: read_u32(raw, 32),
        };

        if trailer.checkpoint_size != end {
            return Err(StorageError::checkpoint_corruption(
                start as u64,
                format!(
                    "trailer records size {} but ends at {}",
                    trailer.checkpoint_size, end
                ),
            ));
        }

        if trailer.blocks_start < page || trailer.blocks_start > trailer.offset() {
            return Err(StorageError::checkpoint_corruption(
                start as u64,
                format!("blocks start {} out of range", trailer.blocks_start),
            ));
        }

        if trailer.previous_trailer != 0 {
            let previous_end = trailer.previous_trailer + TRAILER_LEN;
            if trailer.previous_trailer < page
                || previous_end > trailer.blocks_start
                || previous_end % page != 0
            {
                return Err(StorageError::checkpoint_corruption(
                    start as u64,
                    format!(
                        "previous trailer offset {} out of range",
                        trailer.previous_trailer
                    ),
                ));
            }
        }

        Ok(trailer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: u32 = 512;

    fn image_with_trailer(trailer: &Trailer) -> Vec<u8> {
        let mut image = vec![0u8; trailer.offset() as usize];
        image.extend_from_slice(&trailer.serialize());
        image
    }

    fn first_trailer() -> Trailer {
        Trailer {
            previous_trailer: 0,
            checkpoint_size: 1024,
            blocks_start: 512,
            block_count: 0,
        }
    }

    #[test]
    fn test_trailer_reads_back() {
        let trailer = first_trailer();
        let image = image_with_trailer(&trailer);
        let read = Trailer::read_ending_at(&image, 1024, PAGE).unwrap();
        assert_eq!(read, trailer);
        assert_eq!(read.previous_checkpoint(), 0);
    }

    #[test]
    fn test_previous_checkpoint_id() {
        let trailer = Trailer {
            previous_trailer: 1024 - TRAILER_LEN,
            checkpoint_size: 2048,
            blocks_start: 1024,
            block_count: 1,
        };
        assert_eq!(trailer.previous_checkpoint(), 1024);
        let image = image_with_trailer(&trailer);
        assert!(Trailer::read_ending_at(&image, 2048, PAGE).is_ok());
    }

    #[test]
    fn test_last_byte_flip_invalidates() {
        let mut image = image_with_trailer(&first_trailer());
        let last = image.len() - 1;
        image[last] ^= 0xFF;
        assert!(Trailer::read_ending_at(&image, 1024, PAGE).is_err());
    }

    #[test]
    fn test_unaligned_end_rejected() {
        let image = image_with_trailer(&first_trailer());
        assert!(Trailer::read_ending_at(&image, 1000, PAGE).is_err());
    }

    #[test]
    fn test_back_pointer_must_precede_blocks() {
        let trailer = Trailer {
            previous_trailer: 1536 - TRAILER_LEN,
            checkpoint_size: 2048,
            blocks_start: 1024,
            block_count: 0,
        };
        let image = image_with_trailer(&trailer);
        let err = Trailer::read_ending_at(&image, 2048, PAGE).unwrap_err();
        assert!(err.to_string().contains("previous trailer"));
    }
}
