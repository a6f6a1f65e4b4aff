//! On-disk layout manager
//!
//! A keeldb file is a header page followed by repeating checkpoints:
//!
//! ```text
//! | header page | blocks... pad trailer | blocks... pad trailer | ...
//!               ^ blocks_start    ^ ends on a page boundary
//! ```
//!
//! Loading validates the header, then scans page boundaries from the end of
//! the file downward for the newest checkpoint whose trailer and blocks all
//! validate. Bytes after that checkpoint are a damaged tail: they are ignored,
//! never rewritten, and reported to the caller.
//!
//! Appending never touches existing bytes. New blocks go at the current end
//! of the file and the trailer is padded out to the next page boundary.

use super::block::{BlockOp, BlockRef};
use super::errors::{StorageError, StorageResult};
use super::header::FileHeader;
use super::trailer::{Trailer, TRAILER_LEN};

/// Why the tail of a file was discarded at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailDamage {
    /// End of the last valid checkpoint (or of the header)
    pub valid_end: u64,
    /// Length of the file as found
    pub file_len: u64,
    /// First validation failure seen while scanning
    pub reason: String,
}

impl TailDamage {
    /// Number of bytes past the last valid checkpoint
    pub fn discarded_bytes(&self) -> u64 {
        self.file_len - self.valid_end
    }
}

/// Result of loading a file image
#[derive(Debug, Clone)]
pub struct Layout {
    /// Validated header
    pub header: FileHeader,
    /// Newest valid checkpoint, `None` for a never-committed file
    pub current: Option<Trailer>,
    /// Length of the file as found
    pub file_len: u64,
    /// Set when bytes after the newest valid checkpoint were discarded
    pub damage: Option<TailDamage>,
}

/// Validates the header and finds the newest fully valid checkpoint.
///
/// Header problems are fatal. Bytes past the header that never reach a page
/// boundary cannot hold a trailer, so they are tail damage over the empty
/// store. Any other file with no valid checkpoint is fatal.
pub fn load(image: &[u8]) -> StorageResult<Layout> {
    let header = FileHeader::parse(image)?;
    let page = header.page_size as u64;
    let header_end = header.region_len();
    let file_len = image.len() as u64;

    if file_len == header_end {
        return Ok(Layout {
            header,
            current: None,
            file_len,
            damage: None,
        });
    }

    let mut end = file_len - file_len % page;
    let mut first_failure: Option<String> = if end == file_len {
        None
    } else {
        Some(format!(
            "{} trailing bytes after the last page boundary",
            file_len - end
        ))
    };

    if end == header_end {
        return Ok(Layout {
            header,
            current: None,
            file_len,
            damage: Some(TailDamage {
                valid_end: header_end,
                file_len,
                reason: first_failure.unwrap_or_default(),
            }),
        });
    }

    while end >= header_end + TRAILER_LEN {
        match validate_checkpoint(image, end, header.page_size) {
            Ok(trailer) => {
                let damage = first_failure.map(|reason| TailDamage {
                    valid_end: end,
                    file_len,
                    reason,
                });
                return Ok(Layout {
                    header,
                    current: Some(trailer),
                    file_len,
                    damage,
                });
            }
            Err(e) => {
                if first_failure.is_none() {
                    first_failure = Some(e.to_string());
                }
                end -= page;
            }
        }
    }

    Err(StorageError::no_valid_checkpoint(file_len))
}

/// Validates the checkpoint whose trailer ends at `end`, including every
/// data block it covers.
pub fn validate_checkpoint(image: &[u8], end: u64, page_size: u32) -> StorageResult<Trailer> {
    let trailer = Trailer::read_ending_at(image, end, page_size)?;
    checkpoint_blocks(image, &trailer)?;
    Ok(trailer)
}

/// Parses the data blocks written by `trailer`'s checkpoint, in file order.
pub fn checkpoint_blocks<'a>(image: &'a [u8], trailer: &Trailer) -> StorageResult<Vec<BlockRef<'a>>> {
    let limit = trailer.offset();
    let mut blocks = Vec::with_capacity(trailer.block_count as usize);
    let mut offset = trailer.blocks_start;

    for _ in 0..trailer.block_count {
        let block = BlockRef::parse(image, offset, limit)?;
        offset += block.len;
        blocks.push(block);
    }

    Ok(blocks)
}

/// Walks the trailer chain from the checkpoint ending at `upto` back to the
/// header. Returns trailers newest first.
///
/// Every trailer on the chain must validate; a broken link is fatal because
/// it sits below a checkpoint that was already accepted as valid. Blocks are
/// checked later, when [`checkpoint_blocks`] reads them.
pub fn chain(image: &[u8], page_size: u32, upto: u64) -> StorageResult<Vec<Trailer>> {
    let mut trailers = Vec::new();
    let mut end = upto;

    while end != 0 {
        let trailer = Trailer::read_ending_at(image, end, page_size)?;
        let previous = trailer.previous_checkpoint();
        if previous >= end {
            return Err(StorageError::checkpoint_corruption(
                trailer.offset(),
                "trailer chain does not move backward",
            ));
        }
        trailers.push(trailer);
        end = previous;
    }

    Ok(trailers)
}

/// Bytes to append for one checkpoint, split so the caller can make the
/// blocks durable before writing the trailer.
#[derive(Debug, Clone)]
pub struct PendingCheckpoint {
    /// Serialized data blocks, written first
    pub blocks: Vec<u8>,
    /// Zero padding plus the trailer, written last
    pub tail: Vec<u8>,
    /// The trailer that `tail` ends with
    pub trailer: Trailer,
}

impl PendingCheckpoint {
    /// Total bytes this checkpoint appends
    pub fn len(&self) -> u64 {
        (self.blocks.len() + self.tail.len()) as u64
    }

    /// Whether nothing would be appended (never true for a built checkpoint)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lays out a checkpoint to be appended at `file_len`.
///
/// `previous` is the current checkpoint's trailer, if any. Blocks are written
/// in the order given.
pub fn build_checkpoint(
    file_len: u64,
    page_size: u32,
    previous: Option<&Trailer>,
    ops: &[BlockOp],
) -> StorageResult<PendingCheckpoint> {
    if ops.len() > u32::MAX as usize {
        return Err(StorageError::block_too_large(format!(
            "{} blocks exceed the per-checkpoint limit",
            ops.len()
        )));
    }

    let mut blocks = Vec::with_capacity(ops.iter().map(BlockOp::encoded_len).sum());
    for op in ops {
        op.serialize_into(&mut blocks)?;
    }

    let page = page_size as u64;
    let blocks_end = file_len + blocks.len() as u64;
    let checkpoint_size = round_up(blocks_end + TRAILER_LEN, page);
    let padding = checkpoint_size - TRAILER_LEN - blocks_end;

    let trailer = Trailer {
        previous_trailer: previous.map_or(0, Trailer::offset),
        checkpoint_size,
        blocks_start: file_len,
        block_count: ops.len() as u32,
    };

    let mut tail = vec![0u8; padding as usize];
    tail.extend_from_slice(&trailer.serialize());

    Ok(PendingCheckpoint {
        blocks,
        tail,
        trailer,
    })
}

/// Builds a complete file holding a header and a single checkpoint.
pub fn build_compacted(page_size: u32, ops: &[BlockOp]) -> StorageResult<Vec<u8>> {
    let mut image = FileHeader::new(page_size).serialize();
    if ops.is_empty() {
        return Ok(image);
    }

    let pending = build_checkpoint(image.len() as u64, page_size, None, ops)?;
    image.extend_from_slice(&pending.blocks);
    image.extend_from_slice(&pending.tail);
    Ok(image)
}

fn round_up(value: u64, multiple: u64) -> u64 {
    value.div_ceil(multiple) * multiple
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: u32 = 512;

    fn append(image: &mut Vec<u8>, previous: Option<&Trailer>, ops: &[BlockOp]) -> Trailer {
        let pending = build_checkpoint(image.len() as u64, PAGE, previous, ops).unwrap();
        image.extend_from_slice(&pending.blocks);
        image.extend_from_slice(&pending.tail);
        pending.trailer
    }

    fn two_checkpoints() -> (Vec<u8>, Trailer, Trailer) {
        let mut image = FileHeader::new(PAGE).serialize();
        let first = append(
            &mut image,
            None,
            &[BlockOp::put("a", "1"), BlockOp::put("b", "2")],
        );
        let second = append(&mut image, Some(&first), &[BlockOp::remove("a")]);
        (image, first, second)
    }

    #[test]
    fn test_empty_file_has_no_checkpoint() {
        let image = FileHeader::new(PAGE).serialize();
        let layout = load(&image).unwrap();
        assert!(layout.current.is_none());
        assert!(layout.damage.is_none());
    }

    #[test]
    fn test_checkpoints_are_page_aligned_and_chained() {
        let (image, first, second) = two_checkpoints();
        assert_eq!(first.checkpoint_size % PAGE as u64, 0);
        assert_eq!(second.checkpoint_size, image.len() as u64);
        assert_eq!(second.previous_checkpoint(), first.checkpoint_size);
        assert_eq!(second.blocks_start, first.checkpoint_size);

        let layout = load(&image).unwrap();
        assert_eq!(layout.current, Some(second));
        assert!(layout.damage.is_none());

        let trailers = chain(&image, PAGE, second.checkpoint_size).unwrap();
        assert_eq!(trailers, vec![second, first]);
    }

    #[test]
    fn test_flipped_last_byte_rolls_back() {
        let (mut image, first, _) = two_checkpoints();
        let last = image.len() - 1;
        image[last] ^= 0xFF;

        let layout = load(&image).unwrap();
        assert_eq!(layout.current, Some(first));
        let damage = layout.damage.unwrap();
        assert_eq!(damage.valid_end, first.checkpoint_size);
        assert!(damage.reason.contains("checksum"));
    }

    #[test]
    fn test_appended_garbage_is_damage() {
        let (mut image, _, second) = two_checkpoints();
        image.extend_from_slice(b"O HAI! IM IN UR DATABASE");

        let layout = load(&image).unwrap();
        assert_eq!(layout.current, Some(second));
        assert_eq!(layout.damage.unwrap().discarded_bytes(), 24);
    }

    #[test]
    fn test_corrupt_block_invalidates_its_checkpoint() {
        let (mut image, first, second) = two_checkpoints();
        image[second.blocks_start as usize + 6] ^= 0x01;

        let layout = load(&image).unwrap();
        assert_eq!(layout.current, Some(first));
        assert!(layout.damage.is_some());
    }

    #[test]
    fn test_single_damaged_checkpoint_is_fatal() {
        let mut image = FileHeader::new(PAGE).serialize();
        append(&mut image, None, &[BlockOp::put("a", "1")]);
        let last = image.len() - 1;
        image[last] ^= 0xFF;

        let err = load(&image).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code().code(), "KEEL_NO_VALID_CHECKPOINT");
    }

    #[test]
    fn test_short_tail_on_empty_store_is_damage() {
        let mut image = FileHeader::new(PAGE).serialize();
        image.extend_from_slice(b"O HAI! IM IN UR DATABASE");

        let layout = load(&image).unwrap();
        assert!(layout.current.is_none());
        let damage = layout.damage.unwrap();
        assert_eq!(damage.valid_end, PAGE as u64);
        assert_eq!(damage.discarded_bytes(), 24);
    }

    #[test]
    fn test_full_page_of_garbage_on_empty_store_is_fatal() {
        let mut image = FileHeader::new(PAGE).serialize();
        image.extend_from_slice(&[0xAB; PAGE as usize]);

        let err = load(&image).unwrap_err();
        assert_eq!(err.code().code(), "KEEL_NO_VALID_CHECKPOINT");
    }

    #[test]
    fn test_build_compacted_has_no_history() {
        let image = build_compacted(PAGE, &[BlockOp::put("k", "v")]).unwrap();
        let layout = load(&image).unwrap();
        let trailer = layout.current.unwrap();
        assert_eq!(trailer.previous_checkpoint(), 0);
        assert_eq!(trailer.block_count, 1);

        let empty = build_compacted(PAGE, &[]).unwrap();
        assert_eq!(empty.len(), PAGE as usize);
    }

    #[test]
    fn test_large_checkpoint_spans_pages() {
        let value = vec![7u8; 3000];
        let mut image = FileHeader::new(PAGE).serialize();
        let trailer = append(&mut image, None, &[BlockOp::put("big", value.clone())]);
        assert!(trailer.checkpoint_size >= 512 + 3000);

        let blocks = checkpoint_blocks(&image, &trailer).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].value, &value[..]);
    }
}
