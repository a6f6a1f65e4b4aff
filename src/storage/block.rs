//! Data block format
//!
//! Each checkpoint writes one block per changed key:
//!
//! ```text
//! +------------------+
//! | Block Length     | (u32 LE, whole block including checksum)
//! +------------------+
//! | Kind             | (u8: 0 = document, 1 = tombstone)
//! +------------------+
//! | Key              | (u32 LE length + bytes)
//! +------------------+
//! | Value            | (u32 LE length + bytes, empty for tombstones)
//! +------------------+
//! | Checksum         | (u32 LE)
//! +------------------+
//! ```
//!
//! Checksum covers all bytes except the checksum itself.

use super::checksum::{compute_checksum, read_u32, verify_checksum};
use super::errors::{StorageError, StorageResult};

/// Smallest possible block: length, kind, two empty length prefixes, checksum
pub const MIN_BLOCK_LEN: usize = 4 + 1 + 4 + 4 + 4;

/// What a block records for its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// The key maps to the block's value
    Document,
    /// The key was removed
    Tombstone,
}

impl BlockKind {
    fn to_byte(self) -> u8 {
        match self {
            BlockKind::Document => 0,
            BlockKind::Tombstone => 1,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(BlockKind::Document),
            1 => Some(BlockKind::Tombstone),
            _ => None,
        }
    }
}

/// One staged change handed to the layout manager at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOp {
    /// Document key
    pub key: Vec<u8>,
    /// Encoded value, or `None` for a removal
    pub value: Option<Vec<u8>>,
}

impl BlockOp {
    /// Stage a document write
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    /// Stage a removal
    pub fn remove(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    /// Block kind this op serializes to
    pub fn kind(&self) -> BlockKind {
        if self.value.is_some() {
            BlockKind::Document
        } else {
            BlockKind::Tombstone
        }
    }

    /// Serialized size of this op's block
    pub fn encoded_len(&self) -> usize {
        MIN_BLOCK_LEN + self.key.len() + self.value.as_ref().map_or(0, Vec::len)
    }

    /// Appends the serialized block to `out`.
    pub fn serialize_into(&self, out: &mut Vec<u8>) -> StorageResult<()> {
        let value: &[u8] = self.value.as_deref().unwrap_or(&[]);
        let block_len = self.encoded_len();
        if block_len > u32::MAX as usize {
            return Err(StorageError::block_too_large(format!(
                "block of {} bytes exceeds the 4 GiB limit",
                block_len
            )));
        }

        let start = out.len();
        out.extend_from_slice(&(block_len as u32).to_le_bytes());
        out.push(self.kind().to_byte());
        out.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.key);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
        out.extend_from_slice(value);
        let checksum = compute_checksum(&out[start..]);
        out.extend_from_slice(&checksum.to_le_bytes());
        Ok(())
    }
}

/// A validated block borrowed from the file image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef<'a> {
    /// Total block length in bytes
    pub len: u64,
    /// Document or tombstone
    pub kind: BlockKind,
    /// Key bytes
    pub key: &'a [u8],
    /// Value bytes (empty for tombstones)
    pub value: &'a [u8],
    /// File offset of the first value byte
    pub value_offset: u64,
}

impl<'a> BlockRef<'a> {
    /// Parses the block at `offset`, which must end at or before `limit`.
    ///
    /// Verifies length bounds, the kind byte and the checksum.
    pub fn parse(image: &'a [u8], offset: u64, limit: u64) -> StorageResult<Self> {
        let limit = limit.min(image.len() as u64);
        if offset + MIN_BLOCK_LEN as u64 > limit {
            return Err(StorageError::checkpoint_corruption(
                offset,
                "block header runs past the checkpoint",
            ));
        }

        let start = offset as usize;
        let block_len = read_u32(image, start) as u64;
        if block_len < MIN_BLOCK_LEN as u64 || offset + block_len > limit {
            return Err(StorageError::checkpoint_corruption(
                offset,
                format!("invalid block length {}", block_len),
            ));
        }

        let end = start + block_len as usize;
        let stored_checksum = read_u32(image, end - 4);
        if !verify_checksum(&image[start..end - 4], stored_checksum) {
            return Err(StorageError::checkpoint_corruption(
                offset,
                format!("block checksum mismatch: stored {:08x}", stored_checksum),
            ));
        }

        let kind = BlockKind::from_byte(image[start + 4]).ok_or_else(|| {
            StorageError::checkpoint_corruption(offset, "unknown block kind")
        })?;

        let key_len = read_u32(image, start + 5) as usize;
        let key_start = start + 9;
        let value_len_at = key_start + key_len;
        if value_len_at + 4 + 4 > end {
            return Err(StorageError::checkpoint_corruption(
                offset,
                "key length overruns block",
            ));
        }

        let value_len = read_u32(image, value_len_at) as usize;
        let value_start = value_len_at + 4;
        if value_start + value_len + 4 != end {
            return Err(StorageError::checkpoint_corruption(
                offset,
                "value length does not match block length",
            ));
        }

        if kind == BlockKind::Tombstone && value_len != 0 {
            return Err(StorageError::checkpoint_corruption(
                offset,
                "tombstone block carries a value",
            ));
        }

        Ok(Self {
            len: block_len,
            kind,
            key: &image[key_start..value_len_at],
            value: &image[value_start..value_start + value_len],
            value_offset: value_start as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_block_parses_back() {
        let op = BlockOp::put(b"guid-1".to_vec(), br#"{"name":"Ada"}"#.to_vec());
        let mut buf = vec![0xEE; 10];
        op.serialize_into(&mut buf).unwrap();
        assert_eq!(buf.len(), 10 + op.encoded_len());

        let block = BlockRef::parse(&buf, 10, buf.len() as u64).unwrap();
        assert_eq!(block.kind, BlockKind::Document);
        assert_eq!(block.key, b"guid-1");
        assert_eq!(block.value, br#"{"name":"Ada"}"#);
        assert_eq!(
            &buf[block.value_offset as usize..][..block.value.len()],
            block.value
        );
    }

    #[test]
    fn test_tombstone_block_has_empty_value() {
        let op = BlockOp::remove(b"gone".to_vec());
        let mut buf = Vec::new();
        op.serialize_into(&mut buf).unwrap();

        let block = BlockRef::parse(&buf, 0, buf.len() as u64).unwrap();
        assert_eq!(block.kind, BlockKind::Tombstone);
        assert!(block.value.is_empty());
    }

    #[test]
    fn test_flipped_byte_fails_checksum() {
        let op = BlockOp::put(b"k".to_vec(), b"value bytes".to_vec());
        let mut buf = Vec::new();
        op.serialize_into(&mut buf).unwrap();
        let mid = buf.len() / 2;
        buf[mid] ^= 0xFF;

        let err = BlockRef::parse(&buf, 0, buf.len() as u64).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_block_may_not_cross_limit() {
        let op = BlockOp::put(b"k".to_vec(), b"v".to_vec());
        let mut buf = Vec::new();
        op.serialize_into(&mut buf).unwrap();

        assert!(BlockRef::parse(&buf, 0, buf.len() as u64 - 1).is_err());
        assert!(BlockRef::parse(&buf, 3, buf.len() as u64).is_err());
    }
}
