//! Checkpoint index
//!
//! Maps every live key to the block that holds its current value, as of one
//! checkpoint. Built by replaying the trailer chain oldest first; a commit
//! applies its new checkpoint with the same routine, so a rebuild and an
//! incremental update always agree.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::{Bound, Range};

use crate::storage::layout::{chain, checkpoint_blocks};
use crate::storage::{BlockKind, StorageResult, Trailer};

/// Where a key's current document lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// File offset of the first value byte
    pub value_offset: u64,
    /// Value length in bytes
    pub value_len: u64,
    /// Id of the checkpoint that wrote this document
    pub checkpoint: u64,
}

impl IndexEntry {
    /// Byte range of the value within the file image
    pub fn value_range(&self) -> Range<usize> {
        let start = self.value_offset as usize;
        start..start + self.value_len as usize
    }
}

/// In-memory key → document mapping for one checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointIndex {
    entries: BTreeMap<Vec<u8>, IndexEntry>,
    checkpoint: u64,
}

impl CheckpointIndex {
    /// Creates an empty index (checkpoint 0)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index as of the checkpoint ending at `upto` (0 = empty).
    ///
    /// Anything in `image` past `upto` is ignored.
    pub fn build(image: &[u8], page_size: u32, upto: u64) -> StorageResult<Self> {
        let mut index = Self::new();
        let mut trailers = chain(image, page_size, upto)?;
        trailers.reverse();
        for trailer in &trailers {
            index.apply(image, trailer)?;
        }
        Ok(index)
    }

    /// Applies one checkpoint's blocks on top of the current state.
    ///
    /// Later blocks shadow earlier ones for the same key; tombstones drop it.
    pub fn apply(&mut self, image: &[u8], trailer: &Trailer) -> StorageResult<()> {
        let checkpoint = trailer.checkpoint_size;
        for block in checkpoint_blocks(image, trailer)? {
            match block.kind {
                BlockKind::Document => {
                    self.entries.insert(
                        block.key.to_vec(),
                        IndexEntry {
                            value_offset: block.value_offset,
                            value_len: block.value.len() as u64,
                            checkpoint,
                        },
                    );
                }
                BlockKind::Tombstone => {
                    self.entries.remove(block.key);
                }
            }
        }
        self.checkpoint = checkpoint;
        Ok(())
    }

    /// Checkpoint this index reflects
    pub fn checkpoint(&self) -> u64 {
        self.checkpoint
    }

    /// Looks up a key
    pub fn get(&self, key: &[u8]) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Whether a key is live
    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key is live
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live keys in ascending byte order
    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, IndexEntry> {
        self.entries.iter()
    }

    /// Live keys at or after `start`, ascending
    pub fn range_from<'a>(
        &'a self,
        start: &[u8],
    ) -> btree_map::Range<'a, Vec<u8>, IndexEntry> {
        self.entries
            .range::<[u8], _>((Bound::Included(start), Bound::Unbounded))
    }
}
