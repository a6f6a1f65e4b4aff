//! Mutation overlay
//!
//! Changes staged since the last commit, keyed like the index. A commit turns
//! the overlay into block operations in key order and then clears it.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::codec::MutableDocument;
use crate::storage::BlockOp;

/// One staged change
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pending {
    /// Tombstone for a committed key
    Removed,
    /// Encoded bytes written by `put`
    Value(Vec<u8>),
    /// Editable document; written only if it was changed
    Mutable(MutableDocument),
}

impl Pending {
    /// Whether committing this entry writes a block
    fn is_write(&self) -> bool {
        match self {
            Pending::Mutable(doc) => doc.is_changed(),
            _ => true,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Overlay {
    entries: BTreeMap<Vec<u8>, Pending>,
}

impl Overlay {
    pub fn get(&self, key: &[u8]) -> Option<&Pending> {
        self.entries.get(key)
    }

    pub fn mutable(&mut self, key: &[u8]) -> Option<&mut MutableDocument> {
        match self.entries.get_mut(key) {
            Some(Pending::Mutable(doc)) => Some(doc),
            _ => None,
        }
    }

    pub fn stage(&mut self, key: Vec<u8>, pending: Pending) {
        self.entries.insert(key, pending);
    }

    pub fn unstage(&mut self, key: &[u8]) -> Option<Pending> {
        self.entries.remove(key)
    }

    /// Whether anything would be written by a commit
    pub fn has_writes(&self) -> bool {
        self.entries.values().any(Pending::is_write)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Vec<u8>, Pending> {
        self.entries.iter()
    }

    pub fn range_from<'a>(&'a self, start: &[u8]) -> btree_map::Range<'a, Vec<u8>, Pending> {
        self.entries
            .range::<[u8], _>((Bound::Included(start), Bound::Unbounded))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Block operations for every staged write, in key order. Unchanged
    /// mutable documents are skipped.
    pub fn staged_ops(&self) -> Vec<BlockOp> {
        self.entries
            .iter()
            .filter_map(|(key, pending)| match pending {
                Pending::Removed => Some(BlockOp::remove(key.clone())),
                Pending::Value(bytes) => Some(BlockOp::put(key.clone(), bytes.clone())),
                Pending::Mutable(doc) if doc.is_changed() => {
                    Some(BlockOp::put(key.clone(), doc.encode()))
                }
                Pending::Mutable(_) => None,
            })
            .collect()
    }
}
