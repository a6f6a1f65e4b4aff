//! Checkpoint index for keeldb
//!
//! The index is derived, in-memory-only state rebuilt from the trailer chain
//! on open.
//!
//! # Design Principles
//!
//! - Derived state: the file is the source of truth
//! - Deterministic: BTreeMap iteration gives byte-lexicographic key order
//! - Bounded: a historical view builds only up to its checkpoint

mod checkpoint;

pub use checkpoint::{CheckpointIndex, IndexEntry};
