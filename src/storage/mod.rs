//! On-disk layout for keeldb
//!
//! A database is one append-only file: a header page, then a sequence of
//! checkpoints. Each checkpoint is a run of data blocks (one per changed key)
//! closed by a page-aligned trailer that points back at the previous trailer.
//!
//! # Design Principles
//!
//! - Append-only (committed bytes are never rewritten)
//! - Checksums on the header, every block and every trailer
//! - The trailer is the unit of atomicity: blocks are durable before it
//! - Header corruption is fatal; tail corruption rolls back to the last
//!   valid trailer

mod block;
mod checksum;
mod errors;
mod header;
pub mod io;
pub mod layout;
mod trailer;

pub use block::{BlockKind, BlockOp, BlockRef, MIN_BLOCK_LEN};
pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use header::{is_valid_page_size, FileHeader, DEFAULT_PAGE_SIZE, HEADER_MAGIC};
pub use io::{ByteStore, FileStore, MemoryStore};
pub use layout::{Layout, PendingCheckpoint, TailDamage};
pub use trailer::{Trailer, TRAILER_LEN};
