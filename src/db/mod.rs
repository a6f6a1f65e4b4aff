//! Database handle
//!
//! A [`Database`] owns one open file: its in-memory image, the index for the
//! current checkpoint, and the overlay of changes staged since the last
//! commit. Reads see staged changes; [`Database::commit_changes`] appends them
//! as one checkpoint.
//!
//! # Lifecycle
//!
//! ```text
//! open ──► header validated ──► tail scanned ──► index built
//!   │
//!   ├─ get / iter            (overlay over index)
//!   ├─ put / remove          (staged in overlay)
//!   ├─ commit_changes        (append checkpoint, apply to index)
//!   ├─ open_at               (read-only view of an older checkpoint)
//!   └─ write_to              (compacted single-checkpoint copy)
//! ```

mod commit;
mod config;
mod database;
mod errors;
mod export;
mod iter;
mod overlay;
mod recovery;

pub use config::DbConfig;
pub use database::{Database, DbStats};
pub use errors::{DbError, DbResult};
pub use iter::Iter;
pub use recovery::Recovery;

/// How a file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open for writing, creating and initializing the file if missing or empty
    CreateAndWrite,
    /// Open an existing file for writing
    Write,
    /// Open an existing file; every mutation fails with `KEEL_READ_ONLY`
    ReadOnly,
}

impl OpenMode {
    /// Whether handles opened this way accept mutations
    pub fn is_writable(&self) -> bool {
        !matches!(self, OpenMode::ReadOnly)
    }
}

/// Conditions under which [`Database::put`] stages a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    /// Only if the key does not exist
    Insert,
    /// Only if the key already exists
    Update,
    /// Always
    Upsert,
}
