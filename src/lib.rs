//! keeldb - an embedded, append-only, single-file document store
//!
//! Documents are committed in checkpoints. Every checkpoint stays readable
//! through [`Database::open_at`], a damaged file tail rolls back to the last
//! valid checkpoint, and [`Database::write_to`] writes a compacted copy.
//!
//! ```no_run
//! use keeldb::{Database, OpenMode, PutMode};
//! use serde_json::json;
//!
//! let mut db = Database::open("people.keel", OpenMode::CreateAndWrite)?;
//! db.put_document(b"eleven", &json!({"name": "Eleven"}), PutMode::Insert)?;
//! let checkpoint = db.commit_changes()?;
//! assert_eq!(db.checkpoint(), checkpoint);
//! # Ok::<(), keeldb::DbError>(())
//! ```

pub mod cli;
pub mod codec;
pub mod crash_point;
pub mod db;
pub mod index;
pub mod observability;
pub mod storage;

pub use codec::{CodecError, MutableDocument};
pub use db::{Database, DbConfig, DbError, DbResult, DbStats, Iter, OpenMode, PutMode, Recovery};
pub use storage::{ByteStore, FileStore, MemoryStore, Severity, StorageError};
