//! Database error types
//!
//! Storage and codec failures keep their own codes; the handle adds the
//! errors that only make sense at the API surface.

use thiserror::Error;

use crate::codec::CodecError;
use crate::storage::{Severity, StorageError};

/// Errors returned by [`Database`](super::Database) operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Layout or I/O failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A document could not be decoded
    #[error("KEEL_CODEC_ERROR: {0}")]
    Codec(#[from] CodecError),

    /// Mutation attempted on a read-only handle or historical view
    #[error("KEEL_READ_ONLY: {0}")]
    ReadOnly(&'static str),

    /// `open_at` was given an id that is not on this handle's chain
    #[error("KEEL_UNKNOWN_CHECKPOINT: no checkpoint {0} in this database")]
    UnknownCheckpoint(u64),

    /// Invalid configuration
    #[error("KEEL_CONFIG_ERROR: {0}")]
    Config(String),

    /// An earlier failed commit left bytes the handle could not remove.
    /// Reopening the file discards them as tail damage.
    #[error("KEEL_COMMIT_POISONED: {location} may hold partial writes past checkpoint {checkpoint}; reopen the database")]
    Poisoned { location: String, checkpoint: u64 },
}

impl DbError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Storage(e) => e.code().code(),
            DbError::Codec(_) => "KEEL_CODEC_ERROR",
            DbError::ReadOnly(_) => "KEEL_READ_ONLY",
            DbError::UnknownCheckpoint(_) => "KEEL_UNKNOWN_CHECKPOINT",
            DbError::Config(_) => "KEEL_CONFIG_ERROR",
            DbError::Poisoned { .. } => "KEEL_COMMIT_POISONED",
        }
    }

    /// Severity; storage corruption and a poisoned handle are fatal
    pub fn severity(&self) -> Severity {
        match self {
            DbError::Storage(e) => e.severity(),
            DbError::Poisoned { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Returns true if the file, or this handle, cannot be written again
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
