//! Storage error types
//!
//! Error codes:
//! - KEEL_STORAGE_IO_ERROR (ERROR severity)
//! - KEEL_BLOCK_TOO_LARGE (ERROR severity)
//! - KEEL_HEADER_CORRUPTION (FATAL severity)
//! - KEEL_CHECKPOINT_CORRUPTION (FATAL severity)
//! - KEEL_NO_VALID_CHECKPOINT (FATAL severity)
//!
//! Damage at the tail of the file is not an error at all: the layout scan
//! rolls back to the last valid trailer and reports it through
//! [`crate::db::Recovery`]. Only corruption that leaves no safe way to read
//! the file surfaces here as FATAL.

use std::fmt;
use std::io;

/// Severity levels for keeldb errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, the handle stays usable
    Error,
    /// The file cannot be opened or trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure
    KeelStorageIoError,
    /// A key or value exceeds the block size limits
    KeelBlockTooLarge,
    /// Header missing, truncated or failing validation
    KeelHeaderCorruption,
    /// A trailer or block inside the committed chain failed validation
    KeelCheckpointCorruption,
    /// Bytes exist past the header but no trailer validates
    KeelNoValidCheckpoint,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::KeelStorageIoError => "KEEL_STORAGE_IO_ERROR",
            StorageErrorCode::KeelBlockTooLarge => "KEEL_BLOCK_TOO_LARGE",
            StorageErrorCode::KeelHeaderCorruption => "KEEL_HEADER_CORRUPTION",
            StorageErrorCode::KeelCheckpointCorruption => "KEEL_CHECKPOINT_CORRUPTION",
            StorageErrorCode::KeelNoValidCheckpoint => "KEEL_NO_VALID_CHECKPOINT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::KeelStorageIoError => Severity::Error,
            StorageErrorCode::KeelBlockTooLarge => Severity::Error,
            StorageErrorCode::KeelHeaderCorruption => Severity::Fatal,
            StorageErrorCode::KeelCheckpointCorruption => Severity::Fatal,
            StorageErrorCode::KeelNoValidCheckpoint => Severity::Fatal,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    /// Create a new storage I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::KeelStorageIoError,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a block-too-large error
    pub fn block_too_large(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::KeelBlockTooLarge,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a header corruption error (FATAL)
    pub fn header_corruption(reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::KeelHeaderCorruption,
            message: reason.into(),
            details: None,
            source: None,
        }
    }

    /// Create a checkpoint corruption error with byte offset context (FATAL)
    pub fn checkpoint_corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::KeelCheckpointCorruption,
            message: reason.into(),
            details: Some(format!("byte_offset: {}", offset)),
            source: None,
        }
    }

    /// Create a no-valid-checkpoint error (FATAL)
    pub fn no_valid_checkpoint(file_len: u64) -> Self {
        Self {
            code: StorageErrorCode::KeelNoValidCheckpoint,
            message: "no structurally valid checkpoint found after the header".to_string(),
            details: Some(format!("file_len: {}", file_len)),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns whether the file must be treated as unusable
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
