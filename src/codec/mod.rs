//! Value codec
//!
//! Documents are structured values (`serde_json::Value`). The engine stores
//! them as opaque encoded bytes; this module is the only place that knows the
//! encoding. [`MutableDocument`] is the editable overlay handed out by
//! `Database::get_mutable` and re-encoded at commit.

mod mutable;

use serde_json::Value;
use thiserror::Error;

pub use mutable::MutableDocument;

/// Codec failures, reported at the call that tried to read the document
#[derive(Debug, Error)]
pub enum CodecError {
    /// Stored bytes are not a valid encoded value
    #[error("document decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// A mutable overlay was requested for a value that is not a dictionary
    #[error("document is not a dictionary")]
    NotADictionary,
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes a value to bytes.
pub fn encode(value: &Value) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Decodes bytes into a read-only value.
pub fn decode(bytes: &[u8]) -> CodecResult<Value> {
    Ok(serde_json::from_slice(bytes)?)
}
