//! Crash point injection for durability testing
//!
//! Setting `KEELDB_CRASH_POINT=<name>` makes the process abort at the named
//! point: no cleanup, no unwinding, no flushing. Crash tests run the
//! `keeldb` binary with the variable set and then reopen the file.
//!
//! ```ignore
//! use keeldb::crash_point::{maybe_crash, points};
//!
//! maybe_crash(points::COMMIT_AFTER_BLOCKS);
//! ```

use std::sync::OnceLock;

/// Environment variable naming the active crash point
pub const CRASH_POINT_ENV_VAR: &str = "KEELDB_CRASH_POINT";

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV_VAR).ok())
        .as_deref()
}

/// Returns true if `KEELDB_CRASH_POINT` equals `name`.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Aborts the process if the named crash point is enabled.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    /// Before any byte of a checkpoint is appended
    pub const COMMIT_BEFORE_BLOCKS: &str = "commit_before_blocks";
    /// Blocks appended and synced, trailer not yet written
    pub const COMMIT_AFTER_BLOCKS: &str = "commit_after_blocks";
    /// Trailer appended and synced, in-memory state not yet updated
    pub const COMMIT_AFTER_TRAILER: &str = "commit_after_trailer";
    /// Export image built, target file not yet written
    pub const EXPORT_BEFORE_WRITE: &str = "export_before_write";

    /// Get all crash point names
    pub fn all() -> &'static [&'static str] {
        &[
            COMMIT_BEFORE_BLOCKS,
            COMMIT_AFTER_BLOCKS,
            COMMIT_AFTER_TRAILER,
            EXPORT_BEFORE_WRITE,
        ]
    }
}
