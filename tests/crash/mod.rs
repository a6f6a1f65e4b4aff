//! Crash testing framework for keeldb
//!
//! Runs the `keeldb` binary with `KEELDB_CRASH_POINT` set, lets it abort,
//! then reopens the file in-process and checks what survived.

pub mod harness;

pub use harness::*;
