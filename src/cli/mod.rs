//! CLI module for keeldb
//!
//! Provides command-line interface for:
//! - create: Initialize an empty database file
//! - put / remove: Stage one change and commit it
//! - get / list: Read, optionally at an older checkpoint
//! - info / history: Inspect checkpoints and tail damage
//! - export: Write a compacted copy

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, ModeArg};
pub use commands::{create, export, get, history, info, list, put, remove, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_response;
