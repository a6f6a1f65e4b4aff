//! CLI argument definitions using clap
//!
//! Commands:
//! - keeldb create <db>
//! - keeldb put <db> <key> <json> [--mode insert|update|upsert]
//! - keeldb get <db> <key> [--at <checkpoint>]
//! - keeldb remove <db> <key>
//! - keeldb list <db> [--at <checkpoint>]
//! - keeldb info <db>
//! - keeldb history <db>
//! - keeldb export <db> <target>

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::db::PutMode;

/// keeldb - an append-only single-file document store
#[derive(Parser, Debug)]
#[command(name = "keeldb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new, empty database file
    Create {
        /// Database file
        db: PathBuf,
    },

    /// Store a JSON document and commit
    Put {
        /// Database file
        db: PathBuf,
        /// Document key
        key: String,
        /// Document as JSON text
        document: String,
        /// When the write applies
        #[arg(long, value_enum, default_value_t = ModeArg::Upsert)]
        mode: ModeArg,
    },

    /// Print one document
    Get {
        /// Database file
        db: PathBuf,
        /// Document key
        key: String,
        /// Read as of this checkpoint
        #[arg(long)]
        at: Option<u64>,
    },

    /// Remove a document and commit
    Remove {
        /// Database file
        db: PathBuf,
        /// Document key
        key: String,
    },

    /// Print every document in key order
    List {
        /// Database file
        db: PathBuf,
        /// Read as of this checkpoint
        #[arg(long)]
        at: Option<u64>,
    },

    /// Print checkpoint, size and damage information
    Info {
        /// Database file
        db: PathBuf,
    },

    /// Print checkpoint ids, newest first
    History {
        /// Database file
        db: PathBuf,
    },

    /// Write a compacted copy with a single checkpoint
    Export {
        /// Database file
        db: PathBuf,
        /// Output file
        target: PathBuf,
    },
}

/// `--mode` values for `put`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Insert,
    Update,
    Upsert,
}

impl From<ModeArg> for PutMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Insert => PutMode::Insert,
            ModeArg::Update => PutMode::Update,
            ModeArg::Upsert => PutMode::Upsert,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_defaults_to_upsert() {
        let cli = Cli::try_parse_from(["keeldb", "put", "db.keel", "k", "{}"]).unwrap();
        match cli.command {
            Command::Put { mode, key, .. } => {
                assert_eq!(mode, ModeArg::Upsert);
                assert_eq!(key, "k");
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_config_and_at() {
        let cli = Cli::try_parse_from([
            "keeldb", "get", "db.keel", "k", "--at", "8192", "--config", "c.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
        assert!(matches!(cli.command, Command::Get { at: Some(8192), .. }));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["keeldb", "put", "db", "k", "{}", "--mode", "merge"]).is_err());
    }
}
