//! keeldb CLI entry point
//!
//! Installs logging, then delegates to `cli::run`. Errors go to stderr and
//! the process exits non-zero.

use keeldb::cli;
use keeldb::observability::init_logging;

fn main() {
    init_logging("keeldb=warn");

    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
