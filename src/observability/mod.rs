//! Observability for keeldb
//!
//! Structured logging through `tracing`. Each log line carries a typed
//! [`Event`] name plus fields such as `checkpoint` and `path`.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. The library never installs a subscriber; binaries call
//!    [`init_logging`]

mod events;

pub use events::Event;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter for the binary
pub const LOG_ENV_VAR: &str = "KEELDB_LOG";

/// Logs `$event` at the event's own level with the given tracing fields.
///
/// ```ignore
/// log_event!(Event::CommitComplete, checkpoint, blocks = ops.len(), "checkpoint appended");
/// ```
macro_rules! log_event {
    ($event:expr, $($fields:tt)*) => {{
        let event: $crate::observability::Event = $event;
        let level = event.level();
        if level == tracing::Level::ERROR {
            tracing::error!(event = event.as_str(), $($fields)*)
        } else if level == tracing::Level::WARN {
            tracing::warn!(event = event.as_str(), $($fields)*)
        } else if level == tracing::Level::INFO {
            tracing::info!(event = event.as_str(), $($fields)*)
        } else {
            tracing::debug!(event = event.as_str(), $($fields)*)
        }
    }};
}

pub(crate) use log_event;

/// Installs a stderr subscriber, JSON formatted, filtered by `KEELDB_LOG`
/// (falling back to `default_filter`). Calling it twice is harmless.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_without_subscriber_is_noop() {
        let checkpoint = 8192u64;
        log_event!(Event::CommitComplete, checkpoint, "checkpoint appended");
        log_event!(Event::TailDamageRecovered, discarded = 12u64, "tail rolled back");
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging("keeldb=warn");
        init_logging("keeldb=debug");
    }
}
