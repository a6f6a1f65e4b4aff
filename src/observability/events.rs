//! Observable events for keeldb
//!
//! Every log line the engine emits carries one of these as its `event`
//! field, so lifecycle transitions can be matched without parsing messages.

use std::fmt;

use tracing::Level;

/// Observable events in keeldb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Open & lifecycle
    /// Opening a database file
    OpenBegin,
    /// Database open, index built
    OpenComplete,
    /// Open failed (FATAL)
    OpenFailed,
    /// Tail damage detected and rolled back
    TailDamageRecovered,
    /// Historical view opened
    HistoricalViewOpened,

    // Commit
    /// Commit started
    CommitBegin,
    /// Checkpoint appended
    CommitComplete,
    /// Nothing staged; no checkpoint written
    CommitSkipped,
    /// Commit failed, overlay kept
    CommitFailed,
    /// Staged changes discarded
    ChangesReverted,

    // Export
    /// Export started
    ExportBegin,
    /// Compacted copy written
    ExportComplete,
    /// Export failed
    ExportFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::OpenBegin => "DB_OPEN_BEGIN",
            Event::OpenComplete => "DB_OPEN_COMPLETE",
            Event::OpenFailed => "DB_OPEN_FAILED",
            Event::TailDamageRecovered => "TAIL_DAMAGE_RECOVERED",
            Event::HistoricalViewOpened => "HISTORICAL_VIEW_OPENED",

            Event::CommitBegin => "COMMIT_BEGIN",
            Event::CommitComplete => "COMMIT_COMPLETE",
            Event::CommitSkipped => "COMMIT_SKIPPED",
            Event::CommitFailed => "COMMIT_FAILED",
            Event::ChangesReverted => "CHANGES_REVERTED",

            Event::ExportBegin => "EXPORT_BEGIN",
            Event::ExportComplete => "EXPORT_COMPLETE",
            Event::ExportFailed => "EXPORT_FAILED",
        }
    }

    /// Level the event is logged at
    pub fn level(&self) -> Level {
        match self {
            Event::OpenFailed | Event::CommitFailed | Event::ExportFailed => Level::ERROR,
            Event::TailDamageRecovered => Level::WARN,
            Event::OpenComplete
            | Event::CommitComplete
            | Event::ExportComplete
            | Event::HistoricalViewOpened => Level::INFO,
            Event::OpenBegin
            | Event::CommitBegin
            | Event::CommitSkipped
            | Event::ChangesReverted
            | Event::ExportBegin => Level::DEBUG,
        }
    }

    /// Returns true if this event means the file could not be used
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::OpenFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Event; 13] = [
        Event::OpenBegin,
        Event::OpenComplete,
        Event::OpenFailed,
        Event::TailDamageRecovered,
        Event::HistoricalViewOpened,
        Event::CommitBegin,
        Event::CommitComplete,
        Event::CommitSkipped,
        Event::CommitFailed,
        Event::ChangesReverted,
        Event::ExportBegin,
        Event::ExportComplete,
        Event::ExportFailed,
    ];

    #[test]
    fn test_event_names_are_upper_snake_case() {
        for event in ALL {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_failures_log_at_error() {
        assert_eq!(Event::CommitFailed.level(), Level::ERROR);
        assert_eq!(Event::TailDamageRecovered.level(), Level::WARN);
        assert_eq!(Event::CommitComplete.level(), Level::INFO);
    }

    #[test]
    fn test_only_open_failure_is_fatal() {
        let fatal: Vec<_> = ALL.iter().filter(|e| e.is_fatal()).collect();
        assert_eq!(fatal, vec![&Event::OpenFailed]);
    }
}
