//! CLI-specific error types

use std::fmt;
use std::io;

use crate::db::DbError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Argument could not be used (bad JSON, unknown key)
    InvalidInput,
    /// Error reported by the database, carrying its own code
    Database(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "KEEL_CLI_CONFIG_ERROR",
            Self::IoError => "KEEL_CLI_IO_ERROR",
            Self::InvalidInput => "KEEL_CLI_INVALID_INPUT",
            Self::Database(code) => *code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Invalid argument
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<DbError> for CliError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Config(msg) => Self::config_error(msg),
            other => Self::new(CliErrorCode::Database(other.code()), other.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_errors_keep_their_code() {
        let err = CliError::from(DbError::UnknownCheckpoint(3));
        assert_eq!(err.code_str(), "KEEL_UNKNOWN_CHECKPOINT");

        let err = CliError::from(DbError::Config("bad page_size".into()));
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
        assert_eq!(err.message(), "bad page_size");
    }

    #[test]
    fn test_display() {
        let err = CliError::invalid_input("document is not valid JSON");
        assert_eq!(
            err.to_string(),
            "KEEL_CLI_INVALID_INPUT: document is not valid JSON"
        );
    }
}
