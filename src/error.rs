//! Error types for the radiora library.

use thiserror::Error;

/// The main error type for radiora operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Reply did not arrive in time.
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The session engine has stopped.
    #[error("session closed")]
    SessionClosed,

    /// No device with this output id is configured.
    #[error("unknown device: output {0}")]
    UnknownDevice(u32),
}

/// Status line parse errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A field that should be numeric is not.
    #[error("invalid {field} {value:?} in {line:?}")]
    InvalidField {
        field: &'static str,
        value: String,
        line: String,
    },

    /// The line ended before all required fields were seen.
    #[error("missing {field} in {line:?}")]
    MissingField { field: &'static str, line: String },
}

/// Result type alias for radiora operations.
pub type Result<T> = std::result::Result<T, Error>;
