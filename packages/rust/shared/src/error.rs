//! Error types for oligocalc.
//!
//! Library crates use [`OligoCalcError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::ThermoField;

/// Top-level error type for all oligocalc operations.
#[derive(Debug, thiserror::Error)]
pub enum OligoCalcError {
    /// Network failure or non-2xx status from the melt calculator.
    #[error("remote service error: {0}")]
    RemoteService(String),

    /// An expected result element is absent from the response page.
    #[error(
        "expected field `{}` not found in response; the remote output format may have \
         changed or the service returned an error page",
        .field.element_id()
    )]
    Extraction { field: ThermoField },

    /// A result element is present but its text is not a number.
    #[error("could not parse {} value {text:?} as a number", .field.label())]
    Parse { field: ThermoField, text: String },

    /// An input line that does not yield a sequence.
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid argument (empty sequence, missing header, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OligoCalcError>;

impl OligoCalcError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a malformed-row error for a 1-based input line.
    pub fn malformed_row(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
