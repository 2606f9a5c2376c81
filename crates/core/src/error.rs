//! Error types for recstore
//!
//! Every failure is surfaced to the immediate caller. Nothing is retried
//! internally; recovering from a mis-declared format is an explicit,
//! caller-invoked path (see `Table::recovered` in `recstore-storage`).
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for recstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Hint attached to format interpretation failures.
pub const RECOVERY_HINT: &str =
    "this may be caused by a wrong data format in the header; try reading through `Table::recovered()`";

/// Error types for recstore
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inconsistent schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// Table data or header file is missing
    #[error("Table '{name}' does not exist")]
    TableNotFound {
        /// Name of the table that was requested
        name: String,
    },

    /// Database directory is missing
    #[error("Database not found at {path}")]
    DatabaseNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// Values do not fit the schema at append time
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Stored bytes end in the middle of a record
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// The declared format cannot describe the stored bytes or the requested target
    #[error("Format interpretation error: {reason}\n{hint}")]
    FormatInterpretation {
        /// What went wrong
        reason: String,
        /// How the caller may retry
        hint: &'static str,
    },

    /// Unknown column key, or a bare string given where a key list was expected
    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    /// Unknown target representation name
    #[error("Unsupported target: {0}")]
    UnsupportedTarget(String),

    /// Operation not allowed in the current table state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// I/O error (file operations, mapping)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Header (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Archive operation failed
    #[error("Archive error: {0}")]
    Archive(String),
}

impl Error {
    /// Create a schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create an encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a decoding error
    pub fn decoding(msg: impl Into<String>) -> Self {
        Self::Decoding(msg.into())
    }

    /// Create a format interpretation error carrying the recovery hint
    pub fn format_interpretation(reason: impl Into<String>) -> Self {
        Self::FormatInterpretation {
            reason: reason.into(),
            hint: RECOVERY_HINT,
        }
    }

    /// Create an invalid column error
    pub fn invalid_column(msg: impl Into<String>) -> Self {
        Self::InvalidColumn(msg.into())
    }

    /// Create an archive error
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// True when the failure suggests retrying through recovery mode
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, Error::FormatInterpretation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_schema() {
        let err = Error::schema("duplicate key 'time'");
        let msg = err.to_string();
        assert!(msg.contains("Schema error"));
        assert!(msg.contains("time"));
    }

    #[test]
    fn test_error_display_table_not_found() {
        let err = Error::TableNotFound {
            name: "weather".to_string(),
        };
        assert_eq!(err.to_string(), "Table 'weather' does not exist");
    }

    #[test]
    fn test_format_interpretation_carries_hint() {
        let err = Error::format_interpretation("330 bytes is not a multiple of 26");
        assert!(err.is_format_mismatch());
        let msg = err.to_string();
        assert!(msg.contains("330 bytes"));
        assert!(msg.contains("recovered"));
    }

    #[test]
    fn test_other_errors_are_not_format_mismatch() {
        assert!(!Error::decoding("truncated").is_format_mismatch());
        assert!(!Error::UnsupportedTarget("xml".into()).is_format_mismatch());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }
}
