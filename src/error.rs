use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error type covering the different failure cases that can occur when the
/// tool reads, reconciles, or writes tabular data.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the workbook writer implementation.
    #[error("workbook write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the workbook reader implementation.
    #[error("workbook read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a column name is not present in the header row.
    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },

    /// Raised when a stored key cell cannot be cast to an integer key.
    #[error("key value '{value}' in row {row} is not an integer")]
    InvalidKey { row: usize, value: String },

    /// Raised when an incoming record does not carry the designated key column.
    #[error("record is missing key column '{column}'")]
    RecordWithoutKey { column: String },

    /// Raised when an incoming record's key value cannot be cast to an integer.
    #[error("record key value '{value}' is not an integer")]
    InvalidRecordKey { value: String },

    /// Raised when two incoming records carry the same key value.
    #[error("duplicate key {key} in incoming records")]
    DuplicateKey { key: i64 },

    /// Raised when an existing row's key has no matching incoming record.
    /// Aborting here is deliberate: silently dropping a stored row is worse
    /// than halting the run.
    #[error("no incoming record for existing key {key}")]
    MissingRecord { key: i64 },

    /// Raised when the requested conference has no built-in configuration.
    #[error("unknown conference '{0}'")]
    UnknownConference(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
