//! Error types for tickscan operations.

use thiserror::Error;

/// Result type alias using [`TickscanError`].
pub type Result<T> = std::result::Result<T, TickscanError>;

/// Error types for decoding, exporting and indexing record vectors.
#[derive(Debug, Error)]
pub enum TickscanError {
    // ==================== Decode Errors ====================
    /// The input path does not resolve to a file.
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// A filter or record type does not fit the file schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The columnar structure or a decoded value is invalid.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// I/O failure other than a missing file.
    #[error("I/O error: {0}")]
    Io(String),

    /// Filter text could not be parsed.
    #[error("Parse error at line {line}, column {col}: {message}")]
    ParseError {
        line: usize,
        col: usize,
        message: String,
    },

    // ==================== Export Errors ====================
    /// Index outside `[0, len)` of an exported vector.
    #[error("Index out of range: index {index}, length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Invalid argument passed across the C ABI (null or non UTF-8 pointer).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Records could not be encoded into a columnar batch.
    #[error("Encode error: {0}")]
    EncodeError(String),

    // ==================== Runtime Errors ====================
    /// Decode exceeded the caller-supplied timeout.
    #[error("Query timeout: execution exceeded {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// Worker thread panicked during decoding.
    #[error("Worker thread panicked: {0}")]
    ThreadPanic(String),
}

/// Stable numeric codes reported across the C ABI.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No error recorded.
    Ok = 0,
    NotFound = 1,
    SchemaMismatch = 2,
    CorruptData = 3,
    IndexOutOfRange = 4,
    InvalidArgument = 5,
    Io = 6,
    Parse = 7,
    Timeout = 8,
    /// Panics and other failures with no dedicated code.
    Internal = 9,
}

impl TickscanError {
    /// Returns the ABI error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            TickscanError::NotFound { .. } => ErrorCode::NotFound,
            TickscanError::SchemaMismatch(_) => ErrorCode::SchemaMismatch,
            TickscanError::CorruptData(_) => ErrorCode::CorruptData,
            TickscanError::Io(_) => ErrorCode::Io,
            TickscanError::ParseError { .. } => ErrorCode::Parse,
            TickscanError::IndexOutOfRange { .. } => ErrorCode::IndexOutOfRange,
            TickscanError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            TickscanError::QueryTimeout { .. } => ErrorCode::Timeout,
            TickscanError::EncodeError(_) | TickscanError::ThreadPanic(_) => ErrorCode::Internal,
        }
    }

    /// Returns true for errors caused by the data rather than the caller.
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            TickscanError::SchemaMismatch(_) | TickscanError::CorruptData(_)
        )
    }
}

impl From<std::io::Error> for TickscanError {
    fn from(err: std::io::Error) -> Self {
        TickscanError::Io(err.to_string())
    }
}

impl From<parquet::errors::ParquetError> for TickscanError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        TickscanError::CorruptData(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for TickscanError {
    fn from(err: arrow::error::ArrowError) -> Self {
        TickscanError::CorruptData(err.to_string())
    }
}
