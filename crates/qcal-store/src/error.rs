//! Error handling for calibration stores.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing calibration state.
///
/// Every variant is fatal to a calibration run: the supervisor never
/// retries store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing medium cannot be reached.
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    /// SQLite database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A persisted value could not be decoded.
    #[error("Corrupt entry {key}: {message}")]
    CorruptEntry { key: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Unreachable("connection refused".to_string());
        assert_eq!(err.to_string(), "Store unreachable: connection refused");

        let err = StoreError::CorruptEntry {
            key: "status:q1".to_string(),
            message: "unknown status 'maybe'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Corrupt entry status:q1: unknown status 'maybe'"
        );
    }
}
