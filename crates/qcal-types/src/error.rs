//! Error types for the shared types crate.

use thiserror::Error;

/// Errors raised while parsing shared types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TypesError {
    /// Component label is not a valid qubit or coupler identifier.
    #[error("Invalid component '{label}': {reason}")]
    InvalidComponent {
        /// The rejected label.
        label: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Unknown calibration status string.
    #[error("Invalid calibration status: {0}")]
    InvalidStatus(String),

    /// Qubit state outside of 0, 1, 2.
    #[error("Invalid qubit state: {0} (expected 0, 1 or 2)")]
    InvalidQubitState(u8),
}

/// Result type for shared type operations.
pub type TypesResult<T> = Result<T, TypesError>;
