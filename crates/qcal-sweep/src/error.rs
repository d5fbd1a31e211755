//! Error types for sweep execution and reshaping.

use std::time::Duration;

use qcal_node::NodeError;
use thiserror::Error;

/// Result type for collaborator calls.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Result type for reshaping.
pub type ReshapeResult<T> = Result<T, ReshapeError>;

/// Result type for sweep execution.
pub type SweepResult<T> = Result<T, SweepError>;

/// Failure reported by a compiler, instrument or analyzer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    /// The operation ran and failed.
    #[error("{0}")]
    Failed(String),

    /// The collaborator could not be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while reshaping acquisitions into a dataset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReshapeError {
    /// A channel holds a different number of values than the samplespace implies.
    #[error("Channel for {component} has {found} values, expected {expected}")]
    LengthMismatch {
        component: String,
        expected: usize,
        found: usize,
    },

    /// An acquisition channel is missing.
    #[error("Acquisition channel {0} is missing")]
    MissingChannel(usize),

    /// Number of acquisition blocks does not match the external indices.
    #[error("Got {blocks} acquisition blocks for {indices} external indices")]
    BlockMismatch { blocks: usize, indices: usize },

    /// Array construction failed.
    #[error("Shape error: {0}")]
    Shape(String),

    /// The node samplespace is invalid.
    #[error(transparent)]
    Node(#[from] NodeError),
}

impl From<ndarray::ShapeError> for ReshapeError {
    fn from(e: ndarray::ShapeError) -> Self {
        ReshapeError::Shape(e.to_string())
    }
}

/// Errors raised while executing a node's sweep.
///
/// Any of these aborts the node; partial acquisitions are discarded.
#[derive(Error, Debug)]
pub enum SweepError {
    /// Schedule compilation failed.
    #[error("Compilation failed for {node}: {source}")]
    Compile {
        node: String,
        source: CollaboratorError,
    },

    /// The instrument reported a measurement failure.
    #[error("Measurement failed for {node}: {source}")]
    Measurement {
        node: String,
        source: CollaboratorError,
    },

    /// The measurement did not finish in time.
    #[error("Measurement for {node} timed out after {timeout:?}")]
    MeasurementTimeout { node: String, timeout: Duration },

    /// The side-effecting operation before an external combination failed.
    #[error("Pre-measurement operation {index} failed for {node}: {source}")]
    PreMeasurement {
        node: String,
        index: usize,
        source: CollaboratorError,
    },

    /// Acquisitions could not be reshaped.
    #[error("Reshape failed: {0}")]
    Reshape(#[from] ReshapeError),

    /// The node is misconfigured.
    #[error("Invalid node: {0}")]
    Node(#[from] NodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SweepError::MeasurementTimeout {
            node: "t1".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "Measurement for t1 timed out after 5s");

        let err = SweepError::from(ReshapeError::LengthMismatch {
            component: "q1".to_string(),
            expected: 4,
            found: 3,
        });
        assert_eq!(
            err.to_string(),
            "Reshape failed: Channel for q1 has 3 values, expected 4"
        );
    }
}
