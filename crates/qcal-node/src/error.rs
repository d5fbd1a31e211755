//! Error types for calibration node construction.

use thiserror::Error;

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;

/// Errors raised while building a node or validating its samplespaces.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    /// No factory registered under this name.
    #[error("Unknown calibration node: {0}")]
    UnknownNode(String),

    /// A measured component does not sweep the same dimensions as the others.
    #[error(
        "Co-sweep mismatch on {component}: expected dimensions {expected:?}, found {found:?}"
    )]
    CoSweepMismatch {
        component: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A dimension has different lengths on different components.
    #[error(
        "Dimension '{dimension}' has {found} values on {component}, expected {expected}"
    )]
    DimensionMismatch {
        dimension: String,
        component: String,
        expected: usize,
        found: usize,
    },

    /// More than one external dimension was declared.
    #[error("Node {node} declares {count} external dimensions, at most one is supported")]
    MultiDimensionalExternal { node: String, count: usize },

    /// Any other invalid node configuration.
    #[error("Invalid node configuration: {0}")]
    Configuration(String),
}
