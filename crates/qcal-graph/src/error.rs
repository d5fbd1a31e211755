//! Error handling for the dependency graph.

use thiserror::Error;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised while building or traversing the dependency graph.
///
/// All of them are configuration errors surfaced before any calibration runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Node name not present in the graph.
    #[error("Unknown calibration node: {0}")]
    UnknownNode(String),

    /// Node added twice.
    #[error("Calibration node already defined: {0}")]
    DuplicateNode(String),

    /// Adding the edge would close a cycle.
    #[error("Dependency cycle detected: {from} -> {to}")]
    CycleDetected { from: String, to: String },

    /// No path from the entry node to the target.
    #[error("Unreachable target: no path from '{entry}' to '{target}'")]
    UnreachableTarget { entry: String, target: String },

    /// Edge weight is negative or not a number.
    #[error("Invalid edge weight {weight} on {from} -> {to}")]
    InvalidWeight { from: String, to: String, weight: f64 },

    /// The graph has no entry node configured.
    #[error("No entry node configured")]
    MissingEntry,
}
