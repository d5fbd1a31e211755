//! Error types for the calibration supervisor.

use qcal_graph::GraphError;
use qcal_node::NodeError;
use qcal_store::StoreError;
use qcal_sweep::SweepError;
use qcal_types::Component;
use thiserror::Error;

/// Result type for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

fn join(components: &[Component]) -> String {
    components
        .iter()
        .map(Component::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that end a calibration run.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// Invalid run configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Graph lookup or traversal failed.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// A node could not be built.
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    /// The calibration store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A node's sweep failed before analysis.
    #[error(
        "Node {node} aborted on [{}] (backups available: {backup_available}): {source}",
        join(.components)
    )]
    NodeAborted {
        node: String,
        components: Vec<Component>,
        backup_available: bool,
        source: SweepError,
    },

    /// Analysis left some components uncalibrated.
    #[error(
        "Node {node} did not calibrate [{}] (backups available: {backup_available})",
        join(.failed)
    )]
    NodeIncomplete {
        node: String,
        failed: Vec<Component>,
        backup_available: bool,
    },
}
