//! Calibration dependency graph.
//!
//! Nodes are calibration experiments, edges are "must run before" relations.
//! The main entry point is
//! [`DependencyGraph::filtered_topological_order`], which turns a target
//! node into the list of nodes to execute.
//!
//! # Example
//!
//! ```
//! use qcal_graph::DependencyGraph;
//!
//! let graph = DependencyGraph::calibration_graph().unwrap();
//! let order = graph.filtered_topological_order("rabi_oscillations").unwrap();
//! assert_eq!(
//!     order,
//!     ["resonator_spectroscopy", "qubit_01_spectroscopy", "rabi_oscillations"]
//! );
//! ```

mod calibration;
mod error;
mod graph;

pub use calibration::{AUXILIARY_NODE, ENTRY_NODE, ENTRY_ONLY_NODE};
pub use error::{GraphError, GraphResult};
pub use graph::{DEFAULT_WEIGHT, DependencyGraph, NodeAttributes};
