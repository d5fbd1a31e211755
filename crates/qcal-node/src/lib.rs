//! Calibration nodes.
//!
//! A calibration node describes one experiment: which components it
//! measures, which parameters it sweeps (inside the compiled schedule or
//! through external pre-measurement operations), which fields its analysis
//! produces, and how the acquisition channels are laid out.
//!
//! # Example
//!
//! ```
//! use qcal_node::{NodeContext, NodeRegistry};
//! use qcal_types::Component;
//!
//! let registry = NodeRegistry::with_builtin_nodes();
//! let ctx = NodeContext::new(Component::parse_all(["q1", "q2"]).unwrap(), vec![]);
//! let node = registry.create("t1", &ctx).unwrap();
//!
//! assert_eq!(node.descriptor().redis_fields, ["t1_time"]);
//! assert!(node.descriptor().backup_enabled);
//! ```

pub mod builtin;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod samplespace;

pub use builtin::{BuiltinNode, builtin_node_names};
pub use descriptor::{
    AnalysisUnit, CalibrationNode, CalibrationPoints, DefaultParameter, MeasurementKind,
    NodeContext, NodeDescriptor, ParameterSnapshot, ReadoutLayout,
};
pub use error::{NodeError, NodeResult};
pub use registry::NodeRegistry;
pub use samplespace::{AssignedValue, Axis, SampleSpace, SweepDimension, SweepShape};
