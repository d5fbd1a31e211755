//! qcal shared types
//!
//! Vocabulary shared by every crate of the calibration orchestrator:
//!
//! - [`Component`]: a qubit (`"q16"`) or a coupler (`"q22_q23"`)
//! - [`ParamValue`]: a stored calibration parameter, including the NaN
//!   sentinel written while a field is being recalibrated
//! - [`CalibrationStatus`]: per `(component, node)` calibration flag
//! - [`QubitState`]: readout state a node is calibrated against
//!
//! # Example
//!
//! ```rust
//! use qcal_types::{Component, ComponentKind};
//!
//! let coupler = Component::parse("q22_q23").unwrap();
//! assert_eq!(coupler.kind(), ComponentKind::Coupler);
//! assert_eq!(coupler.qubits(), vec![Component::qubit("q22"), Component::qubit("q23")]);
//! ```

pub mod component;
pub mod error;
pub mod status;
pub mod value;

pub use component::{Component, ComponentKind};
pub use error::{TypesError, TypesResult};
pub use status::{CalibrationStatus, QubitState};
pub use value::{NAN_SENTINEL, ParamValue};
