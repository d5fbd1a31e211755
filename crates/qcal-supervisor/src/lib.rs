//! Calibration supervisor.
//!
//! [`CalibrationSupervisor`] walks the dependency graph up to a target
//! node. For every node it populates default parameters, skips the node
//! when all its targets are already calibrated, backs up the fields it is
//! about to overwrite, runs the sweep, analyses each unit and records the
//! results and statuses in the [`CalibrationStore`](qcal_store::CalibrationStore).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qcal_adapter_sim::{PeakAnalyzer, SimulatedInstrument};
//! use qcal_store::MemoryStore;
//! use qcal_supervisor::{CalibrationSupervisor, SupervisorConfig};
//!
//! let config = SupervisorConfig::from_file("calibration.yaml")?;
//! let instrument = Arc::new(SimulatedInstrument::new());
//! let supervisor = CalibrationSupervisor::new(
//!     config,
//!     Arc::new(MemoryStore::new()),
//!     instrument.clone(),
//!     instrument,
//!     Arc::new(PeakAnalyzer::new()),
//! )?;
//!
//! let report = supervisor.calibrate_system().await?;
//! assert!(report.is_success());
//! ```

pub mod config;
pub mod error;
pub mod report;
pub mod supervisor;

pub use config::{NodeExtras, SupervisorConfig};
pub use error::{SupervisorError, SupervisorResult};
pub use report::{
    CalibrationReport, FieldInspection, NodeInspection, NodeOutcome, NodeReport, UnitFailure,
};
pub use supervisor::CalibrationSupervisor;
