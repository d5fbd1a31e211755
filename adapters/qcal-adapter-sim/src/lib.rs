//! Simulated instrument stack for the calibration orchestrator.
//!
//! [`SimulatedInstrument`] implements both `Compiler` and
//! `InstrumentExecutor` and synthesises deterministic acquisitions with a
//! peak on every channel. [`PeakAnalyzer`] recovers that peak and reports
//! it as the node's quantities of interest.
//!
//! Both support failure injection, which the integration tests use to
//! exercise the supervisor's abort and partial-failure paths.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qcal_adapter_sim::{PeakAnalyzer, SimulatedInstrument};
//! use qcal_sweep::SweepExecutor;
//!
//! let instrument = Arc::new(SimulatedInstrument::new());
//! let executor = SweepExecutor::new(instrument.clone(), instrument)
//!     .with_analyzer(Arc::new(PeakAnalyzer::new()));
//! ```

mod analyzer;
mod instrument;

pub use analyzer::PeakAnalyzer;
pub use instrument::SimulatedInstrument;

/// Axis enumerating repeated shots rather than a physical parameter.
const SHOT_AXIS: &str = "qubit_states";

/// Index of the axis a peak is searched along.
fn scan_axis(names: &[&str]) -> Option<usize> {
    names.iter().position(|n| *n != SHOT_AXIS)
}
