//! Sweep execution and dataset reshaping.
//!
//! [`SweepExecutor`] turns a calibration node into compile and measure
//! calls against the [`Compiler`] and [`InstrumentExecutor`] collaborators,
//! and [`DatasetReshaper`] turns the flat acquisitions into a labelled
//! [`Dataset`] that an [`Analyzer`] can consume.

pub mod collaborator;
pub mod dataset;
pub mod error;
pub mod executor;
pub mod reshape;

pub use collaborator::{
    AnalysisContext, Analyzer, CompileRequest, CompiledProgram, Compiler, ExternalAssignment,
    InstrumentExecutor, Qoi, RawAcquisition,
};
pub use dataset::{ArrayAttributes, Coordinate, DataArray, Dataset};
pub use error::{
    CollaboratorError, CollaboratorResult, ReshapeError, ReshapeResult, SweepError, SweepResult,
};
pub use executor::{
    DEFAULT_MEASUREMENT_TIMEOUT, DEFAULT_PROGRESS_INTERVAL, ExecutorConfig, IterationReport,
    LogProgress, ProgressSink, SweepExecutor, SweepOutcome,
};
pub use reshape::{DatasetReshaper, channel_to_component, reshuffle_state_discrimination};
