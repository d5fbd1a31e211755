//! Interfaces to the instrument stack and the analysis routines.
//!
//! The orchestrator never talks to hardware directly. It hands a
//! [`CompileRequest`] to a [`Compiler`], runs the resulting
//! [`CompiledProgram`] on an [`InstrumentExecutor`] and passes the reshaped
//! [`Dataset`] to an [`Analyzer`].
//!
//! | Trait | Method | Returns |
//! |-------|--------|---------|
//! | `Compiler` | `compile()` | `CompiledProgram` |
//! | `InstrumentExecutor` | `pre_measurement_operation()` | `()` |
//! | `InstrumentExecutor` | `measure()` | `RawAcquisition` |
//! | `InstrumentExecutor` | `estimated_duration()` | `Option<Duration>` |
//! | `Analyzer` | `analyze()` | `Qoi` |

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use num_complex::Complex64;
use qcal_node::{AnalysisUnit, AssignedValue, CalibrationPoints, NodeDescriptor, ReadoutLayout, SampleSpace};
use qcal_types::{Component, ParamValue, QubitState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dataset::Dataset;
use crate::error::CollaboratorResult;

/// Values of every external parameter at one combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalAssignment {
    /// Position along the external dimension.
    pub index: usize,
    pub values: Vec<AssignedValue>,
}

/// Everything a compiler needs to build a node's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub node: String,
    /// Measured components, in acquisition channel order.
    pub components: Vec<Component>,
    pub qubit_state: QubitState,
    pub schedule_samplespace: SampleSpace,
    /// Baked-in external values for parameterized sweeps.
    pub external: Option<ExternalAssignment>,
    pub calibration_points: CalibrationPoints,
    pub readout_layout: ReadoutLayout,
}

impl CompileRequest {
    /// Build a request from a node descriptor.
    pub fn from_descriptor(descriptor: &NodeDescriptor, external: Option<ExternalAssignment>) -> Self {
        Self {
            node: descriptor.name.clone(),
            components: descriptor.components.clone(),
            qubit_state: descriptor.qubit_state,
            schedule_samplespace: descriptor.schedule_samplespace.clone(),
            external,
            calibration_points: descriptor.calibration_points,
            readout_layout: descriptor.readout_layout,
        }
    }
}

/// A compiled schedule ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub id: Uuid,
    pub request: CompileRequest,
    /// Instrument-specific payload.
    pub payload: serde_json::Value,
}

impl CompiledProgram {
    /// Wrap a payload with a fresh identifier.
    pub fn new(request: CompileRequest, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            payload,
        }
    }
}

/// Complex samples per acquisition channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAcquisition {
    channels: BTreeMap<usize, Vec<Complex64>>,
}

impl RawAcquisition {
    /// Create an empty acquisition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the samples of a channel.
    pub fn insert(&mut self, channel: usize, samples: Vec<Complex64>) {
        self.channels.insert(channel, samples);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_channel(mut self, channel: usize, samples: Vec<Complex64>) -> Self {
        self.insert(channel, samples);
        self
    }

    /// Samples of a channel.
    pub fn channel(&self, channel: usize) -> Option<&[Complex64]> {
        self.channels.get(&channel).map(Vec::as_slice)
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check if there are no channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Quantities of interest produced by analysis, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Qoi {
    values: BTreeMap<String, ParamValue>,
}

impl Qoi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&ParamValue> {
        self.values.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Declared fields the analysis did not produce.
    pub fn missing_fields<'a>(&self, declared: &'a [String]) -> Vec<&'a str> {
        declared
            .iter()
            .filter(|f| !self.values.contains_key(f.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// What the analyzer is asked to extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub node: String,
    pub unit: AnalysisUnit,
    pub redis_fields: Vec<String>,
    pub qubit_state: QubitState,
    /// Set when analysing a single external combination.
    pub iteration: Option<usize>,
}

impl AnalysisContext {
    /// Context for one analysis unit of a node.
    pub fn new(descriptor: &NodeDescriptor, unit: AnalysisUnit) -> Self {
        Self {
            node: descriptor.name.clone(),
            unit,
            redis_fields: descriptor.redis_fields.clone(),
            qubit_state: descriptor.qubit_state,
            iteration: None,
        }
    }
}

/// Turns a node's samplespace into an executable schedule.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(&self, request: &CompileRequest) -> CollaboratorResult<CompiledProgram>;
}

/// Runs compiled schedules on the instrument.
#[async_trait]
pub trait InstrumentExecutor: Send + Sync {
    /// Apply the side effect needed before an external combination,
    /// e.g. setting a DC current source.
    async fn pre_measurement_operation(
        &self,
        assignment: &ExternalAssignment,
    ) -> CollaboratorResult<()>;

    /// Execute a program and return the raw acquisitions.
    async fn measure(&self, program: &CompiledProgram) -> CollaboratorResult<RawAcquisition>;

    /// Expected wall time of a program, used for progress reporting.
    fn estimated_duration(&self, _program: &CompiledProgram) -> Option<Duration> {
        None
    }
}

/// Extracts quantities of interest from a dataset.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, dataset: &Dataset, ctx: &AnalysisContext) -> CollaboratorResult<Qoi>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields() {
        let declared = vec!["t1_time".to_string(), "t1_error".to_string()];
        let qoi = Qoi::new().with("t1_time", 4.5e-5);
        assert_eq!(qoi.missing_fields(&declared), vec!["t1_error"]);
        assert_eq!(qoi.get("t1_time"), Some(&ParamValue::Float(4.5e-5)));
    }

    #[test]
    fn test_compile_request_from_descriptor() {
        let mut descriptor = NodeDescriptor::new("t1", vec![Component::qubit("q1")]);
        descriptor.calibration_points = CalibrationPoints::TwoState;
        let request = CompileRequest::from_descriptor(&descriptor, None);
        assert_eq!(request.node, "t1");
        assert_eq!(request.calibration_points, CalibrationPoints::TwoState);
        assert!(request.external.is_none());
    }

    #[test]
    fn test_compiled_program_json() {
        let descriptor = NodeDescriptor::new("t1", vec![Component::qubit("q1")]);
        let request = CompileRequest::from_descriptor(&descriptor, None);
        let program = CompiledProgram::new(request, serde_json::json!({ "sequencer": 3 }));

        let json = serde_json::to_value(&program).unwrap();
        assert_eq!(json["id"], program.id.to_string());
        let back: CompiledProgram = serde_json::from_value(json).unwrap();
        assert_eq!(back, program);
    }
}
