//! Calibration node descriptors.

use std::collections::BTreeMap;

use qcal_types::{Component, ParamValue, QubitState};
use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};
use crate::samplespace::{SampleSpace, SweepShape};

/// How the sweep executor drives a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasurementKind {
    /// Compile once, loop over the external samplespace if any.
    #[default]
    Simple,
    /// Recompile for every external combination.
    ParameterizedSweep {
        /// Run the analyzer on every single-combination dataset too.
        post_process_each_iteration: bool,
    },
}

/// Trailing calibration acquisitions appended to every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPoints {
    #[default]
    None,
    /// Ground and first excited state.
    TwoState,
    /// Ground, first and second excited state.
    ThreeState,
}

impl CalibrationPoints {
    /// Number of trailing acquisitions per channel.
    pub fn count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::TwoState => 2,
            Self::ThreeState => 3,
        }
    }
}

/// Layout of acquisition channels and of the values inside a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum ReadoutLayout {
    /// One channel per component.
    #[default]
    Standard,
    /// One channel per component and prepared state.
    ///
    /// Channel `c` belongs to component `c % n` and state `c / n`.
    MultiState { states: u8 },
    /// One channel per component; the swept block arrives ordered
    /// `(loop, amplitude group, state)` and must be reshuffled.
    StateDiscriminationLoop { loops: usize, states: u8 },
}

impl ReadoutLayout {
    /// Number of channels per component.
    pub fn channels_per_component(&self) -> usize {
        match self {
            Self::MultiState { states } => usize::from(*states),
            Self::Standard | Self::StateDiscriminationLoop { .. } => 1,
        }
    }
}

/// Group of components analysed and committed together.
///
/// A qubit node has one unit per qubit. A coupler node has one unit per
/// coupler whose members are the coupler's two qubits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisUnit {
    /// Component the QOIs are written to.
    pub component: Component,
    /// Components whose status follows the analysis outcome.
    pub members: Vec<Component>,
}

/// A stored parameter populated before the node runs when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultParameter {
    pub component: Component,
    pub field: String,
    pub value: ParamValue,
}

/// Everything the supervisor and sweep executor need to know about a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Unique node name, also the graph vertex.
    pub name: String,
    /// Measured qubits, in channel order.
    pub components: Vec<Component>,
    /// Couplers for two-component nodes.
    pub couplers: Vec<Component>,
    /// Parameters produced by analysis.
    pub redis_fields: Vec<String>,
    /// Parameters swept inside one compiled schedule.
    pub schedule_samplespace: SampleSpace,
    /// Parameters needing a pre-measurement operation per value.
    pub external_samplespace: SampleSpace,
    pub measurement_kind: MeasurementKind,
    /// Back up and blank the node's fields before measuring.
    pub backup_enabled: bool,
    pub qubit_state: QubitState,
    pub calibration_points: CalibrationPoints,
    pub readout_layout: ReadoutLayout,
    pub default_parameters: Vec<DefaultParameter>,
}

impl NodeDescriptor {
    /// Create a descriptor measuring `components` with no sweep.
    pub fn new(name: impl Into<String>, components: Vec<Component>) -> Self {
        Self {
            name: name.into(),
            components,
            couplers: Vec::new(),
            redis_fields: Vec::new(),
            schedule_samplespace: SampleSpace::new(),
            external_samplespace: SampleSpace::new(),
            measurement_kind: MeasurementKind::Simple,
            backup_enabled: false,
            qubit_state: QubitState::Ground,
            calibration_points: CalibrationPoints::None,
            readout_layout: ReadoutLayout::Standard,
            default_parameters: Vec::new(),
        }
    }

    /// Create a descriptor for a coupler node.
    ///
    /// The measured components are the couplers' qubits in first-seen order.
    pub fn for_couplers(name: impl Into<String>, couplers: Vec<Component>) -> Self {
        let mut qubits: Vec<Component> = Vec::new();
        for qubit in couplers.iter().flat_map(Component::qubits) {
            if !qubits.contains(&qubit) {
                qubits.push(qubit);
            }
        }
        let mut descriptor = Self::new(name, qubits);
        descriptor.couplers = couplers;
        descriptor
    }

    /// Check if this node calibrates couplers.
    pub fn is_coupler_node(&self) -> bool {
        !self.couplers.is_empty()
    }

    /// Analysis units in component order.
    pub fn analysis_units(&self) -> Vec<AnalysisUnit> {
        if self.is_coupler_node() {
            self.couplers
                .iter()
                .map(|c| AnalysisUnit {
                    component: c.clone(),
                    members: c.qubits(),
                })
                .collect()
        } else {
            self.components
                .iter()
                .map(|c| AnalysisUnit {
                    component: c.clone(),
                    members: vec![c.clone()],
                })
                .collect()
        }
    }

    /// Components whose status decides whether the node is calibrated.
    pub fn status_components(&self) -> Vec<Component> {
        self.analysis_units()
            .into_iter()
            .flat_map(|u| u.members)
            .collect()
    }

    /// Number of acquisition channels the compiled schedule produces.
    pub fn channel_count(&self) -> usize {
        self.components.len() * self.readout_layout.channels_per_component()
    }
}

/// Read-only view of stored parameters handed to node factories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    values: BTreeMap<Component, BTreeMap<String, ParamValue>>,
}

impl ParameterSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value.
    pub fn insert(&mut self, component: Component, field: impl Into<String>, value: ParamValue) {
        self.values
            .entry(component)
            .or_default()
            .insert(field.into(), value);
    }

    /// Stored value of a field.
    pub fn get(&self, component: &Component, field: &str) -> Option<&ParamValue> {
        self.values.get(component)?.get(field)
    }

    /// Numeric value of a field, ignoring the NaN sentinel.
    pub fn get_f64(&self, component: &Component, field: &str) -> Option<f64> {
        self.get(component, field)
            .and_then(ParamValue::as_f64)
            .filter(|v| v.is_finite())
    }

    /// Components with at least one value.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.values.keys()
    }
}

/// Inputs to a node factory.
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    pub qubits: Vec<Component>,
    pub couplers: Vec<Component>,
    pub parameters: ParameterSnapshot,
    /// Free-form per-node options.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeContext {
    /// Create a context for the given qubits and couplers.
    pub fn new(qubits: Vec<Component>, couplers: Vec<Component>) -> Self {
        Self {
            qubits,
            couplers,
            ..Default::default()
        }
    }

    /// Attach a parameter snapshot.
    pub fn with_parameters(mut self, parameters: ParameterSnapshot) -> Self {
        self.parameters = parameters;
        self
    }

    /// Attach extra options.
    pub fn with_extra(mut self, extra: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra = extra;
        self
    }

    /// Stored numeric parameter or a fallback.
    pub fn param_or(&self, component: &Component, field: &str, default: f64) -> f64 {
        self.parameters.get_f64(component, field).unwrap_or(default)
    }

    /// Integer option from `extra` or a fallback.
    pub fn extra_usize(&self, key: &str, default: usize) -> NodeResult<usize> {
        match self.extra.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .and_then(|v| usize::try_from(v).ok())
                .filter(|v| *v > 0)
                .ok_or_else(|| {
                    NodeError::Configuration(format!(
                        "option '{key}' must be a positive integer, got {value}"
                    ))
                }),
        }
    }

    /// Floating point option from `extra` or a fallback.
    pub fn extra_f64(&self, key: &str, default: f64) -> NodeResult<f64> {
        match self.extra.get(key) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| {
                NodeError::Configuration(format!("option '{key}' must be a number, got {value}"))
            }),
        }
    }
}

/// A calibration step.
///
/// Nodes are built fresh for every invocation from a [`NodeContext`] and
/// carry no state across runs.
pub trait CalibrationNode: Send + Sync {
    /// Static description of the node.
    fn descriptor(&self) -> &NodeDescriptor;

    /// Node name.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Validated schedule dimensions.
    fn dimensions(&self) -> NodeResult<SweepShape> {
        let d = self.descriptor();
        d.schedule_samplespace.dimensions(&d.components)
    }

    /// The external dimension, if the node declares one.
    fn external_dimensions(&self) -> NodeResult<Option<SweepShape>> {
        let d = self.descriptor();
        if d.external_samplespace.is_empty() {
            return Ok(None);
        }
        let shape = d.external_samplespace.dimensions(&d.components)?;
        if shape.rank() > 1 {
            return Err(NodeError::MultiDimensionalExternal {
                node: d.name.clone(),
                count: shape.rank(),
            });
        }
        Ok(Some(shape))
    }

    /// Validate both samplespaces.
    fn validate(&self) -> NodeResult<()> {
        self.dimensions()?;
        self.external_dimensions()?;
        if self.descriptor().components.is_empty() {
            return Err(NodeError::Configuration(format!(
                "node {} measures no components",
                self.name()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(NodeDescriptor);

    impl CalibrationNode for Fixed {
        fn descriptor(&self) -> &NodeDescriptor {
            &self.0
        }
    }

    #[test]
    fn test_coupler_descriptor_units() {
        let couplers = Component::parse_all(["q1_q2", "q2_q3"]).unwrap();
        let descriptor = NodeDescriptor::for_couplers("cz_chevron", couplers.clone());

        assert_eq!(
            descriptor.components,
            Component::parse_all(["q1", "q2", "q3"]).unwrap()
        );
        let units = descriptor.analysis_units();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].component, couplers[0]);
        assert_eq!(units[1].members, Component::parse_all(["q2", "q3"]).unwrap());
    }

    #[test]
    fn test_external_dimension_limit() {
        let q1 = Component::qubit("q1");
        let mut descriptor = NodeDescriptor::new("x", vec![q1.clone()]);
        descriptor.external_samplespace = SampleSpace::new()
            .with("dc_currents", q1.clone(), vec![0.0, 1.0])
            .with("flux", q1, vec![0.0]);

        let node = Fixed(descriptor);
        assert!(matches!(
            node.external_dimensions(),
            Err(NodeError::MultiDimensionalExternal { count: 2, .. })
        ));
    }

    #[test]
    fn test_snapshot_ignores_nan_sentinel() {
        let q1 = Component::qubit("q1");
        let mut snapshot = ParameterSnapshot::new();
        snapshot.insert(q1.clone(), "t1_time", ParamValue::nan());
        snapshot.insert(q1.clone(), "rxy:amp180", ParamValue::Float(0.3));

        let ctx = NodeContext::new(vec![q1.clone()], vec![]).with_parameters(snapshot);
        assert_eq!(ctx.param_or(&q1, "t1_time", 1e-5), 1e-5);
        assert_eq!(ctx.param_or(&q1, "rxy:amp180", 0.0), 0.3);
    }

    #[test]
    fn test_extra_options() {
        let mut extra = serde_json::Map::new();
        extra.insert("points".to_string(), serde_json::json!(7));
        extra.insert("span".to_string(), serde_json::json!("wide"));
        let ctx = NodeContext::default().with_extra(extra);

        assert_eq!(ctx.extra_usize("points", 3).unwrap(), 7);
        assert_eq!(ctx.extra_usize("missing", 3).unwrap(), 3);
        assert!(ctx.extra_f64("span", 1.0).is_err());
    }

    #[test]
    fn test_channel_count() {
        let mut descriptor = NodeDescriptor::new("ro", Component::parse_all(["q1", "q2"]).unwrap());
        descriptor.readout_layout = ReadoutLayout::MultiState { states: 3 };
        assert_eq!(descriptor.channel_count(), 6);
    }
}
