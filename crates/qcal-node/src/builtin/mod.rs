//! Builtin superconducting-qubit calibration nodes.
//!
//! Every builtin is a plain [`NodeDescriptor`] computed from the
//! [`NodeContext`]: sweep centres come from the parameter snapshot with a
//! per-node fallback, point counts can be overridden through `extra`.

mod coherence;
mod drive;
mod readout;
mod spectroscopy;
mod two_qubit;

use ndarray::Array1;
use qcal_types::{Component, ParamValue};

use crate::descriptor::{CalibrationNode, DefaultParameter, NodeContext, NodeDescriptor};
use crate::error::{NodeError, NodeResult};
use crate::registry::NodeRegistry;
use crate::samplespace::SampleSpace;

type Builder = fn(&NodeContext) -> NodeResult<NodeDescriptor>;

const BUILTINS: &[(&str, Builder)] = &[
    ("punchout", spectroscopy::punchout),
    ("resonator_spectroscopy", spectroscopy::resonator_spectroscopy),
    ("qubit_01_spectroscopy", spectroscopy::qubit_01_spectroscopy),
    ("rabi_oscillations", drive::rabi_oscillations),
    ("ramsey_correction", drive::ramsey_correction),
    ("motzoi_parameter", drive::motzoi_parameter),
    ("n_rabi_oscillations", drive::n_rabi_oscillations),
    ("resonator_spectroscopy_1", spectroscopy::resonator_spectroscopy_1),
    ("qubit_12_spectroscopy", spectroscopy::qubit_12_spectroscopy),
    ("rabi_oscillations_12", drive::rabi_oscillations_12),
    ("ramsey_correction_12", drive::ramsey_correction_12),
    ("resonator_spectroscopy_2", spectroscopy::resonator_spectroscopy_2),
    (
        "ro_frequency_two_state_optimization",
        readout::ro_frequency_two_state_optimization,
    ),
    (
        "ro_amplitude_two_state_optimization",
        readout::ro_amplitude_two_state_optimization,
    ),
    (
        "ro_amplitude_three_state_optimization",
        readout::ro_amplitude_three_state_optimization,
    ),
    ("t1", coherence::t1),
    ("t2_echo", coherence::t2_echo),
    ("coupler_spectroscopy", spectroscopy::coupler_spectroscopy),
    ("cz_chevron", two_qubit::cz_chevron),
    ("cz_calibration", two_qubit::cz_calibration),
];

/// A node fully described by its descriptor.
#[derive(Debug, Clone)]
pub struct BuiltinNode {
    descriptor: NodeDescriptor,
}

impl BuiltinNode {
    pub fn new(descriptor: NodeDescriptor) -> Self {
        Self { descriptor }
    }
}

impl CalibrationNode for BuiltinNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }
}

/// Names of every builtin node.
pub fn builtin_node_names() -> Vec<&'static str> {
    BUILTINS.iter().map(|(name, _)| *name).collect()
}

pub(crate) fn register_all(registry: &mut NodeRegistry) {
    for &(name, build) in BUILTINS {
        registry.register_factory(name, move |ctx| {
            Ok(Box::new(BuiltinNode::new(build(ctx)?)) as Box<dyn CalibrationNode>)
        });
    }
}

fn linspace(start: f64, stop: f64, points: usize) -> Vec<f64> {
    Array1::linspace(start, stop, points).to_vec()
}

fn centred(centre: f64, span: f64, points: usize) -> Vec<f64> {
    linspace(centre - span / 2.0, centre + span / 2.0, points)
}

fn qubits(ctx: &NodeContext, node: &str) -> NodeResult<Vec<Component>> {
    if ctx.qubits.is_empty() {
        return Err(NodeError::Configuration(format!("{node} needs at least one qubit")));
    }
    Ok(ctx.qubits.clone())
}

fn couplers(ctx: &NodeContext, node: &str) -> NodeResult<Vec<Component>> {
    if ctx.couplers.is_empty() {
        return Err(NodeError::Configuration(format!("{node} needs at least one coupler")));
    }
    Ok(ctx.couplers.clone())
}

/// Sweep `parameter` on every component with per-component values.
fn sweep_each(
    space: &mut SampleSpace,
    parameter: &str,
    components: &[Component],
    values: impl Fn(&Component) -> Vec<f64>,
) {
    for component in components {
        space.insert(parameter, component.clone(), values(component));
    }
}

fn defaults(components: &[Component], fields: &[(&str, f64)]) -> Vec<DefaultParameter> {
    components
        .iter()
        .flat_map(|c| {
            fields.iter().map(move |(field, value)| DefaultParameter {
                component: c.clone(),
                field: (*field).to_string(),
                value: ParamValue::Float(*value),
            })
        })
        .collect()
}
