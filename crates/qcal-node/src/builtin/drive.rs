//! Drive amplitude, frequency and DRAG calibrations.

use qcal_types::QubitState;

use super::spectroscopy::{F01, F12};
use super::{centred, defaults, linspace, qubits, sweep_each};
use crate::descriptor::{NodeContext, NodeDescriptor};
use crate::error::NodeResult;

const AMP180: &str = "rxy:amp180";

pub(super) fn rabi_oscillations(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "rabi_oscillations";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 41)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.redis_fields = vec![AMP180.to_string()];
    sweep_each(&mut node.schedule_samplespace, "mw_amplitudes", &qubits, |_| {
        linspace(0.002, 0.4, points)
    });
    node.default_parameters = defaults(&qubits, &[("rxy:duration", 28e-9), ("rxy:motzoi", 0.0)]);
    Ok(node)
}

pub(super) fn rabi_oscillations_12(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "rabi_oscillations_12";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 41)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.qubit_state = QubitState::Excited;
    node.redis_fields = vec!["r12:ef_amp180".to_string()];
    sweep_each(&mut node.schedule_samplespace, "mw_amplitudes", &qubits, |_| {
        linspace(0.002, 0.4, points)
    });
    node.default_parameters = defaults(&qubits, &[("r12:ef_duration", 56e-9)]);
    Ok(node)
}

fn ramsey(
    ctx: &NodeContext,
    name: &str,
    field: &str,
    qubit_state: QubitState,
) -> NodeResult<NodeDescriptor> {
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 21)?;
    let detunings = ctx.extra_usize("detunings", 5)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.qubit_state = qubit_state;
    node.redis_fields = vec![field.to_string()];
    sweep_each(&mut node.schedule_samplespace, "ramsey_delays", &qubits, |_| {
        linspace(4e-9, 2.048e-6, points)
    });
    sweep_each(
        &mut node.schedule_samplespace,
        "artificial_detunings",
        &qubits,
        |_| centred(0.0, 4.2e6, detunings),
    );
    Ok(node)
}

pub(super) fn ramsey_correction(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    ramsey(ctx, "ramsey_correction", F01, QubitState::Ground)
}

pub(super) fn ramsey_correction_12(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    ramsey(ctx, "ramsey_correction_12", F12, QubitState::Excited)
}

pub(super) fn motzoi_parameter(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "motzoi_parameter";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 21)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.redis_fields = vec!["rxy:motzoi".to_string()];
    sweep_each(&mut node.schedule_samplespace, "mw_motzois", &qubits, |_| {
        linspace(-0.4, 0.1, points)
    });
    sweep_each(&mut node.schedule_samplespace, "X_repetitions", &qubits, |_| {
        vec![2.0, 4.0, 6.0, 8.0]
    });
    Ok(node)
}

pub(super) fn n_rabi_oscillations(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "n_rabi_oscillations";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 21)?;
    let repetitions = ctx.extra_usize("repetitions", 5)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.redis_fields = vec![AMP180.to_string()];
    sweep_each(&mut node.schedule_samplespace, "mw_amplitudes_sweep", &qubits, |q| {
        centred(ctx.param_or(q, AMP180, 0.1), 0.02, points)
    });
    sweep_each(&mut node.schedule_samplespace, "X_repetitions", &qubits, |_| {
        (0..repetitions).map(|i| (2 * i + 1) as f64).collect()
    });
    Ok(node)
}
