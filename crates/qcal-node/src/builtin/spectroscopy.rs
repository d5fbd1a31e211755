//! Resonator, qubit and coupler spectroscopy.

use qcal_types::QubitState;

use super::{centred, couplers, defaults, linspace, qubits, sweep_each};
use crate::descriptor::{NodeContext, NodeDescriptor};
use crate::error::NodeResult;

pub(super) const READOUT_FREQUENCY: &str = "clock_freqs:readout";
pub(super) const READOUT_1_FREQUENCY: &str = "extended_clock_freqs:readout_1";
pub(super) const F01: &str = "clock_freqs:f01";
pub(super) const F12: &str = "clock_freqs:f12";

const FALLBACK_READOUT: f64 = 6.8e9;
const FALLBACK_F01: f64 = 4.5e9;
const ANHARMONICITY: f64 = -250e6;

/// Readout pulse defaults shared by every resonator node.
const MEASURE_DEFAULTS: &[(&str, f64)] = &[
    ("measure:pulse_amp", 0.03),
    ("measure:pulse_duration", 3e-6),
    ("measure:acq_delay", 220e-9),
    ("measure:integration_time", 2.5e-6),
];

pub(super) fn punchout(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "punchout";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 21)?;
    let amplitude_points = ctx.extra_usize("amplitude_points", 6)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.redis_fields = vec!["measure:pulse_amp".to_string()];
    sweep_each(&mut node.schedule_samplespace, "ro_frequencies", &qubits, |q| {
        centred(ctx.param_or(q, READOUT_FREQUENCY, FALLBACK_READOUT), 3e6, points)
    });
    sweep_each(&mut node.schedule_samplespace, "ro_amplitudes", &qubits, |_| {
        linspace(0.005, 0.06, amplitude_points)
    });
    node.default_parameters = defaults(&qubits, MEASURE_DEFAULTS);
    Ok(node)
}

pub(super) fn resonator_spectroscopy(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "resonator_spectroscopy";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 41)?;
    let span = ctx.extra_f64("span", 4e6)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.redis_fields = vec![
        READOUT_FREQUENCY.to_string(),
        "Ql".to_string(),
        "resonator_minimum".to_string(),
    ];
    sweep_each(&mut node.schedule_samplespace, "ro_frequencies", &qubits, |q| {
        centred(ctx.param_or(q, READOUT_FREQUENCY, FALLBACK_READOUT), span, points)
    });
    node.default_parameters = defaults(&qubits, MEASURE_DEFAULTS);
    Ok(node)
}

pub(super) fn resonator_spectroscopy_1(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "resonator_spectroscopy_1";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 41)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.qubit_state = QubitState::Excited;
    node.redis_fields = vec![READOUT_1_FREQUENCY.to_string()];
    sweep_each(&mut node.schedule_samplespace, "ro_frequencies", &qubits, |q| {
        let ground = ctx.param_or(q, READOUT_FREQUENCY, FALLBACK_READOUT);
        centred(ground - 0.5e6, 4e6, points)
    });
    Ok(node)
}

pub(super) fn resonator_spectroscopy_2(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "resonator_spectroscopy_2";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 41)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.qubit_state = QubitState::SecondExcited;
    node.redis_fields = vec!["extended_clock_freqs:readout_2".to_string()];
    sweep_each(&mut node.schedule_samplespace, "ro_frequencies", &qubits, |q| {
        let excited = ctx.param_or(
            q,
            READOUT_1_FREQUENCY,
            ctx.param_or(q, READOUT_FREQUENCY, FALLBACK_READOUT),
        );
        centred(excited - 0.5e6, 4e6, points)
    });
    Ok(node)
}

pub(super) fn qubit_01_spectroscopy(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "qubit_01_spectroscopy";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 51)?;
    let span = ctx.extra_f64("span", 10e6)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.redis_fields = vec![F01.to_string()];
    sweep_each(&mut node.schedule_samplespace, "spec_frequencies", &qubits, |q| {
        centred(ctx.param_or(q, F01, FALLBACK_F01), span, points)
    });
    node.default_parameters = defaults(&qubits, &[("spec:spec_amp", 1e-3), ("spec:spec_duration", 20e-6)]);
    Ok(node)
}

pub(super) fn qubit_12_spectroscopy(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "qubit_12_spectroscopy";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 51)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.qubit_state = QubitState::Excited;
    node.redis_fields = vec![F12.to_string()];
    sweep_each(&mut node.schedule_samplespace, "spec_frequencies", &qubits, |q| {
        let f01 = ctx.param_or(q, F01, FALLBACK_F01);
        centred(ctx.param_or(q, F12, f01 + ANHARMONICITY), 20e6, points)
    });
    Ok(node)
}

pub(super) fn coupler_spectroscopy(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "coupler_spectroscopy";
    let couplers = couplers(ctx, name)?;
    let points = ctx.extra_usize("points", 21)?;
    let current_points = ctx.extra_usize("current_points", 5)?;

    let mut node = NodeDescriptor::for_couplers(name, couplers.clone());
    node.redis_fields = vec!["parking_current".to_string()];
    let measured = node.components.clone();
    sweep_each(&mut node.schedule_samplespace, "spec_frequencies", &measured, |q| {
        centred(ctx.param_or(q, F01, FALLBACK_F01), 10e6, points)
    });
    sweep_each(&mut node.external_samplespace, "dc_currents", &couplers, |_| {
        linspace(-2.5e-3, 2.5e-3, current_points)
    });
    Ok(node)
}
