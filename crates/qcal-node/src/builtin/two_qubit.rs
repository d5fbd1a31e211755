//! CZ gate calibration on couplers.

use super::{centred, couplers, defaults, linspace, sweep_each};
use crate::descriptor::{CalibrationPoints, MeasurementKind, NodeContext, NodeDescriptor};
use crate::error::NodeResult;

const CZ_FREQUENCY: &str = "cz_pulse_frequency";
const CZ_DURATION: &str = "cz_pulse_duration";
const CZ_AMPLITUDE: &str = "cz_pulse_amplitude";

const COUPLER_DEFAULTS: &[(&str, f64)] = &[
    (CZ_FREQUENCY, 350e6),
    (CZ_DURATION, 240e-9),
    (CZ_AMPLITUDE, 0.05),
];

pub(super) fn cz_chevron(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "cz_chevron";
    let couplers = couplers(ctx, name)?;
    let points = ctx.extra_usize("points", 11)?;
    let duration_points = ctx.extra_usize("duration_points", 9)?;

    let mut node = NodeDescriptor::for_couplers(name, couplers.clone());
    node.redis_fields = vec![CZ_FREQUENCY.to_string(), CZ_DURATION.to_string()];
    node.calibration_points = CalibrationPoints::ThreeState;
    sweep_each(&mut node.schedule_samplespace, "cz_pulse_frequencies", &couplers, |c| {
        centred(ctx.param_or(c, CZ_FREQUENCY, 350e6), 20e6, points)
    });
    sweep_each(&mut node.schedule_samplespace, "cz_pulse_durations", &couplers, |_| {
        linspace(80e-9, 400e-9, duration_points)
    });
    node.default_parameters = defaults(&couplers, COUPLER_DEFAULTS);
    Ok(node)
}

pub(super) fn cz_calibration(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "cz_calibration";
    let couplers = couplers(ctx, name)?;
    let points = ctx.extra_usize("points", 13)?;
    let amplitude_points = ctx.extra_usize("amplitude_points", 5)?;

    let mut node = NodeDescriptor::for_couplers(name, couplers.clone());
    node.redis_fields = vec![CZ_AMPLITUDE.to_string(), "cz_dynamic_phase".to_string()];
    node.calibration_points = CalibrationPoints::ThreeState;
    node.measurement_kind = MeasurementKind::ParameterizedSweep {
        post_process_each_iteration: true,
    };
    let measured = node.components.clone();
    sweep_each(&mut node.schedule_samplespace, "ramsey_phases", &measured, |_| {
        linspace(0.0, 360.0, points)
    });
    sweep_each(&mut node.schedule_samplespace, "control_ons", &measured, |_| vec![0.0, 1.0]);
    sweep_each(&mut node.external_samplespace, "cz_pulse_amplitudes", &couplers, |c| {
        centred(ctx.param_or(c, CZ_AMPLITUDE, 0.05), 0.02, amplitude_points)
    });
    node.default_parameters = defaults(&couplers, COUPLER_DEFAULTS);
    Ok(node)
}
