//! Coherence time measurements.

use super::{linspace, qubits, sweep_each};
use crate::descriptor::{CalibrationPoints, NodeContext, NodeDescriptor};
use crate::error::NodeResult;

pub(super) fn t1(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "t1";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 31)?;
    let max_delay = ctx.extra_f64("max_delay", 300e-6)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.redis_fields = vec!["t1_time".to_string()];
    node.backup_enabled = true;
    node.calibration_points = CalibrationPoints::TwoState;
    sweep_each(&mut node.schedule_samplespace, "delays", &qubits, |_| {
        linspace(8e-9, max_delay, points)
    });
    Ok(node)
}

pub(super) fn t2_echo(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "t2_echo";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 31)?;
    let max_delay = ctx.extra_f64("max_delay", 200e-6)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.redis_fields = vec!["t2_echo_time".to_string()];
    node.backup_enabled = true;
    node.calibration_points = CalibrationPoints::TwoState;
    sweep_each(&mut node.schedule_samplespace, "echo_delays", &qubits, |_| {
        linspace(8e-9, max_delay, points)
    });
    Ok(node)
}
