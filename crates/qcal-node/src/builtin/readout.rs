//! Readout frequency and amplitude optimisation.

use qcal_types::QubitState;

use super::spectroscopy::{READOUT_1_FREQUENCY, READOUT_FREQUENCY};
use super::{centred, linspace, qubits, sweep_each};
use crate::descriptor::{NodeContext, NodeDescriptor, ReadoutLayout};
use crate::error::NodeResult;

pub(super) fn ro_frequency_two_state_optimization(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    let name = "ro_frequency_two_state_optimization";
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 31)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.qubit_state = QubitState::Excited;
    node.readout_layout = ReadoutLayout::MultiState { states: 2 };
    node.redis_fields = vec!["extended_clock_freqs:readout_2state_opt".to_string()];
    sweep_each(&mut node.schedule_samplespace, "ro_opt_frequencies", &qubits, |q| {
        let ground = ctx.param_or(q, READOUT_FREQUENCY, 6.8e9);
        let excited = ctx.param_or(q, READOUT_1_FREQUENCY, ground);
        centred((ground + excited) / 2.0, 3e6, points)
    });
    Ok(node)
}

/// Amplitude sweep with a state-discrimination loop.
///
/// The `qubit_states` axis enumerates `loop * states + state` so each
/// amplitude group holds every shot of every prepared state.
fn ro_amplitude_optimization(
    ctx: &NodeContext,
    name: &str,
    states: u8,
    qubit_state: QubitState,
    fields: &[&str],
) -> NodeResult<NodeDescriptor> {
    let qubits = qubits(ctx, name)?;
    let points = ctx.extra_usize("points", 11)?;
    let loops = ctx.extra_usize("loops", 8)?;

    let mut node = NodeDescriptor::new(name, qubits.clone());
    node.qubit_state = qubit_state;
    node.readout_layout = ReadoutLayout::StateDiscriminationLoop { loops, states };
    node.redis_fields = fields.iter().map(|f| (*f).to_string()).collect();

    let shots: Vec<f64> = (0..loops)
        .flat_map(|_| (0..states).map(f64::from))
        .collect();
    sweep_each(&mut node.schedule_samplespace, "qubit_states", &qubits, |_| shots.clone());
    sweep_each(&mut node.schedule_samplespace, "ro_amplitudes", &qubits, |_| {
        linspace(0.005, 0.05, points)
    });
    Ok(node)
}

pub(super) fn ro_amplitude_two_state_optimization(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    ro_amplitude_optimization(
        ctx,
        "ro_amplitude_two_state_optimization",
        2,
        QubitState::Excited,
        &[
            "measure_2state_opt:pulse_amp",
            "measure_2state_opt:threshold",
        ],
    )
}

pub(super) fn ro_amplitude_three_state_optimization(ctx: &NodeContext) -> NodeResult<NodeDescriptor> {
    ro_amplitude_optimization(
        ctx,
        "ro_amplitude_three_state_optimization",
        3,
        QubitState::SecondExcited,
        &["measure_3state_opt:pulse_amp"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_types::Component;

    #[test]
    fn test_loop_axis_covers_every_shot() {
        let q1 = Component::qubit("q1");
        let mut extra = serde_json::Map::new();
        extra.insert("loops".to_string(), serde_json::json!(2));
        let ctx = NodeContext::new(vec![q1.clone()], vec![]).with_extra(extra);

        let node = ro_amplitude_three_state_optimization(&ctx).unwrap();
        assert_eq!(
            node.schedule_samplespace.values("qubit_states", &q1),
            Some(&[0.0, 1.0, 2.0, 0.0, 1.0, 2.0][..])
        );
        assert_eq!(
            node.readout_layout,
            ReadoutLayout::StateDiscriminationLoop { loops: 2, states: 3 }
        );
    }

    #[test]
    fn test_two_state_frequency_uses_two_channels() {
        let ctx = NodeContext::new(Component::parse_all(["q1", "q2"]).unwrap(), vec![]);
        let node = ro_frequency_two_state_optimization(&ctx).unwrap();
        assert_eq!(node.channel_count(), 4);
    }
}
