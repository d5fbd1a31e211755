//! The standard superconducting-qubit calibration graph.

use crate::error::GraphResult;
use crate::graph::{DependencyGraph, NodeAttributes};

/// Entry node every calibration starts from.
pub const ENTRY_NODE: &str = "resonator_spectroscopy";

/// Coupler node reached through a one-shot side path.
pub const AUXILIARY_NODE: &str = "coupler_spectroscopy";

/// Node that runs alone and is never part of a chain.
pub const ENTRY_ONLY_NODE: &str = "punchout";

const NODES: &[(&str, bool)] = &[
    ("punchout", false),
    ("resonator_spectroscopy", false),
    ("qubit_01_spectroscopy", false),
    ("rabi_oscillations", false),
    ("ramsey_correction", false),
    ("motzoi_parameter", true),
    ("n_rabi_oscillations", true),
    ("resonator_spectroscopy_1", false),
    ("qubit_12_spectroscopy", false),
    ("rabi_oscillations_12", false),
    ("ramsey_correction_12", false),
    ("resonator_spectroscopy_2", false),
    ("ro_frequency_two_state_optimization", false),
    ("ro_amplitude_two_state_optimization", false),
    ("ro_amplitude_three_state_optimization", false),
    ("t1", false),
    ("t2_echo", false),
    ("coupler_spectroscopy", false),
    ("cz_chevron", false),
    ("cz_calibration", false),
];

const CHAIN: &[&str] = &[
    "resonator_spectroscopy",
    "qubit_01_spectroscopy",
    "rabi_oscillations",
    "ramsey_correction",
    "motzoi_parameter",
    "n_rabi_oscillations",
    "resonator_spectroscopy_1",
    "qubit_12_spectroscopy",
    "rabi_oscillations_12",
    "ramsey_correction_12",
    "resonator_spectroscopy_2",
    "ro_frequency_two_state_optimization",
    "ro_amplitude_two_state_optimization",
    "ro_amplitude_three_state_optimization",
];

const BRANCHES: &[(&str, &str)] = &[
    ("ro_amplitude_two_state_optimization", "t1"),
    ("ro_amplitude_two_state_optimization", "t2_echo"),
    ("resonator_spectroscopy", "coupler_spectroscopy"),
    ("coupler_spectroscopy", "cz_chevron"),
    ("ro_amplitude_three_state_optimization", "cz_chevron"),
    ("cz_chevron", "cz_calibration"),
];

impl DependencyGraph {
    /// Build the standard calibration graph.
    ///
    /// Single-qubit characterisation forms one chain from resonator
    /// spectroscopy to three-state readout optimisation. Coherence
    /// measurements hang off the two-state readout node and the two-qubit
    /// gate nodes need both the chain and coupler spectroscopy.
    pub fn calibration_graph() -> GraphResult<Self> {
        let mut graph = Self::new();
        for &(name, refine) in NODES {
            let attrs = if refine {
                NodeAttributes::refine()
            } else {
                NodeAttributes::default()
            };
            graph.add_node(name, attrs)?;
        }
        for pair in CHAIN.windows(2) {
            graph.add_edge(pair[0], pair[1])?;
        }
        for &(from, to) in BRANCHES {
            graph.add_edge(from, to)?;
        }
        graph.set_entry(ENTRY_NODE)?;
        graph.set_auxiliary(AUXILIARY_NODE)?;
        graph.mark_entry_only(ENTRY_ONLY_NODE)?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_qubit_chain_skips_refinements() {
        let graph = DependencyGraph::calibration_graph().unwrap();
        let order = graph.filtered_topological_order("t1").unwrap();
        assert_eq!(
            order,
            vec![
                "resonator_spectroscopy",
                "qubit_01_spectroscopy",
                "rabi_oscillations",
                "ramsey_correction",
                "resonator_spectroscopy_1",
                "qubit_12_spectroscopy",
                "rabi_oscillations_12",
                "ramsey_correction_12",
                "resonator_spectroscopy_2",
                "ro_frequency_two_state_optimization",
                "ro_amplitude_two_state_optimization",
                "t1",
            ]
        );
    }

    #[test]
    fn test_refinement_target_keeps_itself() {
        let graph = DependencyGraph::calibration_graph().unwrap();
        let order = graph.filtered_topological_order("n_rabi_oscillations").unwrap();
        assert_eq!(order.last().map(String::as_str), Some("n_rabi_oscillations"));
        assert!(!order.iter().any(|n| n == "motzoi_parameter"));
    }

    #[test]
    fn test_coupler_prefix() {
        let graph = DependencyGraph::calibration_graph().unwrap();
        let order = graph.filtered_topological_order("cz_calibration").unwrap();

        assert_eq!(&order[..2], ["resonator_spectroscopy", "coupler_spectroscopy"]);
        assert_eq!(
            order.iter().filter(|n| *n == "resonator_spectroscopy").count(),
            1
        );
        assert_eq!(
            order.iter().filter(|n| *n == "coupler_spectroscopy").count(),
            1
        );
        assert_eq!(&order[order.len() - 2..], ["cz_chevron", "cz_calibration"]);
        assert!(order.contains(&"ro_amplitude_three_state_optimization".to_string()));
        assert!(!order.contains(&"t1".to_string()));
    }

    #[test]
    fn test_punchout_runs_alone() {
        let graph = DependencyGraph::calibration_graph().unwrap();
        assert_eq!(
            graph.filtered_topological_order("punchout").unwrap(),
            vec!["punchout"]
        );
    }

    #[test]
    fn test_graph_shape() {
        let graph = DependencyGraph::calibration_graph().unwrap();
        assert_eq!(graph.len(), NODES.len());
        assert_eq!(graph.entry(), Some(ENTRY_NODE));
        assert_eq!(graph.auxiliary(), Some(AUXILIARY_NODE));
        assert!(graph.is_refine("motzoi_parameter").unwrap());
        assert!(!graph.is_refine("t1").unwrap());
        assert_eq!(
            graph.dependents("ro_amplitude_two_state_optimization").unwrap(),
            vec!["ro_amplitude_three_state_optimization", "t1", "t2_echo"]
        );
    }
}
