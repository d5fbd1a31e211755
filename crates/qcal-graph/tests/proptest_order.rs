//! Property-based tests for calibration ordering.
//!
//! Random DAGs are built with every node reachable from node 0, which acts
//! as the entry. Edges only go from lower to higher indices so the graph is
//! acyclic by construction.

use qcal_graph::{DependencyGraph, NodeAttributes};
use proptest::prelude::*;

fn name(i: usize) -> String {
    format!("n{i}")
}

/// Generate a random rooted DAG as (node count, edges, refine flags).
fn arb_dag() -> impl Strategy<Value = (usize, Vec<(usize, usize, f64)>, Vec<bool>)> {
    (2_usize..=10).prop_flat_map(|n| {
        let spine = (1..n)
            .map(|to| (0..to, 0.0_f64..10.0).prop_map(move |(from, w)| (from, to, w)))
            .collect::<Vec<_>>();
        let extra = prop::collection::vec((0..n, 0..n, 0.0_f64..10.0), 0..=n);
        (
            Just(n),
            spine,
            extra,
            prop::collection::vec(any::<bool>(), n),
        )
            .prop_map(|(n, mut spine, extra, refine)| {
                spine.extend(extra.into_iter().filter(|(a, b, _)| a < b));
                (n, spine, refine)
            })
    })
}

fn build(n: usize, edges: &[(usize, usize, f64)], refine: &[bool]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for i in 0..n {
        let attrs = if refine[i] && i != 0 {
            NodeAttributes::refine()
        } else {
            NodeAttributes::default()
        };
        graph.add_node(name(i), attrs).unwrap();
    }
    for &(from, to, w) in edges {
        graph.add_weighted_edge(&name(from), &name(to), w).unwrap();
    }
    graph.set_entry(&name(0)).unwrap();
    graph
}

proptest! {
    #[test]
    fn order_respects_dependencies((n, edges, refine) in arb_dag(), target in 0_usize..10) {
        let target = target % n;
        let graph = build(n, &edges, &refine);
        let order = graph.filtered_topological_order(&name(target)).unwrap();

        let position = |node: &str| order.iter().position(|o| o == node);

        // Entry first, target last, no duplicates.
        prop_assert_eq!(order.first().map(String::as_str), Some("n0"));
        prop_assert_eq!(order.last().cloned(), Some(name(target)));
        let mut unique = order.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), order.len());

        // Every non-refine ancestor is present, and dependencies come first.
        for ancestor in graph.ancestors(&name(target)).unwrap() {
            let refine_node = graph.is_refine(ancestor).unwrap();
            prop_assert_eq!(position(ancestor).is_some(), !refine_node);
        }
        for &(from, to, _) in &edges {
            if let (Some(a), Some(b)) = (position(&name(from)), position(&name(to))) {
                prop_assert!(a < b);
            }
        }
    }

    #[test]
    fn closing_edge_is_rejected((n, edges, refine) in arb_dag()) {
        let mut graph = build(n, &edges, &refine);
        let last = name(n - 1);
        // Node 0 reaches every node, so any edge back to it closes a cycle.
        prop_assert!(graph.add_edge(&last, "n0").is_err());
    }
}
