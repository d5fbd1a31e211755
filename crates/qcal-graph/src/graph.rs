//! Calibration dependency DAG.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use petgraph::Direction;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GraphError, GraphResult};

/// Default weight of a dependency edge.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Attributes attached to a calibration node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttributes {
    /// Refinement nodes are skipped unless they are the target.
    pub refine: bool,
}

impl NodeAttributes {
    /// Attributes of a refinement node.
    pub fn refine() -> Self {
        Self { refine: true }
    }
}

/// A vertex of the dependency graph.
#[derive(Debug, Clone)]
struct GraphNode {
    name: String,
    attrs: NodeAttributes,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Dependency graph of calibration nodes.
///
/// An edge `a -> b` means `b` depends on `a`. Cycles are rejected when the
/// closing edge is added, so the graph is always a DAG.
///
/// Traversal never mutates the graph: the one-shot auxiliary detour of
/// [`filtered_topological_order`](Self::filtered_topological_order) is
/// computed against a view that excludes the auxiliary node, so repeated
/// runs see the same graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dag: DiGraph<GraphNode, f64>,
    index: FxHashMap<String, NodeIndex>,
    entry: Option<NodeIndex>,
    auxiliary: Option<NodeIndex>,
    entry_only: FxHashSet<NodeIndex>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a calibration node.
    pub fn add_node(&mut self, name: impl Into<String>, attrs: NodeAttributes) -> GraphResult<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }
        let idx = self.dag.add_node(GraphNode {
            name: name.clone(),
            attrs,
        });
        self.index.insert(name, idx);
        Ok(())
    }

    /// Add a dependency edge with the default weight.
    ///
    /// The `from` node must be calibrated before the `to` node.
    pub fn add_edge(&mut self, from: &str, to: &str) -> GraphResult<()> {
        self.add_weighted_edge(from, to, DEFAULT_WEIGHT)
    }

    /// Add a dependency edge with an explicit tie-breaking weight.
    pub fn add_weighted_edge(&mut self, from: &str, to: &str, weight: f64) -> GraphResult<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(GraphError::InvalidWeight {
                from: from.to_string(),
                to: to.to_string(),
                weight,
            });
        }
        let from_idx = self.node_index(from)?;
        let to_idx = self.node_index(to)?;

        // Check for cycles
        if from_idx == to_idx
            || petgraph::algo::has_path_connecting(&self.dag, to_idx, from_idx, None)
        {
            return Err(GraphError::CycleDetected {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.dag.add_edge(from_idx, to_idx, weight);
        Ok(())
    }

    /// Set the canonical entry node every calibration starts from.
    pub fn set_entry(&mut self, name: &str) -> GraphResult<()> {
        self.entry = Some(self.node_index(name)?);
        Ok(())
    }

    /// Set the auxiliary node reached through a one-shot side path.
    pub fn set_auxiliary(&mut self, name: &str) -> GraphResult<()> {
        self.auxiliary = Some(self.node_index(name)?);
        Ok(())
    }

    /// Mark a node that runs alone when it is the target.
    pub fn mark_entry_only(&mut self, name: &str) -> GraphResult<()> {
        let idx = self.node_index(name)?;
        self.entry_only.insert(idx);
        Ok(())
    }

    /// Name of the entry node, if configured.
    pub fn entry(&self) -> Option<&str> {
        self.entry.map(|idx| self.name(idx))
    }

    /// Name of the auxiliary node, if configured.
    pub fn auxiliary(&self) -> Option<&str> {
        self.auxiliary.map(|idx| self.name(idx))
    }

    /// Check if a node exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Check if a node is a refinement node.
    pub fn is_refine(&self, name: &str) -> GraphResult<bool> {
        let idx = self.node_index(name)?;
        Ok(self.dag[idx].attrs.refine)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.dag.node_count()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.dag.node_count() == 0
    }

    /// All node names in insertion order.
    pub fn node_names(&self) -> Vec<&str> {
        self.dag
            .node_indices()
            .map(|idx| self.dag[idx].name.as_str())
            .collect()
    }

    /// Direct dependencies of a node.
    pub fn dependencies(&self, name: &str) -> GraphResult<Vec<&str>> {
        let idx = self.node_index(name)?;
        Ok(self.neighbors(idx, Direction::Incoming))
    }

    /// Nodes depending directly on a node.
    pub fn dependents(&self, name: &str) -> GraphResult<Vec<&str>> {
        let idx = self.node_index(name)?;
        Ok(self.neighbors(idx, Direction::Outgoing))
    }

    /// Transitive dependencies of a node, in insertion order.
    pub fn ancestors(&self, name: &str) -> GraphResult<Vec<&str>> {
        let idx = self.node_index(name)?;
        let set = self.reachable(idx, Direction::Incoming, None);
        Ok(self.names_in_insertion_order(&set))
    }

    /// Transitive dependents of a node, in insertion order.
    pub fn descendants(&self, name: &str) -> GraphResult<Vec<&str>> {
        let idx = self.node_index(name)?;
        let set = self.reachable(idx, Direction::Outgoing, None);
        Ok(self.names_in_insertion_order(&set))
    }

    /// Execution order needed to calibrate `target`.
    ///
    /// 1. When the auxiliary node is an ancestor of `target`, the shortest
    ///    weighted path from the entry node to it becomes a prefix and the
    ///    auxiliary node is excluded from the remaining computation.
    /// 2. An entry-only target runs alone.
    /// 3. Otherwise every remaining ancestor of `target` is ordered so that
    ///    each node follows its dependencies; ready nodes are taken entry
    ///    first, then by lower incoming edge weight, then insertion order.
    ///    On a chain this is exactly the shortest path from entry to target.
    /// 4. Refinement nodes are dropped unless they are the target.
    /// 5. The prefix is prepended; nothing appears twice.
    pub fn filtered_topological_order(&self, target: &str) -> GraphResult<Vec<String>> {
        let target_idx = self.node_index(target)?;
        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        let ancestors = self.reachable(target_idx, Direction::Incoming, None);

        let (prefix, excluded) = match self.auxiliary {
            Some(aux) if ancestors.contains(&aux) => {
                let path = self.shortest_path(entry, aux)?;
                debug!(
                    "Target {} requires auxiliary path to {}",
                    target,
                    self.name(aux)
                );
                (path, Some(aux))
            }
            _ => (Vec::new(), None),
        };

        let main = if self.entry_only.contains(&target_idx) {
            vec![target_idx]
        } else {
            if target_idx != entry && !ancestors.contains(&entry) {
                return Err(GraphError::UnreachableTarget {
                    entry: self.name(entry).to_string(),
                    target: target.to_string(),
                });
            }
            let mut members = self.reachable(target_idx, Direction::Incoming, excluded);
            members.insert(target_idx);
            self.dependency_order(&members, entry)
        };

        let mut order: Vec<String> = prefix.iter().map(|&idx| self.name(idx).to_string()).collect();
        order.extend(
            main.into_iter()
                .filter(|idx| !prefix.contains(idx))
                .filter(|&idx| idx == target_idx || !self.dag[idx].attrs.refine)
                .map(|idx| self.name(idx).to_string()),
        );

        debug!("Calibration order for {}: {:?}", target, order);
        Ok(order)
    }

    /// Render the graph in Graphviz DOT format. Refinement nodes are dashed.
    pub fn to_dot(&self) -> String {
        let dot = Dot::with_attr_getters(
            &self.dag,
            &[Config::EdgeNoLabel],
            &|_, _| String::new(),
            &|_, (_, node)| {
                if node.attrs.refine {
                    "style=dashed".to_string()
                } else {
                    String::new()
                }
            },
        );
        format!("{dot}")
    }

    fn node_index(&self, name: &str) -> GraphResult<NodeIndex> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    fn name(&self, idx: NodeIndex) -> &str {
        &self.dag[idx].name
    }

    fn neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<&str> {
        let mut found: Vec<NodeIndex> = self.dag.neighbors_directed(idx, direction).collect();
        found.sort_unstable();
        found.dedup();
        found.into_iter().map(|n| self.name(n)).collect()
    }

    fn names_in_insertion_order(&self, set: &FxHashSet<NodeIndex>) -> Vec<&str> {
        let mut indices: Vec<NodeIndex> = set.iter().copied().collect();
        indices.sort_unstable();
        indices.into_iter().map(|idx| self.name(idx)).collect()
    }

    /// Nodes reachable from `start` following `direction`, skipping `excluded`.
    fn reachable(
        &self,
        start: NodeIndex,
        direction: Direction,
        excluded: Option<NodeIndex>,
    ) -> FxHashSet<NodeIndex> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            for next in self.dag.neighbors_directed(idx, direction) {
                if Some(next) == excluded {
                    continue;
                }
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        seen
    }

    fn shortest_path(&self, from: NodeIndex, to: NodeIndex) -> GraphResult<Vec<NodeIndex>> {
        petgraph::algo::astar(&self.dag, from, |n| n == to, |e| *e.weight(), |_| 0.0)
            .map(|(_, path)| path)
            .ok_or_else(|| GraphError::UnreachableTarget {
                entry: self.name(from).to_string(),
                target: self.name(to).to_string(),
            })
    }

    /// Kahn's algorithm restricted to `members`.
    fn dependency_order(&self, members: &FxHashSet<NodeIndex>, entry: NodeIndex) -> Vec<NodeIndex> {
        let mut indegree: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut priority: FxHashMap<NodeIndex, f64> = FxHashMap::default();

        for &idx in members {
            let incoming: Vec<f64> = self
                .dag
                .edges_directed(idx, Direction::Incoming)
                .filter(|e| members.contains(&e.source()))
                .map(|e| *e.weight())
                .collect();
            indegree.insert(idx, incoming.len());
            priority.insert(idx, incoming.into_iter().fold(f64::INFINITY, f64::min));
        }

        // Weights are validated finite and non-negative, so their bit
        // patterns order the same way as the values.
        let key = |idx: NodeIndex, priority: &FxHashMap<NodeIndex, f64>| {
            let weight = priority.get(&idx).copied().unwrap_or(0.0);
            let weight = if weight.is_finite() { weight } else { 0.0 };
            Reverse((idx != entry, weight.to_bits(), idx.index()))
        };

        let mut ready: BinaryHeap<_> = indegree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(&idx, _)| key(idx, &priority))
            .collect();

        let mut order = Vec::with_capacity(members.len());
        while let Some(Reverse((_, _, raw))) = ready.pop() {
            let idx = NodeIndex::new(raw);
            order.push(idx);
            for edge in self.dag.edges_directed(idx, Direction::Outgoing) {
                let next = edge.target();
                if let Some(deg) = indegree.get_mut(&next) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(key(next, &priority));
                    }
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for name in ["A", "B", "C", "D"] {
            graph.add_node(name, NodeAttributes::default()).unwrap();
        }
        graph.add_edge("A", "B").unwrap();
        graph.add_edge("B", "C").unwrap();
        graph.add_edge("A", "D").unwrap();
        graph.add_edge("D", "C").unwrap();
        graph.set_entry("A").unwrap();
        graph
    }

    #[test]
    fn test_diamond_order() {
        let graph = diamond();
        let order = graph.filtered_topological_order("C").unwrap();
        assert!(order == ["A", "B", "D", "C"] || order == ["A", "D", "B", "C"]);
    }

    #[test]
    fn test_weight_breaks_ties() {
        let mut graph = DependencyGraph::new();
        for name in ["A", "B", "C", "D"] {
            graph.add_node(name, NodeAttributes::default()).unwrap();
        }
        graph.add_weighted_edge("A", "B", 5.0).unwrap();
        graph.add_edge("B", "C").unwrap();
        graph.add_weighted_edge("A", "D", 0.5).unwrap();
        graph.add_edge("D", "C").unwrap();
        graph.set_entry("A").unwrap();

        assert_eq!(
            graph.filtered_topological_order("C").unwrap(),
            vec!["A", "D", "B", "C"]
        );
    }

    #[test]
    fn test_entry_is_target() {
        let graph = diamond();
        assert_eq!(graph.filtered_topological_order("A").unwrap(), vec!["A"]);
    }

    #[test]
    fn test_cycle_detection() {
        let mut graph = diamond();
        let result = graph.add_edge("C", "A");
        assert!(matches!(result, Err(GraphError::CycleDetected { .. })));
        assert!(matches!(
            graph.add_edge("B", "B"),
            Err(GraphError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_duplicate_and_unknown_nodes() {
        let mut graph = diamond();
        assert_eq!(
            graph.add_node("A", NodeAttributes::default()),
            Err(GraphError::DuplicateNode("A".to_string()))
        );
        assert_eq!(
            graph.filtered_topological_order("Z"),
            Err(GraphError::UnknownNode("Z".to_string()))
        );
        assert!(graph.add_edge("A", "Z").is_err());
    }

    #[test]
    fn test_invalid_weight() {
        let mut graph = diamond();
        assert!(matches!(
            graph.add_weighted_edge("B", "D", -1.0),
            Err(GraphError::InvalidWeight { .. })
        ));
        assert!(graph.add_weighted_edge("B", "D", f64::NAN).is_err());
    }

    #[test]
    fn test_unreachable_target() {
        let mut graph = diamond();
        graph.add_node("E", NodeAttributes::default()).unwrap();
        assert!(matches!(
            graph.filtered_topological_order("E"),
            Err(GraphError::UnreachableTarget { .. })
        ));
    }

    #[test]
    fn test_missing_entry() {
        let mut graph = DependencyGraph::new();
        graph.add_node("A", NodeAttributes::default()).unwrap();
        assert_eq!(
            graph.filtered_topological_order("A"),
            Err(GraphError::MissingEntry)
        );
    }

    #[test]
    fn test_refine_nodes_filtered_unless_target() {
        let mut graph = DependencyGraph::new();
        graph.add_node("A", NodeAttributes::default()).unwrap();
        graph.add_node("R", NodeAttributes::refine()).unwrap();
        graph.add_node("C", NodeAttributes::default()).unwrap();
        graph.add_edge("A", "R").unwrap();
        graph.add_edge("R", "C").unwrap();
        graph.set_entry("A").unwrap();

        assert_eq!(graph.filtered_topological_order("C").unwrap(), vec!["A", "C"]);
        assert_eq!(graph.filtered_topological_order("R").unwrap(), vec!["A", "R"]);
    }

    #[test]
    fn test_auxiliary_prefix() {
        let mut graph = DependencyGraph::new();
        for name in ["A", "B", "X", "C"] {
            graph.add_node(name, NodeAttributes::default()).unwrap();
        }
        graph.add_edge("A", "B").unwrap();
        graph.add_edge("A", "X").unwrap();
        graph.add_edge("B", "C").unwrap();
        graph.add_edge("X", "C").unwrap();
        graph.set_entry("A").unwrap();
        graph.set_auxiliary("X").unwrap();

        let order = graph.filtered_topological_order("C").unwrap();
        assert_eq!(order, vec!["A", "X", "B", "C"]);

        // The graph itself is untouched by the detour.
        assert_eq!(graph.filtered_topological_order("C").unwrap(), order);
        assert_eq!(graph.dependencies("C").unwrap(), vec!["B", "X"]);
    }

    #[test]
    fn test_entry_only_target() {
        let mut graph = diamond();
        graph.add_node("P", NodeAttributes::default()).unwrap();
        graph.mark_entry_only("P").unwrap();
        assert_eq!(graph.filtered_topological_order("P").unwrap(), vec!["P"]);
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let graph = diamond();
        assert_eq!(graph.ancestors("C").unwrap(), vec!["A", "B", "D"]);
        assert_eq!(graph.descendants("A").unwrap(), vec!["B", "C", "D"]);
        assert_eq!(graph.dependents("A").unwrap(), vec!["B", "D"]);
        assert!(graph.ancestors("A").unwrap().is_empty());
    }

    #[test]
    fn test_dot_output() {
        let mut graph = diamond();
        graph.add_node("R", NodeAttributes::refine()).unwrap();
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("style=dashed"));
        assert!(dot.contains("->"));
    }
}
