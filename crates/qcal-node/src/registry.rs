//! Node registry for constructing calibration nodes by name.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::descriptor::{CalibrationNode, NodeContext};
use crate::error::{NodeError, NodeResult};

/// Factory function type for calibration nodes.
type NodeFactory = Box<dyn Fn(&NodeContext) -> NodeResult<Box<dyn CalibrationNode>> + Send + Sync>;

/// Central registry of calibration node factories.
pub struct NodeRegistry {
    factories: FxHashMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Create a registry with every builtin node.
    pub fn with_builtin_nodes() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_all(&mut registry);
        registry
    }

    /// Register a node factory, replacing any factory with the same name.
    pub fn register_factory(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&NodeContext) -> NodeResult<Box<dyn CalibrationNode>> + Send + Sync + 'static,
    ) {
        let name = name.into();
        debug!("Registering calibration node: {}", name);
        self.factories.insert(name, Box::new(factory));
    }

    /// Build a node and validate its samplespaces.
    pub fn create(&self, name: &str, ctx: &NodeContext) -> NodeResult<Box<dyn CalibrationNode>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| NodeError::UnknownNode(name.to_string()))?;
        let node = factory(ctx)?;
        node.validate()?;
        Ok(node)
    }

    /// Get the names of all registered nodes, sorted.
    pub fn available_nodes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check if a node is registered.
    pub fn has_node(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::NodeDescriptor;
    use qcal_types::Component;

    struct Probe(NodeDescriptor);

    impl CalibrationNode for Probe {
        fn descriptor(&self) -> &NodeDescriptor {
            &self.0
        }
    }

    #[test]
    fn test_registry_create() {
        let mut registry = NodeRegistry::new();
        registry.register_factory("probe", |ctx| {
            Ok(Box::new(Probe(NodeDescriptor::new("probe", ctx.qubits.clone()))))
        });

        assert!(registry.has_node("probe"));
        assert_eq!(registry.available_nodes(), vec!["probe"]);

        let ctx = NodeContext::new(vec![Component::qubit("q1")], vec![]);
        let node = registry.create("probe", &ctx).unwrap();
        assert_eq!(node.name(), "probe");
    }

    #[test]
    fn test_registry_unknown_node() {
        let registry = NodeRegistry::new();
        let result = registry.create("nope", &NodeContext::default());
        assert!(matches!(result, Err(NodeError::UnknownNode(name)) if name == "nope"));
    }

    #[test]
    fn test_registry_rejects_nodes_without_components() {
        let mut registry = NodeRegistry::new();
        registry.register_factory("empty", |_| {
            Ok(Box::new(Probe(NodeDescriptor::new("empty", vec![]))))
        });
        assert!(matches!(
            registry.create("empty", &NodeContext::default()),
            Err(NodeError::Configuration(_))
        ));
    }
}
