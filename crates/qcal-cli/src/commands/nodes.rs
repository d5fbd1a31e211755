//! Nodes command implementation.

use anyhow::Result;
use console::style;

use qcal_graph::DependencyGraph;
use qcal_node::NodeRegistry;

/// Execute the nodes command.
pub fn execute() -> Result<()> {
    let registry = NodeRegistry::with_builtin_nodes();
    let graph = DependencyGraph::calibration_graph()?;

    println!("{} Available calibration nodes:\n", style("qcal").cyan().bold());
    for name in registry.available_nodes() {
        let refine = graph.is_refine(name).unwrap_or(false);
        let deps = graph.dependencies(name).map(|d| d.join(", ")).unwrap_or_default();
        println!(
            "  {} {}{}",
            style("●").green(),
            style(name).bold(),
            if refine { " (refinement)" } else { "" }
        );
        if !deps.is_empty() {
            println!("    after: {}", style(deps).dim());
        }
    }
    Ok(())
}
