//! Graph command implementation.

use anyhow::Result;
use console::style;

use qcal_graph::DependencyGraph;

/// Execute the graph command.
pub fn execute(dot: bool) -> Result<()> {
    let graph = DependencyGraph::calibration_graph()?;

    if dot {
        print!("{}", graph.to_dot());
        return Ok(());
    }

    println!(
        "{} {} nodes, entry {}",
        style("→").cyan().bold(),
        graph.len(),
        style(graph.entry().unwrap_or("-")).green()
    );
    for name in graph.node_names() {
        let dependents = graph.dependents(name)?;
        if dependents.is_empty() {
            continue;
        }
        println!("  {} -> {}", style(name).bold(), dependents.join(", "));
    }
    Ok(())
}
