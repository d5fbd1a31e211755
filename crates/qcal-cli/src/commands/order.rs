//! Order command implementation.

use anyhow::Result;
use console::style;

use qcal_graph::DependencyGraph;

use super::common::Paths;

/// Execute the order command.
pub fn execute(paths: &Paths, target: Option<&str>) -> Result<()> {
    let target = match target {
        Some(target) => target.to_string(),
        None => paths.load_config()?.target_node,
    };

    let graph = DependencyGraph::calibration_graph()?;
    let order = graph.filtered_topological_order(&target)?;

    println!(
        "{} Calibration order for {}:\n",
        style("→").cyan().bold(),
        style(&target).green()
    );
    for (i, node) in order.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, node);
    }
    Ok(())
}
