//! Reset command implementation.

use anyhow::Result;
use console::style;

use qcal_adapter_sim::SimulatedInstrument;

use super::common::{Paths, create_supervisor};

/// Execute the reset command.
pub async fn execute(paths: &Paths, node: &str, dependents: bool) -> Result<()> {
    let config = paths.load_config()?;
    let supervisor = create_supervisor(paths, config, SimulatedInstrument::new())?;
    let reset = supervisor.reset_node(node, dependents).await?;

    println!("{} Reset {} node(s):", style("✓").green().bold(), reset.len());
    for name in &reset {
        println!("  {name}");
    }
    Ok(())
}
