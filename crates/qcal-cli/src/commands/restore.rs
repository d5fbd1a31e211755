//! Restore command implementation.

use anyhow::Result;
use console::style;

use qcal_adapter_sim::SimulatedInstrument;

use super::common::{Paths, create_supervisor};

/// Execute the restore command.
pub async fn execute(paths: &Paths, node: &str) -> Result<()> {
    let config = paths.load_config()?;
    let supervisor = create_supervisor(paths, config, SimulatedInstrument::new())?;
    let restored = supervisor.restore_backups(node).await?;

    if restored.is_empty() {
        println!("No backups found for {node}.");
        return Ok(());
    }
    println!(
        "{} Restored {} field(s) of {}:",
        style("✓").green().bold(),
        restored.len(),
        style(node).bold()
    );
    for (component, field) in &restored {
        println!("  {component}: {field}");
    }
    Ok(())
}
