//! Status command implementation.
//!
//! Shows what the calibration store holds for a node.

use anyhow::Result;
use console::style;

use qcal_adapter_sim::SimulatedInstrument;

use super::common::{Paths, create_supervisor};

/// Execute the status command.
pub async fn execute(paths: &Paths, node: &str) -> Result<()> {
    let config = paths.load_config()?;
    let supervisor = create_supervisor(paths, config, SimulatedInstrument::new())?;
    let inspection = supervisor.inspect_node(node).await?;

    let overall = if inspection.is_calibrated() {
        style("calibrated").green().bold()
    } else {
        style("not calibrated").yellow().bold()
    };
    println!("{} {}: {}\n", style("→").cyan().bold(), style(node).bold(), overall);

    for (component, status) in &inspection.statuses {
        let status_styled = if status.is_calibrated() {
            style(status.as_str()).green()
        } else {
            style(status.as_str()).yellow()
        };
        println!("  {:<10} {}", component, status_styled);
    }

    if !inspection.fields.is_empty() {
        println!(
            "\n  {:<10}  {:<28}  {:<16}  {}",
            style("COMPONENT").bold(),
            style("FIELD").bold(),
            style("VALUE").bold(),
            style("BACKUP").bold()
        );
        for field in &inspection.fields {
            let value = field
                .value
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string);
            let backup = field
                .backup
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string);
            println!(
                "  {:<10}  {:<28}  {:<16}  {}",
                field.component,
                field.field,
                value,
                style(backup).dim()
            );
        }
    }
    Ok(())
}
