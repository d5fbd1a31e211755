//! Calibrate command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qcal_adapter_sim::SimulatedInstrument;
use qcal_supervisor::{CalibrationReport, NodeOutcome};
use qcal_sweep::ProgressSink;

use super::common::{Paths, create_supervisor};

/// Shows running measurements on a terminal spinner.
struct SpinnerProgress {
    spinner: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }
}

impl ProgressSink for SpinnerProgress {
    fn started(&self, node: &str, label: &str, _estimate: Option<Duration>) {
        self.spinner.set_message(format!("{node}: measuring {label}"));
    }

    fn tick(&self, node: &str, elapsed: Duration, estimate: Option<Duration>) {
        let message = match estimate {
            Some(total) if !total.is_zero() => {
                let pct = (elapsed.as_secs_f64() / total.as_secs_f64() * 100.0).min(100.0);
                format!("{node}: {pct:.0}% ({elapsed:.1?} of ~{total:.1?})")
            }
            _ => format!("{node}: {elapsed:.1?}"),
        };
        self.spinner.set_message(message);
    }

    fn finished(&self, node: &str, elapsed: Duration) {
        self.spinner
            .set_message(format!("{node}: measured in {elapsed:.1?}"));
    }
}

/// Execute the calibrate command.
pub async fn execute(
    paths: &Paths,
    target: Option<&str>,
    continue_on_failure: bool,
    noise: f64,
    seed: u64,
    json: bool,
) -> Result<()> {
    let mut config = paths.load_config()?;
    if let Some(target) = target {
        config.target_node = target.to_string();
    }
    config.continue_on_failure |= continue_on_failure;
    config.validate()?;

    if !json {
        println!(
            "{} Calibrating {} on {} qubit(s), {} coupler(s)",
            style("→").cyan().bold(),
            style(&config.target_node).green(),
            config.qubits.len(),
            config.couplers.len()
        );
    }

    let instrument = SimulatedInstrument::new().with_noise(noise, seed);
    let progress = Arc::new(SpinnerProgress::new());
    let supervisor = create_supervisor(paths, config, instrument)?.with_progress(progress.clone());

    let result = supervisor.calibrate_system().await;
    progress.spinner.finish_and_clear();
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.is_success() {
        anyhow::bail!("calibration of {} did not complete", report.target);
    }
    Ok(())
}

fn print_report(report: &CalibrationReport) {
    for node in &report.nodes {
        let outcome = node.outcome.to_string();
        let outcome = match node.outcome {
            NodeOutcome::Calibrated => style(outcome).green(),
            NodeOutcome::Skipped => style(outcome).dim(),
            NodeOutcome::Incomplete => style(outcome).yellow(),
            NodeOutcome::Failed => style(outcome).red(),
        };
        println!("  {:<40} {:<11} {:>8.2?}", node.node, outcome, node.elapsed);
        for failure in &node.failures {
            println!("    {} {}: {}", style("✗").red(), failure.component, failure.reason);
        }
        if let Some(error) = &node.error {
            println!("    {} {}", style("✗").red(), error);
        }
    }

    println!(
        "\n{} {} node(s) calibrated, {} skipped, {} measurement(s)",
        style("✓").green().bold(),
        report.count(NodeOutcome::Calibrated),
        report.count(NodeOutcome::Skipped),
        report.measurements()
    );
}
