//! qcal command-line interface.
//!
//! ```text
//! qcal calibrate              calibrate the configured target node
//! qcal order [--target t1]    print the order a run would follow
//! qcal graph [--dot]          print the dependency graph
//! qcal nodes                  list available calibration nodes
//! qcal status <node>          show stored statuses and parameters
//! qcal reset <node>           forget a node's calibration
//! qcal restore <node>         restore backed-up parameters
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{calibrate, graph, nodes, order, reset, restore, status};

/// qcal - calibration graph orchestrator for superconducting qubits
#[derive(Parser, Debug)]
#[command(name = "qcal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Run configuration (defaults to <state dir>/calibration.yaml)
    #[arg(short, long, env = "QCAL_CONFIG", global = true)]
    config: Option<String>,

    /// Directory holding the calibration database
    #[arg(long, env = "QCAL_STATE_DIR", global = true)]
    state_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Calibrate the target node and everything it depends on
    Calibrate {
        /// Target node, overriding the config
        #[arg(short, long)]
        target: Option<String>,

        /// Record failed nodes and keep going
        #[arg(long)]
        continue_on_failure: bool,

        /// Noise amplitude of the simulated instrument
        #[arg(long, default_value = "0.0")]
        noise: f64,

        /// Seed for the simulated noise
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the order in which nodes would be calibrated
    Order {
        /// Target node, overriding the config
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Print the dependency graph
    Graph {
        /// Emit Graphviz DOT
        #[arg(long)]
        dot: bool,
    },

    /// List available calibration nodes
    Nodes,

    /// Show stored statuses and parameters of a node
    Status {
        node: String,
    },

    /// Mark a node as not calibrated
    Reset {
        node: String,

        /// Also reset every node depending on it
        #[arg(long)]
        dependents: bool,
    },

    /// Restore a node's parameters from their backups
    Restore {
        node: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let paths = commands::common::Paths::resolve(cli.config.as_deref(), cli.state_dir.as_deref());

    let result = match cli.command {
        Commands::Calibrate {
            target,
            continue_on_failure,
            noise,
            seed,
            json,
        } => {
            calibrate::execute(
                &paths,
                target.as_deref(),
                continue_on_failure,
                noise,
                seed,
                json,
            )
            .await
        }
        Commands::Order { target } => order::execute(&paths, target.as_deref()),
        Commands::Graph { dot } => graph::execute(dot),
        Commands::Nodes => nodes::execute(),
        Commands::Status { node } => status::execute(&paths, &node).await,
        Commands::Reset { node, dependents } => reset::execute(&paths, &node, dependents).await,
        Commands::Restore { node } => restore::execute(&paths, &node).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_calibrate() {
        let cli = Cli::try_parse_from([
            "qcal", "-vv", "calibrate", "--target", "t1", "--continue-on-failure", "--noise", "0.01",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Calibrate {
                target,
                continue_on_failure,
                noise,
                seed,
                json,
            } => {
                assert_eq!(target.as_deref(), Some("t1"));
                assert!(continue_on_failure);
                assert_eq!(noise, 0.01);
                assert_eq!(seed, 0);
                assert!(!json);
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "qcal", "reset", "t1", "--dependents", "--config", "run.yaml", "--state-dir", "/tmp/q",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("run.yaml"));
        assert_eq!(cli.state_dir.as_deref(), Some("/tmp/q"));
        assert!(matches!(
            cli.command,
            Commands::Reset { ref node, dependents: true } if node == "t1"
        ));
    }

    #[test]
    fn test_node_argument_required() {
        assert!(Cli::try_parse_from(["qcal", "status"]).is_err());
        assert!(Cli::try_parse_from(["qcal", "restore"]).is_err());
        assert!(Cli::try_parse_from(["qcal"]).is_err());
    }
}
