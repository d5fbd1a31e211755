//! Runs the `qcal` binary against a temporary state directory.

use std::path::Path;
use std::process::{Command, Output};

const CONFIG: &str = "target_node: rabi_oscillations\nqubits: [q1, q2]\n";

fn qcal(state_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qcal"))
        .args(args)
        .env("QCAL_STATE_DIR", state_dir)
        .env_remove("QCAL_CONFIG")
        .env_remove("QCAL_TARGET_NODE")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run qcal")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn state_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("calibration.yaml"), CONFIG).unwrap();
    dir
}

#[test]
fn test_nodes_lists_builtins() {
    let dir = state_dir();
    let output = qcal(dir.path(), &["nodes"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("resonator_spectroscopy"));
    assert!(out.contains("cz_calibration"));
    assert!(out.contains("motzoi_parameter (refinement)"));
}

#[test]
fn test_order_uses_config_target() {
    let dir = state_dir();
    let output = qcal(dir.path(), &["order"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("1. resonator_spectroscopy"));
    assert!(out.contains("3. rabi_oscillations"));

    let output = qcal(dir.path(), &["order", "--target", "punchout"]);
    assert!(stdout(&output).contains("1. punchout"));
}

#[test]
fn test_graph_dot() {
    let dir = state_dir();
    let output = qcal(dir.path(), &["graph", "--dot"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("digraph"));
}

#[test]
fn test_calibrate_then_status() {
    let dir = state_dir();

    let output = qcal(dir.path(), &["calibrate"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("calibration.db").exists());

    let output = qcal(dir.path(), &["calibrate", "--json"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let nodes = report["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert!(nodes.iter().all(|n| n["outcome"] == "skipped"));

    let output = qcal(dir.path(), &["status", "rabi_oscillations"]);
    let out = stdout(&output);
    assert!(out.contains("rabi_oscillations: calibrated"));
    assert!(out.contains("rxy:amp180"));

    let output = qcal(dir.path(), &["reset", "rabi_oscillations"]);
    assert!(output.status.success());
    let output = qcal(dir.path(), &["status", "rabi_oscillations"]);
    assert!(stdout(&output).contains("not calibrated"));
}

#[test]
fn test_unknown_node_fails() {
    let dir = state_dir();
    let output = qcal(dir.path(), &["status", "no_such_node"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no_such_node"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = qcal(dir.path(), &["calibrate"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config not found"));
}
