//! Run configuration.
//!
//! Loaded from YAML, then optionally overridden by environment variables:
//!
//! - `QCAL_TARGET_NODE`: node to calibrate up to
//! - `QCAL_MEASUREMENT_TIMEOUT`: seconds a single measurement may take
//! - `QCAL_CONTINUE_ON_FAILURE`: `true` to record failed nodes and carry on

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use qcal_node::{NodeContext, ParameterSnapshot};
use qcal_sweep::{DEFAULT_MEASUREMENT_TIMEOUT, DEFAULT_PROGRESS_INTERVAL, ExecutorConfig};
use qcal_types::{Component, ComponentKind};

use crate::error::{SupervisorError, SupervisorResult};

/// Free-form options passed to a node factory.
pub type NodeExtras = serde_json::Map<String, serde_json::Value>;

/// Settings of one calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Node to calibrate, together with everything it depends on.
    pub target_node: String,

    pub qubits: Vec<Component>,

    #[serde(default)]
    pub couplers: Vec<Component>,

    /// Seconds a single measurement may take.
    #[serde(default = "default_measurement_timeout")]
    pub measurement_timeout: f64,

    /// Seconds between progress reports.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: f64,

    #[serde(default)]
    pub continue_on_failure: bool,

    /// Per-node factory options, keyed by node name.
    #[serde(default)]
    pub node_extras: BTreeMap<String, NodeExtras>,
}

fn default_measurement_timeout() -> f64 {
    DEFAULT_MEASUREMENT_TIMEOUT.as_secs_f64()
}

fn default_progress_interval() -> f64 {
    DEFAULT_PROGRESS_INTERVAL.as_secs_f64()
}

impl SupervisorConfig {
    /// Config with default timings.
    pub fn new(target_node: impl Into<String>, qubits: Vec<Component>, couplers: Vec<Component>) -> Self {
        Self {
            target_node: target_node.into(),
            qubits,
            couplers,
            measurement_timeout: default_measurement_timeout(),
            progress_interval: default_progress_interval(),
            continue_on_failure: false,
            node_extras: BTreeMap::new(),
        }
    }

    /// Load and validate a YAML config file.
    pub fn from_file(path: impl AsRef<Path>) -> SupervisorResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SupervisorError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> SupervisorResult<Self> {
        let config: Self = serde_yaml_ng::from_str(contents)
            .map_err(|e| SupervisorError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `QCAL_*` environment overrides.
    pub fn merge_env(self) -> SupervisorResult<Self> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> SupervisorResult<Self> {
        if let Some(target) = var("QCAL_TARGET_NODE") {
            self.target_node = target;
        }
        if let Some(timeout) = var("QCAL_MEASUREMENT_TIMEOUT") {
            self.measurement_timeout = timeout.parse().map_err(|_| {
                SupervisorError::Config(format!("QCAL_MEASUREMENT_TIMEOUT is not a number: {timeout}"))
            })?;
        }
        if let Some(flag) = var("QCAL_CONTINUE_ON_FAILURE") {
            self.continue_on_failure = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        self.validate()?;
        Ok(self)
    }

    /// Check the config for consistency.
    pub fn validate(&self) -> SupervisorResult<()> {
        if self.target_node.is_empty() {
            return Err(SupervisorError::Config("target_node must not be empty".to_string()));
        }
        if self.qubits.is_empty() {
            return Err(SupervisorError::Config("at least one qubit is required".to_string()));
        }
        for (field, value) in [
            ("measurement_timeout", self.measurement_timeout),
            ("progress_interval", self.progress_interval),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SupervisorError::Config(format!(
                    "{field} must be a positive number of seconds, got {value}"
                )));
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for qubit in &self.qubits {
            if qubit.kind() != ComponentKind::Qubit {
                return Err(SupervisorError::Config(format!("{qubit} is not a qubit")));
            }
            if !seen.insert(qubit) {
                return Err(SupervisorError::Config(format!("qubit {qubit} listed twice")));
            }
        }
        for coupler in &self.couplers {
            if coupler.kind() != ComponentKind::Coupler {
                return Err(SupervisorError::Config(format!("{coupler} is not a coupler")));
            }
            if !seen.insert(coupler) {
                return Err(SupervisorError::Config(format!("coupler {coupler} listed twice")));
            }
            for qubit in coupler.qubits() {
                if !self.qubits.contains(&qubit) {
                    warn!("Coupler {} connects unlisted qubit {}", coupler, qubit);
                }
            }
        }
        Ok(())
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            measurement_timeout: Duration::try_from_secs_f64(self.measurement_timeout)
                .unwrap_or(DEFAULT_MEASUREMENT_TIMEOUT),
            progress_interval: Duration::try_from_secs_f64(self.progress_interval)
                .unwrap_or(DEFAULT_PROGRESS_INTERVAL),
        }
    }

    /// Every component whose parameters a node may read.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.qubits.iter().chain(&self.couplers)
    }

    /// Factory context for `node`.
    pub fn node_context(&self, node: &str, parameters: ParameterSnapshot) -> NodeContext {
        NodeContext::new(self.qubits.clone(), self.couplers.clone())
            .with_parameters(parameters)
            .with_extra(self.node_extras.get(node).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
target_node: t1
qubits: [q1, q2]
couplers: [q1_q2]
measurement_timeout: 30
node_extras:
  ro_amplitude_two_state_optimization:
    loops: 4
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config = SupervisorConfig::from_yaml(YAML).unwrap();
        assert_eq!(config.target_node, "t1");
        assert_eq!(config.qubits, Component::parse_all(["q1", "q2"]).unwrap());
        assert_eq!(config.couplers, vec![Component::parse("q1_q2").unwrap()]);
        assert!(!config.continue_on_failure);

        let exec = config.executor_config();
        assert_eq!(exec.measurement_timeout, Duration::from_secs(30));
        assert_eq!(exec.progress_interval, DEFAULT_PROGRESS_INTERVAL);

        let ctx = config.node_context("ro_amplitude_two_state_optimization", ParameterSnapshot::new());
        assert_eq!(ctx.extra_usize("loops", 8).unwrap(), 4);
        let ctx = config.node_context("t1", ParameterSnapshot::new());
        assert!(ctx.extra.is_empty());
    }

    #[test]
    fn test_invalid_configs() {
        let cases = [
            "target_node: t1\nqubits: []\n",
            "target_node: t1\nqubits: [q1, q1]\n",
            "target_node: t1\nqubits: [q1_q2]\n",
            "target_node: t1\nqubits: [q1]\ncouplers: [q2]\n",
            "target_node: t1\nqubits: [q1]\nmeasurement_timeout: 0\n",
            "target_node: ''\nqubits: [q1]\n",
            "qubits: [q1]\n",
            "target_node: t1\nqubits: [q1__q2]\n",
        ];
        for yaml in cases {
            assert!(
                matches!(SupervisorConfig::from_yaml(yaml), Err(SupervisorError::Config(_))),
                "accepted: {yaml}"
            );
        }
    }

    #[test]
    fn test_env_overrides() {
        let config = SupervisorConfig::from_yaml(YAML).unwrap();
        let vars = |key: &str| match key {
            "QCAL_TARGET_NODE" => Some("rabi_oscillations".to_string()),
            "QCAL_CONTINUE_ON_FAILURE" => Some("true".to_string()),
            _ => None,
        };
        let merged = config.clone().merge_vars(vars).unwrap();
        assert_eq!(merged.target_node, "rabi_oscillations");
        assert!(merged.continue_on_failure);
        assert_eq!(merged.measurement_timeout, 30.0);

        let bad = |key: &str| (key == "QCAL_MEASUREMENT_TIMEOUT").then(|| "soon".to_string());
        assert!(config.merge_vars(bad).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(&path, YAML).unwrap();
        assert_eq!(SupervisorConfig::from_file(&path).unwrap().qubits.len(), 2);
        assert!(SupervisorConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
