//! Outcomes of calibration runs and node inspections.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use qcal_types::{CalibrationStatus, Component, ParamValue};

/// What happened to one node during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Every target was already calibrated.
    Skipped,
    Calibrated,
    /// Analysis failed for some units.
    Incomplete,
    /// The sweep failed before analysis.
    Failed,
}

impl fmt::Display for NodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Skipped => "skipped",
            Self::Calibrated => "calibrated",
            Self::Incomplete => "incomplete",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// An analysis unit that did not produce a complete result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub component: Component,
    pub reason: String,
}

/// Result of visiting one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub node: String,
    pub outcome: NodeOutcome,
    /// Components marked calibrated by this visit.
    pub calibrated: Vec<Component>,
    pub failures: Vec<UnitFailure>,
    /// Error that aborted the sweep, for failed nodes.
    pub error: Option<String>,
    pub measurements: usize,
    pub backup_available: bool,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl NodeReport {
    pub(crate) fn new(node: impl Into<String>, outcome: NodeOutcome) -> Self {
        Self {
            node: node.into(),
            outcome,
            calibrated: Vec::new(),
            failures: Vec::new(),
            error: None,
            measurements: 0,
            backup_available: false,
            elapsed: Duration::ZERO,
        }
    }
}

/// Result of a full `calibrate_system` run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub nodes: Vec<NodeReport>,
}

impl CalibrationReport {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            started_at: Utc::now(),
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, report: NodeReport) {
        self.nodes.push(report);
    }

    pub fn node(&self, name: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|r| r.node == name)
    }

    pub fn outcome(&self, name: &str) -> Option<NodeOutcome> {
        self.node(name).map(|r| r.outcome)
    }

    /// Total measure calls issued across the run.
    pub fn measurements(&self) -> usize {
        self.nodes.iter().map(|r| r.measurements).sum()
    }

    /// Check if no node failed or stayed incomplete.
    pub fn is_success(&self) -> bool {
        self.nodes
            .iter()
            .all(|r| matches!(r.outcome, NodeOutcome::Skipped | NodeOutcome::Calibrated))
    }

    /// Count nodes with the given outcome.
    pub fn count(&self, outcome: NodeOutcome) -> usize {
        self.nodes.iter().filter(|r| r.outcome == outcome).count()
    }
}

/// Stored value and backup of one declared field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInspection {
    pub component: Component,
    pub field: String,
    pub value: Option<ParamValue>,
    pub backup: Option<ParamValue>,
}

/// Stored state of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInspection {
    pub node: String,
    pub statuses: Vec<(Component, CalibrationStatus)>,
    pub fields: Vec<FieldInspection>,
}

impl NodeInspection {
    /// Check if every target component is calibrated.
    pub fn is_calibrated(&self) -> bool {
        !self.statuses.is_empty() && self.statuses.iter().all(|(_, s)| s.is_calibrated())
    }
}
