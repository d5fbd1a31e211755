//! Drives calibration nodes through the dependency graph.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use qcal_graph::DependencyGraph;
use qcal_node::{CalibrationNode, NodeDescriptor, NodeRegistry, ParameterSnapshot};
use qcal_store::{CalibrationStore, backup_key};
use qcal_sweep::{
    AnalysisContext, Analyzer, Compiler, InstrumentExecutor, ProgressSink, SweepError,
    SweepExecutor, SweepOutcome,
};
use qcal_types::{CalibrationStatus, Component};

use crate::config::SupervisorConfig;
use crate::error::{SupervisorError, SupervisorResult};
use crate::report::{
    CalibrationReport, FieldInspection, NodeInspection, NodeOutcome, NodeReport, UnitFailure,
};

/// Calibrates a target node and everything it depends on.
///
/// Nodes run strictly one after another in the graph's filtered
/// topological order. The store is the only state carried between nodes;
/// a node whose targets are all `calibrated` is skipped, which makes a
/// repeated run free of measurements.
pub struct CalibrationSupervisor {
    config: SupervisorConfig,
    graph: DependencyGraph,
    registry: NodeRegistry,
    store: Arc<dyn CalibrationStore>,
    executor: SweepExecutor,
    analyzer: Arc<dyn Analyzer>,
}

impl CalibrationSupervisor {
    /// Create a supervisor over the builtin graph and nodes.
    pub fn new(
        config: SupervisorConfig,
        store: Arc<dyn CalibrationStore>,
        compiler: Arc<dyn Compiler>,
        instrument: Arc<dyn InstrumentExecutor>,
        analyzer: Arc<dyn Analyzer>,
    ) -> SupervisorResult<Self> {
        config.validate()?;
        let executor = SweepExecutor::new(compiler, instrument)
            .with_analyzer(analyzer.clone())
            .with_config(config.executor_config());

        Ok(Self {
            config,
            graph: DependencyGraph::calibration_graph()?,
            registry: NodeRegistry::with_builtin_nodes(),
            store,
            executor,
            analyzer,
        })
    }

    pub fn with_graph(mut self, graph: DependencyGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_registry(mut self, registry: NodeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.executor = self.executor.with_progress(progress);
        self
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Nodes that `calibrate_system` would visit, in order.
    pub fn calibration_order(&self) -> SupervisorResult<Vec<String>> {
        Ok(self.graph.filtered_topological_order(&self.config.target_node)?)
    }

    /// Calibrate the configured target node and its dependencies.
    ///
    /// Stops at the first node that fails or stays incomplete unless
    /// `continue_on_failure` is set. Store errors always stop the run.
    #[instrument(skip_all, fields(target = %self.config.target_node))]
    pub async fn calibrate_system(&self) -> SupervisorResult<CalibrationReport> {
        let order = self.calibration_order()?;
        info!("Calibration order: {}", order.join(" -> "));

        let mut report = CalibrationReport::new(&self.config.target_node);
        for name in &order {
            report.push(self.calibrate_node(name).await?);
        }

        info!(
            "Calibration of {} finished: {} calibrated, {} skipped, {} incomplete, {} failed",
            self.config.target_node,
            report.count(NodeOutcome::Calibrated),
            report.count(NodeOutcome::Skipped),
            report.count(NodeOutcome::Incomplete),
            report.count(NodeOutcome::Failed),
        );
        Ok(report)
    }

    /// Calibrate a single node, ignoring its dependencies.
    pub async fn calibrate_node(&self, name: &str) -> SupervisorResult<NodeReport> {
        let started = Instant::now();
        let node = self.build_node(name).await?;
        let d = node.descriptor();

        for default in &d.default_parameters {
            if self
                .store
                .set_default(&default.component, &default.field, &default.value)
                .await?
            {
                debug!("{}: default {} = {} on {}", name, default.field, default.value, default.component);
            }
        }

        let targets = d.status_components();
        if self.all_calibrated(name, &targets).await? {
            info!("{} already calibrated, skipping", name);
            return Ok(NodeReport::new(name, NodeOutcome::Skipped));
        }

        info!("Calibrating {} on {}", name, join(&targets));
        let backup_available = if d.backup_enabled {
            self.backup(d).await?
        } else {
            false
        };

        let outcome = match self.executor.execute(node.as_ref()).await {
            Ok(outcome) => outcome,
            Err(source) if self.config.continue_on_failure && is_recoverable(&source) => {
                warn!("{} failed: {}", name, source);
                let mut report = NodeReport::new(name, NodeOutcome::Failed);
                report.error = Some(source.to_string());
                report.backup_available = backup_available;
                report.elapsed = started.elapsed();
                return Ok(report);
            }
            Err(source) => {
                return Err(SupervisorError::NodeAborted {
                    node: name.to_string(),
                    components: targets,
                    backup_available,
                    source,
                });
            }
        };

        let mut report = self.commit(d, &outcome).await?;
        report.backup_available = backup_available;
        report.elapsed = started.elapsed();

        if report.outcome == NodeOutcome::Incomplete && !self.config.continue_on_failure {
            return Err(SupervisorError::NodeIncomplete {
                node: name.to_string(),
                failed: report.failures.into_iter().map(|f| f.component).collect(),
                backup_available,
            });
        }
        Ok(report)
    }

    /// Stored statuses, field values and backups of a node.
    pub async fn inspect_node(&self, name: &str) -> SupervisorResult<NodeInspection> {
        let node = self.build_node(name).await?;
        let d = node.descriptor();

        let mut statuses: Vec<(Component, CalibrationStatus)> = Vec::new();
        for component in d.status_components() {
            if statuses.iter().any(|(c, _)| *c == component) {
                continue;
            }
            let status = self.store.get_status(&component, name).await?;
            statuses.push((component, status));
        }

        let mut fields = Vec::new();
        for unit in d.analysis_units() {
            for field in &d.redis_fields {
                fields.push(FieldInspection {
                    value: self.store.get(&unit.component, field).await?,
                    backup: self.store.get(&unit.component, &backup_key(field)).await?,
                    component: unit.component.clone(),
                    field: field.clone(),
                });
            }
        }

        Ok(NodeInspection {
            node: name.to_string(),
            statuses,
            fields,
        })
    }

    /// Forget the status of a node, and optionally of everything depending
    /// on it, so the next run recalibrates them.
    ///
    /// Returns the nodes reset.
    pub async fn reset_node(&self, name: &str, with_dependents: bool) -> SupervisorResult<Vec<String>> {
        let mut nodes = vec![name.to_string()];
        if with_dependents {
            nodes.extend(self.graph.descendants(name)?.into_iter().map(str::to_string));
        } else if !self.graph.contains(name) {
            return Err(qcal_graph::GraphError::UnknownNode(name.to_string()).into());
        }

        let components: BTreeSet<Component> = self
            .config
            .components()
            .flat_map(|c| if c.is_coupler() { c.qubits() } else { vec![c.clone()] })
            .collect();

        for node in &nodes {
            for component in &components {
                self.store.clear_status(component, node).await?;
            }
            info!("Reset {}", node);
        }
        Ok(nodes)
    }

    /// Copy every backed-up field of a node back into its live value.
    ///
    /// Returns the restored `(component, field)` pairs.
    pub async fn restore_backups(&self, name: &str) -> SupervisorResult<Vec<(Component, String)>> {
        let node = self.build_node(name).await?;
        let d = node.descriptor();

        let mut restored = Vec::new();
        for unit in d.analysis_units() {
            for field in &d.redis_fields {
                if self.store.restore_backup(&unit.component, field).await? {
                    info!("Restored {} on {}", field, unit.component);
                    restored.push((unit.component.clone(), field.clone()));
                }
            }
        }
        Ok(restored)
    }

    async fn build_node(&self, name: &str) -> SupervisorResult<Box<dyn CalibrationNode>> {
        if !self.graph.contains(name) {
            return Err(qcal_graph::GraphError::UnknownNode(name.to_string()).into());
        }
        let snapshot = self.snapshot().await?;
        let ctx = self.config.node_context(name, snapshot);
        Ok(self.registry.create(name, &ctx)?)
    }

    async fn snapshot(&self) -> SupervisorResult<ParameterSnapshot> {
        let mut snapshot = ParameterSnapshot::new();
        for component in self.config.components() {
            for (field, value) in self.store.fields(component).await? {
                snapshot.insert(component.clone(), field, value);
            }
        }
        Ok(snapshot)
    }

    async fn all_calibrated(&self, node: &str, targets: &[Component]) -> SupervisorResult<bool> {
        for component in targets {
            if !self.store.get_status(component, node).await?.is_calibrated() {
                return Ok(false);
            }
        }
        Ok(!targets.is_empty())
    }

    /// Move the current values of every declared field aside.
    async fn backup(&self, d: &NodeDescriptor) -> SupervisorResult<bool> {
        let mut any = false;
        for unit in d.analysis_units() {
            for field in &d.redis_fields {
                let interrupted = self
                    .store
                    .get(&unit.component, field)
                    .await?
                    .is_some_and(|v| v.is_nan_sentinel());
                // Keep the backup of an earlier run that never completed.
                if interrupted && self.store.has_backup(&unit.component, field).await? {
                    any = true;
                    continue;
                }
                if self.store.backup_field(&unit.component, field).await? {
                    debug!("{}: backed up {} on {}", d.name, field, unit.component);
                    any = true;
                }
            }
        }
        Ok(any)
    }

    /// Analyse each unit, write its quantities and update statuses.
    async fn commit(&self, d: &NodeDescriptor, outcome: &SweepOutcome) -> SupervisorResult<NodeReport> {
        let mut succeeded = Vec::new();
        let mut failures = Vec::new();

        for unit in d.analysis_units() {
            let dataset = outcome.dataset.subset(&unit.members);
            let ctx = AnalysisContext::new(d, unit.clone());

            let qoi = match self.analyzer.analyze(&dataset, &ctx).await {
                Ok(qoi) => qoi,
                Err(e) => {
                    warn!("{}: analysis failed on {}: {}", d.name, unit.component, e);
                    failures.push(UnitFailure {
                        component: unit.component,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for (field, value) in qoi.iter() {
                self.store.set(&unit.component, field, value).await?;
            }

            let missing = qoi.missing_fields(&d.redis_fields);
            if missing.is_empty() {
                succeeded.push(unit);
            } else {
                warn!("{}: {} is missing {}", d.name, unit.component, missing.join(", "));
                failures.push(UnitFailure {
                    component: unit.component,
                    reason: format!("missing fields: {}", missing.join(", ")),
                });
            }
        }

        // A qubit shared by two couplers is calibrated only if both succeeded.
        let failed_members: BTreeSet<Component> = d
            .analysis_units()
            .into_iter()
            .filter(|u| failures.iter().any(|f| f.component == u.component))
            .flat_map(|u| u.members)
            .collect();

        let mut calibrated = Vec::new();
        for unit in &succeeded {
            for member in &unit.members {
                if !failed_members.contains(member) && !calibrated.contains(member) {
                    self.store
                        .set_status(member, &d.name, CalibrationStatus::Calibrated)
                        .await?;
                    calibrated.push(member.clone());
                }
            }
        }
        for member in &failed_members {
            self.store
                .set_status(member, &d.name, CalibrationStatus::NotCalibrated)
                .await?;
        }

        let outcome_kind = if failures.is_empty() {
            info!("{} calibrated {}", d.name, join(&calibrated));
            NodeOutcome::Calibrated
        } else {
            NodeOutcome::Incomplete
        };

        let mut report = NodeReport::new(&d.name, outcome_kind);
        report.calibrated = calibrated;
        report.failures = failures;
        report.measurements = outcome.measurements;
        Ok(report)
    }
}

/// Instrument-side failures end only the node. Reshape and node errors
/// mean the node definition itself is wrong and always stop the run.
fn is_recoverable(error: &SweepError) -> bool {
    matches!(
        error,
        SweepError::Compile { .. }
            | SweepError::Measurement { .. }
            | SweepError::MeasurementTimeout { .. }
            | SweepError::PreMeasurement { .. }
    )
}

fn join(components: &[Component]) -> String {
    components
        .iter()
        .map(Component::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
