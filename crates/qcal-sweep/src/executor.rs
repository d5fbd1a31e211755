//! Sweep execution.
//!
//! The executor expands a node's samplespaces into compile and measure
//! calls:
//!
//! - no external samplespace: compile once, measure once;
//! - external samplespace of `k` values: compile once, then for every value
//!   apply the pre-measurement operation and measure;
//! - parameterized sweep: recompile with the external value baked in for
//!   every combination, optionally analysing each partial dataset.
//!
//! Combinations run strictly in order. Each measurement races a timeout
//! while a background task reports progress; both are joined before the
//! result is used.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use qcal_node::{CalibrationNode, MeasurementKind, NodeDescriptor};
use qcal_types::Component;

use crate::collaborator::{
    AnalysisContext, Analyzer, CompileRequest, CompiledProgram, Compiler, ExternalAssignment,
    InstrumentExecutor, Qoi, RawAcquisition,
};
use crate::dataset::Dataset;
use crate::error::{SweepError, SweepResult};
use crate::reshape::DatasetReshaper;

/// Default time a single measurement may take.
pub const DEFAULT_MEASUREMENT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default interval between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(with = "duration_secs")]
    pub measurement_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub progress_interval: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            measurement_timeout: DEFAULT_MEASUREMENT_TIMEOUT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Serialize a duration as fractional seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Receives progress of running measurements.
pub trait ProgressSink: Send + Sync {
    /// A measurement started.
    fn started(&self, node: &str, label: &str, estimate: Option<Duration>);
    /// Periodic report while the measurement runs.
    fn tick(&self, node: &str, elapsed: Duration, estimate: Option<Duration>);
    /// The measurement returned, successfully or not.
    fn finished(&self, node: &str, elapsed: Duration);
}

/// Progress sink writing to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn started(&self, node: &str, label: &str, estimate: Option<Duration>) {
        debug!("{} measuring {} (estimate {:?})", node, label, estimate);
    }

    fn tick(&self, node: &str, elapsed: Duration, estimate: Option<Duration>) {
        match estimate {
            Some(total) => debug!("{} running {:.1?} of ~{:.1?}", node, elapsed, total),
            None => debug!("{} running {:.1?}", node, elapsed),
        }
    }

    fn finished(&self, node: &str, elapsed: Duration) {
        debug!("{} measurement done in {:.1?}", node, elapsed);
    }
}

/// Analysis of one external combination of a parameterized sweep.
///
/// These results are informational only and are never written to the
/// calibration store.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub index: usize,
    pub outcomes: Vec<(Component, Result<Qoi, String>)>,
}

/// Result of running a node's sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    /// Merged dataset over every combination.
    pub dataset: Dataset,
    pub iterations: Vec<IterationReport>,
    /// Number of measure calls issued.
    pub measurements: usize,
}

/// Drives compile and measure calls for one node at a time.
pub struct SweepExecutor {
    compiler: Arc<dyn Compiler>,
    instrument: Arc<dyn InstrumentExecutor>,
    analyzer: Option<Arc<dyn Analyzer>>,
    progress: Arc<dyn ProgressSink>,
    config: ExecutorConfig,
}

impl SweepExecutor {
    /// Create an executor with default settings and log-based progress.
    pub fn new(compiler: Arc<dyn Compiler>, instrument: Arc<dyn InstrumentExecutor>) -> Self {
        Self {
            compiler,
            instrument,
            analyzer: None,
            progress: Arc::new(LogProgress),
            config: ExecutorConfig::default(),
        }
    }

    /// Analyzer used for per-iteration reports.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run every measurement of a node and merge the results.
    #[instrument(skip_all, fields(node = %node.name()))]
    pub async fn execute(&self, node: &dyn CalibrationNode) -> SweepResult<SweepOutcome> {
        let d = node.descriptor();
        let shape = node.dimensions()?;
        let external = node.external_dimensions()?;
        let reshaper = DatasetReshaper::new(d);

        let Some(external) = external else {
            info!(
                "Running {} over {} schedule points",
                d.name,
                shape.size()
            );
            let program = self.compile(d, None).await?;
            let raw = self.measure(&d.name, &program, "schedule").await?;
            return Ok(SweepOutcome {
                dataset: reshaper.reshape(&[raw], None)?,
                iterations: Vec::new(),
                measurements: 1,
            });
        };

        let k = external.size();
        info!(
            "Running {} over {} schedule points x {} external values",
            d.name,
            shape.size(),
            k
        );

        let post_process = matches!(
            d.measurement_kind,
            MeasurementKind::ParameterizedSweep {
                post_process_each_iteration: true
            }
        );
        let shared = match d.measurement_kind {
            MeasurementKind::Simple => Some(self.compile(d, None).await?),
            MeasurementKind::ParameterizedSweep { .. } => None,
        };

        let mut blocks = Vec::with_capacity(k);
        let mut iterations = Vec::new();
        for index in 0..k {
            let assignment = ExternalAssignment {
                index,
                values: d.external_samplespace.assignment_at(&d.components, index)?,
            };
            debug!("{} external combination {}: {:?}", d.name, index, assignment.values);

            let label = format!("combination {}/{}", index + 1, k);
            let raw = match &shared {
                Some(program) => {
                    self.instrument
                        .pre_measurement_operation(&assignment)
                        .await
                        .map_err(|source| SweepError::PreMeasurement {
                            node: d.name.clone(),
                            index,
                            source,
                        })?;
                    self.measure(&d.name, program, &label).await?
                }
                None => {
                    let program = self.compile(d, Some(assignment)).await?;
                    self.measure(&d.name, &program, &label).await?
                }
            };

            if post_process {
                let partial = reshaper.reshape(std::slice::from_ref(&raw), Some(&[index]))?;
                iterations.push(self.analyze_iteration(d, index, &partial).await);
            }
            blocks.push(raw);
        }

        let indices: Vec<usize> = (0..k).collect();
        Ok(SweepOutcome {
            dataset: reshaper.reshape(&blocks, Some(&indices))?,
            iterations,
            measurements: k,
        })
    }

    async fn compile(
        &self,
        descriptor: &NodeDescriptor,
        external: Option<ExternalAssignment>,
    ) -> SweepResult<CompiledProgram> {
        let request = CompileRequest::from_descriptor(descriptor, external);
        self.compiler
            .compile(&request)
            .await
            .map_err(|source| SweepError::Compile {
                node: descriptor.name.clone(),
                source,
            })
    }

    /// Measure under a timeout while a progress task reports elapsed time.
    async fn measure(
        &self,
        node: &str,
        program: &CompiledProgram,
        label: &str,
    ) -> SweepResult<RawAcquisition> {
        let estimate = self.instrument.estimated_duration(program);
        let started = Instant::now();
        self.progress.started(node, label, estimate);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let reporter = tokio::spawn(report_progress(
            Arc::clone(&self.progress),
            node.to_string(),
            self.config.progress_interval,
            estimate,
            stop_rx,
        ));

        let result =
            tokio::time::timeout(self.config.measurement_timeout, self.instrument.measure(program))
                .await;

        let _ = stop_tx.send(());
        if let Err(e) = reporter.await {
            warn!("Progress reporter for {} ended abnormally: {}", node, e);
        }
        self.progress.finished(node, started.elapsed());

        match result {
            Err(_) => Err(SweepError::MeasurementTimeout {
                node: node.to_string(),
                timeout: self.config.measurement_timeout,
            }),
            Ok(Err(source)) => Err(SweepError::Measurement {
                node: node.to_string(),
                source,
            }),
            Ok(Ok(raw)) => Ok(raw),
        }
    }

    async fn analyze_iteration(
        &self,
        descriptor: &NodeDescriptor,
        index: usize,
        partial: &Dataset,
    ) -> IterationReport {
        let mut outcomes = Vec::new();
        let Some(analyzer) = &self.analyzer else {
            warn!(
                "{} requests per-iteration analysis but no analyzer is configured",
                descriptor.name
            );
            return IterationReport { index, outcomes };
        };

        for unit in descriptor.analysis_units() {
            let subset = partial.subset(&unit.members);
            let component = unit.component.clone();
            let mut ctx = AnalysisContext::new(descriptor, unit);
            ctx.iteration = Some(index);
            let outcome = analyzer
                .analyze(&subset, &ctx)
                .await
                .map_err(|e| e.to_string());
            debug!("{} iteration {} on {}: {:?}", descriptor.name, index, component, outcome);
            outcomes.push((component, outcome));
        }
        IterationReport { index, outcomes }
    }
}

async fn report_progress(
    sink: Arc<dyn ProgressSink>,
    node: String,
    interval: Duration,
    estimate: Option<Duration>,
    mut stop: oneshot::Receiver<()>,
) {
    let started = Instant::now();
    loop {
        tokio::select! {
            _ = &mut stop => break,
            () = tokio::time::sleep(interval) => sink.tick(&node, started.elapsed(), estimate),
        }
    }
}
