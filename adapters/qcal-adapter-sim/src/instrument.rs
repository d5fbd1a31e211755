//! Simulated compiler and instrument.

use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHasher;
use tracing::{debug, instrument};

use qcal_node::ReadoutLayout;
use qcal_sweep::{
    CollaboratorError, CollaboratorResult, CompileRequest, CompiledProgram, Compiler,
    ExternalAssignment, InstrumentExecutor, RawAcquisition,
};

use crate::scan_axis;

/// Time the simulator pretends each acquisition takes.
const ACQUISITION_TIME: Duration = Duration::from_micros(1);

/// Deterministic stand-in for the instrument driver stack.
///
/// Every channel holds a Lorentzian peak along the scan axis of the
/// schedule (the first axis that is not a shot axis), offset per component
/// so neighbouring qubits resolve to different values. Calibration points
/// read back as `0, 1, 2`.
pub struct SimulatedInstrument {
    seed: u64,
    noise: f64,
    delay: Option<Duration>,
    fail_compile: bool,
    fail_measure: bool,
    compilations: AtomicUsize,
    measurements: AtomicUsize,
    applied: Mutex<Vec<ExternalAssignment>>,
}

impl SimulatedInstrument {
    /// Create a noiseless simulator.
    pub fn new() -> Self {
        Self {
            seed: 0,
            noise: 0.0,
            delay: None,
            fail_compile: false,
            fail_measure: false,
            compilations: AtomicUsize::new(0),
            measurements: AtomicUsize::new(0),
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Add uniform noise of the given amplitude, seeded for reproducibility.
    pub fn with_noise(mut self, amplitude: f64, seed: u64) -> Self {
        self.noise = amplitude.abs();
        self.seed = seed;
        self
    }

    /// Make every measurement take this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every compilation fail.
    pub fn failing_compilation(mut self) -> Self {
        self.fail_compile = true;
        self
    }

    /// Make every measurement fail.
    pub fn failing_measurement(mut self) -> Self {
        self.fail_measure = true;
        self
    }

    /// Number of programs compiled so far.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    /// Number of measurements run so far.
    pub fn measurements(&self) -> usize {
        self.measurements.load(Ordering::SeqCst)
    }

    /// Pre-measurement operations applied so far.
    pub fn applied_operations(&self) -> Vec<ExternalAssignment> {
        self.applied
            .lock()
            .map(|applied| applied.clone())
            .unwrap_or_default()
    }

    fn synthesize(&self, request: &CompileRequest) -> CollaboratorResult<RawAcquisition> {
        let shape = request
            .schedule_samplespace
            .dimensions(&request.components)
            .map_err(|e| CollaboratorError::Failed(e.to_string()))?;
        let names: Vec<&str> = shape.axes().iter().map(|a| a.name.as_str()).collect();
        let scan = scan_axis(&names);
        let size = shape.size();
        let n = request.components.len();
        let channels = n * request.readout_layout.channels_per_component();
        let calibration = request.calibration_points.count();

        let mut fingerprint = FxHasher::default();
        request.node.hash(&mut fingerprint);
        if let Some(external) = &request.external {
            external.index.hash(&mut fingerprint);
        }
        let mut rng = StdRng::seed_from_u64(self.seed ^ fingerprint.finish());

        let mut raw = RawAcquisition::new();
        for channel in 0..channels {
            let readout_state = if n == 0 { 0 } else { channel / n };
            let mut samples = Vec::with_capacity(size + calibration);

            for i in 0..size {
                let (position, len, state) = match request.readout_layout {
                    ReadoutLayout::StateDiscriminationLoop { loops, states } => {
                        let states = usize::from(states).max(1);
                        let groups = (size / (loops.max(1) * states)).max(1);
                        ((i / states) % groups, groups, i % states)
                    }
                    _ => match (scan, shape.combination_at(i)) {
                        (Some(axis), Some(combination)) => {
                            (combination[axis], shape.axes()[axis].len, readout_state)
                        }
                        _ => (0, 1, readout_state),
                    },
                };

                let centre = peak_position(len, channel % n.max(1));
                let width = (len as f64 / 8.0).max(0.5);
                let x = (position as f64 - centre) / width;
                let noise = if self.noise > 0.0 {
                    rng.gen_range(-self.noise..self.noise)
                } else {
                    0.0
                };
                samples.push(Complex64::new(
                    1.0 / (1.0 + x * x) + 0.05 * state as f64 + noise,
                    noise,
                ));
            }
            samples.extend((0..calibration).map(|p| Complex64::new(p as f64, 0.0)));
            raw.insert(channel, samples);
        }
        Ok(raw)
    }
}

impl Default for SimulatedInstrument {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the simulated peak on an axis of `len` points.
fn peak_position(len: usize, component_index: usize) -> f64 {
    let last = len.saturating_sub(1) as f64;
    let offset = (component_index % 3) as f64 - 1.0;
    (last / 2.0 + offset).clamp(0.0, last)
}

#[async_trait]
impl Compiler for SimulatedInstrument {
    #[instrument(skip_all, fields(node = %request.node))]
    async fn compile(&self, request: &CompileRequest) -> CollaboratorResult<CompiledProgram> {
        if self.fail_compile {
            return Err(CollaboratorError::Failed(format!(
                "schedule for {} does not fit in sequencer memory",
                request.node
            )));
        }
        self.compilations.fetch_add(1, Ordering::SeqCst);
        debug!("Compiled schedule for {} components", request.components.len());
        Ok(CompiledProgram::new(
            request.clone(),
            serde_json::json!({ "backend": "simulator" }),
        ))
    }
}

#[async_trait]
impl InstrumentExecutor for SimulatedInstrument {
    async fn pre_measurement_operation(
        &self,
        assignment: &ExternalAssignment,
    ) -> CollaboratorResult<()> {
        debug!("Applying external combination {}", assignment.index);
        self.applied
            .lock()
            .map_err(|e| CollaboratorError::Failed(e.to_string()))?
            .push(assignment.clone());
        Ok(())
    }

    #[instrument(skip_all, fields(node = %program.request.node))]
    async fn measure(&self, program: &CompiledProgram) -> CollaboratorResult<RawAcquisition> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_measure {
            return Err(CollaboratorError::Failed("acquisition timed out on instrument".to_string()));
        }
        self.measurements.fetch_add(1, Ordering::SeqCst);
        self.synthesize(&program.request)
    }

    fn estimated_duration(&self, program: &CompiledProgram) -> Option<Duration> {
        if let Some(delay) = self.delay {
            return Some(delay);
        }
        let req = &program.request;
        let size = req.schedule_samplespace.size(&req.components).ok()?;
        u32::try_from(size).ok().map(|n| ACQUISITION_TIME * n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_node::{NodeContext, NodeRegistry};
    use qcal_types::Component;

    fn request(node: &str) -> CompileRequest {
        let registry = NodeRegistry::with_builtin_nodes();
        let ctx = NodeContext::new(
            Component::parse_all(["q1", "q2"]).unwrap(),
            Component::parse_all(["q1_q2"]).unwrap(),
        );
        let node = registry.create(node, &ctx).unwrap();
        CompileRequest::from_descriptor(node.descriptor(), None)
    }

    #[tokio::test]
    async fn test_acquisition_sizes_match_request() {
        let sim = SimulatedInstrument::new();
        let req = request("t1");
        let program = sim.compile(&req).await.unwrap();
        let raw = sim.measure(&program).await.unwrap();

        assert_eq!(raw.len(), 2);
        // 31 delays + 2 calibration points
        assert_eq!(raw.channel(1).unwrap().len(), 33);
        assert_eq!(sim.measurements(), 1);
        assert_eq!(sim.compilations(), 1);
    }

    #[tokio::test]
    async fn test_multi_state_channels() {
        let sim = SimulatedInstrument::new();
        let program = sim
            .compile(&request("ro_frequency_two_state_optimization"))
            .await
            .unwrap();
        let raw = sim.measure(&program).await.unwrap();
        assert_eq!(raw.len(), 4);
    }

    #[tokio::test]
    async fn test_noise_is_reproducible() {
        let a = SimulatedInstrument::new().with_noise(0.01, 7);
        let b = SimulatedInstrument::new().with_noise(0.01, 7);
        let req = request("rabi_oscillations");

        let raw_a = a.measure(&a.compile(&req).await.unwrap()).await.unwrap();
        let raw_b = b.measure(&b.compile(&req).await.unwrap()).await.unwrap();
        assert_eq!(raw_a, raw_b);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let sim = SimulatedInstrument::new().failing_compilation();
        assert!(sim.compile(&request("t1")).await.is_err());

        let sim = SimulatedInstrument::new().failing_measurement();
        let program = sim.compile(&request("t1")).await.unwrap();
        assert!(sim.measure(&program).await.is_err());
        assert_eq!(sim.measurements(), 0);
    }

    #[test]
    fn test_peak_position_stays_on_axis() {
        assert_eq!(peak_position(1, 0), 0.0);
        assert_eq!(peak_position(11, 1), 5.0);
        assert_eq!(peak_position(11, 2), 6.0);
        assert_eq!(peak_position(2, 0), 0.0);
    }
}
