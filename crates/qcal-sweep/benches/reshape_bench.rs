//! Benchmarks for dataset reshaping
//!
//! Run with: cargo bench -p qcal-sweep

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use num_complex::Complex64;
use qcal_node::{NodeDescriptor, ReadoutLayout, SampleSpace};
use qcal_sweep::{DatasetReshaper, RawAcquisition, reshuffle_state_discrimination};
use qcal_types::Component;

fn descriptor(qubits: usize, points: usize) -> NodeDescriptor {
    let components: Vec<Component> = (0..qubits).map(|i| Component::qubit(format!("q{i}"))).collect();
    let mut space = SampleSpace::new();
    for c in &components {
        space.insert("frequencies", c.clone(), (0..points).map(|i| i as f64).collect());
        space.insert("amplitudes", c.clone(), vec![0.1, 0.2, 0.3, 0.4]);
    }
    let mut node = NodeDescriptor::new("bench", components);
    node.schedule_samplespace = space;
    node
}

fn acquisition(channels: usize, len: usize) -> RawAcquisition {
    (0..channels).fold(RawAcquisition::new(), |raw, ch| {
        raw.with_channel(ch, (0..len).map(|i| Complex64::new(i as f64, ch as f64)).collect())
    })
}

/// Benchmark reshaping a two-dimensional sweep
fn bench_reshape(c: &mut Criterion) {
    let mut group = c.benchmark_group("reshape");

    for qubits in &[1, 8, 32] {
        let node = descriptor(*qubits, 101);
        let raw = acquisition(*qubits, 101 * 4);
        group.bench_with_input(BenchmarkId::new("qubits", qubits), &raw, |b, raw| {
            let reshaper = DatasetReshaper::new(&node);
            b.iter(|| reshaper.reshape(black_box(std::slice::from_ref(raw)), None));
        });
    }

    group.finish();
}

/// Benchmark the state-discrimination reorder
fn bench_reshuffle(c: &mut Criterion) {
    let values: Vec<Complex64> = (0..11 * 8 * 3).map(|i| Complex64::new(i as f64, 0.0)).collect();
    c.bench_function("reshuffle_state_discrimination", |b| {
        b.iter(|| reshuffle_state_discrimination(black_box(&values), 11, 8, 3));
    });

    let q = Component::qubit("q0");
    let mut node = NodeDescriptor::new("ro_amp", vec![q.clone()]);
    node.readout_layout = ReadoutLayout::StateDiscriminationLoop { loops: 8, states: 3 };
    node.schedule_samplespace = SampleSpace::new()
        .with("qubit_states", q.clone(), (0..24).map(|i| (i % 3) as f64).collect())
        .with("ro_amplitudes", q, (0..11).map(|i| i as f64).collect());
    let raw = acquisition(1, 11 * 24);
    c.bench_function("reshape_state_discrimination_node", |b| {
        let reshaper = DatasetReshaper::new(&node);
        b.iter(|| reshaper.reshape(black_box(std::slice::from_ref(&raw)), None));
    });
}

criterion_group!(benches, bench_reshape, bench_reshuffle);
criterion_main!(benches);
