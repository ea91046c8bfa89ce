//! Performance benchmarks for the phase pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gait_core::Leg;
use gait_processing::{
    circular_shift, interpolate_discontinuity, process_unit, velocity_from_angle, PhaseConfig,
};
use gait_simulation::{TrialSimulator, TrialSimulatorConfig};

/// Benchmark one (trial, leg) unit for increasing trial lengths
fn bench_process_unit(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_unit");
    let config = PhaseConfig::default();

    for &cycles in &[5, 20, 100] {
        let simulation = TrialSimulatorConfig {
            cycles,
            ..TrialSimulatorConfig::default()
        };
        let trial = TrialSimulator::new(simulation).unwrap().generate().unwrap();

        group.bench_with_input(BenchmarkId::new("cycles", cycles), &trial, |b, trial| {
            b.iter(|| black_box(process_unit(black_box(trial), Leg::Ipsilateral, &config)));
        });
    }

    group.finish();
}

/// Benchmark seam repair and differentiation of one cycle
fn bench_discontinuity(c: &mut Criterion) {
    let mut group = c.benchmark_group("discontinuity");

    for &points in &[150, 1000] {
        let cycle: Vec<f64> = (0..points)
            .map(|i| {
                let phase = i as f64 / points as f64;
                (2.0 * std::f64::consts::PI * phase).sin() + phase
            })
            .collect();
        let shifted = circular_shift(&cycle, points / 3);

        group.bench_with_input(BenchmarkId::new("interpolate", points), &shifted, |b, shifted| {
            b.iter(|| black_box(interpolate_discontinuity(black_box(shifted), points / 3, 3)));
        });
        group.bench_with_input(BenchmarkId::new("velocity", points), &shifted, |b, shifted| {
            b.iter(|| black_box(velocity_from_angle(black_box(shifted), 1.1, None, true)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_process_unit, bench_discontinuity);
criterion_main!(benches);
