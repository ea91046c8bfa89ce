//! Full pipeline on a clean synthetic walking trial

use gait_processing::{add_phase_info, DerivativeConfig, PhaseConfig, PhaseUnits};
use gait_simulation::{JointPattern, TrialSimulator, TrialSimulatorConfig};
use std::f64::consts::PI;

const KNEE: JointPattern = JointPattern::Triangular {
    min: 0.0,
    max: 1.0,
    peak_phase: 0.5,
};

fn clean_trial() -> gait_core::Trial {
    let config = TrialSimulatorConfig {
        knee: KNEE,
        ..TrialSimulatorConfig::default()
    };
    TrialSimulator::new(config).unwrap().generate().unwrap()
}

#[test]
fn test_five_heel_strikes_produce_four_cycles() {
    let trial = clean_trial();
    let info = add_phase_info(&trial, &PhaseConfig::default()).unwrap();

    let ipsi = &info.legs[0].outcome;
    assert_eq!(ipsi.metrics().anchor_events, 5);
    assert_eq!(ipsi.cycles().len(), 4);
    for cycle in ipsi.cycles() {
        assert_eq!(cycle.table.n_rows(), 150);
        assert!((cycle.stride.duration_s - 1.0).abs() < 1e-9);
    }
    assert_eq!(info.legs[1].outcome.cycles().len(), 4);
    assert_eq!(info.phase_indexed.n_rows(), 8 * 150);
}

#[test]
fn test_mean_knee_curve_matches_waveform() {
    let trial = clean_trial();
    let info = add_phase_info(&trial, &PhaseConfig::default()).unwrap();
    let cycles = info.legs[0].outcome.cycles();

    let mut mean = vec![0.0; 150];
    for cycle in cycles {
        let knee = cycle.table.float_column("knee_flexion_angle_ipsi_rad").unwrap();
        for (m, v) in mean.iter_mut().zip(knee) {
            *m += v / cycles.len() as f64;
        }
    }

    let phase = cycles[0].table.float_column("phase").unwrap();
    for (k, (&p, &m)) in phase.iter().zip(&mean).enumerate() {
        let expected = KNEE.angle_at_phase(p);
        assert!((m - expected).abs() < 1e-3, "point {}: {} vs {}", k, m, expected);
    }
}

#[test]
fn test_percent_units_and_labels() {
    let trial = clean_trial();
    let config = PhaseConfig {
        phase_units: PhaseUnits::Percent,
        ..PhaseConfig::default()
    };
    let info = add_phase_info(&trial, &config).unwrap();
    let phase = info.phase_indexed.float_column("phase").unwrap();
    assert_eq!(phase[0], 0.0);
    assert!((phase[149] - (100.0 - 100.0 / 150.0)).abs() < 1e-9);
    assert_eq!(phase[150], 0.0);

    assert_eq!(info.phase_indexed.label_column("subject").unwrap()[0], "S01");
    assert_eq!(info.phase_indexed.label_column("task").unwrap()[0], "level_walking");
    assert_eq!(info.phase_indexed.integer_column("stride").unwrap()[3 * 150], 3);
}

#[test]
fn test_hip_velocity_from_phase_cycles() {
    let trial = clean_trial();
    let config = PhaseConfig {
        derivatives: DerivativeConfig {
            enabled: true,
            ..DerivativeConfig::default()
        },
        ..PhaseConfig::default()
    };
    let info = add_phase_info(&trial, &config).unwrap();
    let cycle = &info.legs[0].outcome.cycles()[0];

    // Hip: 0.1 + 0.35 sin(2πφ) over a 1 s cycle
    let amplitude = 0.35 * 2.0 * PI;
    let phase = cycle.table.float_column("phase").unwrap();
    let velocity = cycle.table.float_column("hip_flexion_velocity_ipsi_rad_s").unwrap();
    for k in 5..145 {
        let expected = amplitude * (2.0 * PI * phase[k]).cos();
        assert!(
            (velocity[k] - expected).abs() < 0.05 * amplitude,
            "point {}: {} vs {}",
            k,
            velocity[k],
            expected
        );
    }
    assert!(cycle.table.has_column("knee_flexion_acceleration_ipsi_rad_s2"));
}

#[test]
fn test_dropped_heel_strike_is_rejected_as_outlier() {
    let config = TrialSimulatorConfig {
        cycles: 6,
        dropped_heel_strikes: vec![3],
        ..TrialSimulatorConfig::default()
    };
    let trial = TrialSimulator::new(config).unwrap().generate().unwrap();
    let info = add_phase_info(&trial, &PhaseConfig::default()).unwrap();

    let metrics = info.legs[0].outcome.metrics();
    assert_eq!(metrics.candidates, 4);
    assert_eq!(metrics.rejected_outliers, 1);
    assert_eq!(metrics.cycles, 3);
    assert!(info.legs[0]
        .outcome
        .cycles()
        .iter()
        .all(|c| c.stride.duration_s < 1.5));
}
