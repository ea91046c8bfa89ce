//! Walking trial simulator with bilateral GRF and joint-angle channels

use crate::gait_patterns::JointPattern;
use gait_core::mapping::GRAVITY;
use gait_core::{config_error, Column, GaitResult, Leg, Table, Trial, TrialMetadata};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Vertical GRF shape during stance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrfProfile {
    /// Offset half sine, above any sensible threshold from the first stance sample
    HalfSine,
    /// Force plate disconnected: all-zero GRF on both legs
    Absent,
}

/// Additive measurement noise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian noise on joint angles (rad)
    pub angle_std: f64,
    /// Gaussian noise on GRF during stance (N)
    pub grf_std: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            angle_std: 0.0,
            grf_std: 0.0,
        }
    }
}

/// Configuration for one simulated trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSimulatorConfig {
    pub subject: String,
    pub task: String,
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Complete gait cycles recorded for the reference leg
    pub cycles: usize,
    pub cycle_duration_s: f64,
    /// Fraction of each cycle spent in stance
    pub stance_fraction: f64,
    /// Swing recorded before the first reference-leg heel strike
    pub lead_in_s: f64,
    pub body_mass_kg: f64,
    pub grf: GrfProfile,
    pub knee: JointPattern,
    pub hip: JointPattern,
    /// Phase lag of the contralateral leg as a fraction of a cycle
    pub contralateral_offset: f64,
    pub noise: NoiseConfig,
    /// Reference-leg cycles whose stance is missing from the GRF
    pub dropped_heel_strikes: Vec<usize>,
    /// Recorded as the `speed_m_s` task parameter
    pub speed_m_s: Option<f64>,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for TrialSimulatorConfig {
    fn default() -> Self {
        Self {
            subject: "S01".to_string(),
            task: "level_walking".to_string(),
            sampling_rate: 100.0,
            cycles: 5,
            cycle_duration_s: 1.0,
            stance_fraction: 0.6,
            lead_in_s: 0.2,
            body_mass_kg: 70.0,
            grf: GrfProfile::HalfSine,
            knee: JointPattern::Triangular {
                min: 0.0,
                max: 1.0,
                peak_phase: 0.7,
            },
            hip: JointPattern::Sinusoidal {
                amplitude: 0.35,
                baseline: 0.1,
            },
            contralateral_offset: 0.5,
            noise: NoiseConfig::default(),
            dropped_heel_strikes: Vec::new(),
            speed_m_s: None,
            seed: Some(42),
        }
    }
}

impl TrialSimulatorConfig {
    pub fn samples_per_cycle(&self) -> usize {
        (self.cycle_duration_s * self.sampling_rate).round() as usize
    }

    pub fn lead_in_samples(&self) -> usize {
        (self.lead_in_s * self.sampling_rate).round() as usize
    }

    /// Total samples: lead-in plus every complete cycle
    pub fn total_samples(&self) -> usize {
        self.lead_in_samples() + self.cycles * self.samples_per_cycle()
    }

    /// Sample indices of the reference leg's heel strikes
    pub fn expected_heel_strikes(&self) -> Vec<usize> {
        if self.grf == GrfProfile::Absent {
            return Vec::new();
        }
        (0..self.cycles)
            .filter(|c| !self.dropped_heel_strikes.contains(c))
            .map(|c| self.lead_in_samples() + c * self.samples_per_cycle())
            .collect()
    }

    pub fn validate(&self) -> GaitResult<()> {
        if !self.sampling_rate.is_finite() || self.sampling_rate <= 0.0 {
            return Err(config_error!("Sampling rate must be positive, got {}", self.sampling_rate));
        }
        if self.samples_per_cycle() < 2 {
            return Err(config_error!("A cycle needs at least 2 samples"));
        }
        if !(0.0..1.0).contains(&self.stance_fraction) || self.stance_fraction == 0.0 {
            return Err(config_error!("Stance fraction must be in (0, 1), got {}", self.stance_fraction));
        }
        if self.cycles == 0 {
            return Err(config_error!("At least one cycle is required"));
        }
        if self.noise.angle_std < 0.0 || self.noise.grf_std < 0.0 {
            return Err(config_error!("Noise standard deviations must be non-negative"));
        }
        Ok(())
    }
}

/// Generates synthetic walking trials
pub struct TrialSimulator {
    config: TrialSimulatorConfig,
    rng: rand::rngs::StdRng,
    angle_noise: Normal<f64>,
    grf_noise: Normal<f64>,
}

impl TrialSimulator {
    pub fn new(config: TrialSimulatorConfig) -> GaitResult<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });

        let angle_noise = Normal::new(0.0, config.noise.angle_std)
            .map_err(|e| config_error!("Invalid angle noise: {}", e))?;
        let grf_noise = Normal::new(0.0, config.noise.grf_std)
            .map_err(|e| config_error!("Invalid GRF noise: {}", e))?;

        Ok(Self {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            config,
            angle_noise,
            grf_noise,
        })
    }

    pub fn config(&self) -> &TrialSimulatorConfig {
        &self.config
    }

    /// Phase of `leg` at sample `i`, from integer sample arithmetic
    fn phase(&self, i: usize, leg: Leg) -> (usize, f64) {
        let spc = self.config.samples_per_cycle() as i64;
        let mut offset = self.config.lead_in_samples() as i64;
        if leg == Leg::Contralateral {
            offset += (self.config.contralateral_offset * spc as f64).round() as i64;
        }
        let since_start = i as i64 - offset;
        let cycle = since_start.div_euclid(spc);
        let within = since_start.rem_euclid(spc);
        (cycle.max(0) as usize, within as f64 / spc as f64)
    }

    fn grf_sample(&mut self, i: usize, leg: Leg) -> f64 {
        if self.config.grf == GrfProfile::Absent {
            return 0.0;
        }

        let (cycle, phase) = self.phase(i, leg);
        let stance = self.config.stance_fraction;
        if phase >= stance {
            return 0.0;
        }
        // Dropped strikes only apply after the lead-in
        if leg == Leg::Ipsilateral
            && i >= self.config.lead_in_samples()
            && self.config.dropped_heel_strikes.contains(&cycle)
        {
            return 0.0;
        }

        let body_weight = self.config.body_mass_kg * GRAVITY;
        let force = body_weight * (0.2 + 0.8 * (PI * phase / stance).sin());
        (force + self.grf_noise.sample(&mut self.rng)).max(0.0)
    }

    fn angle_sample(&mut self, i: usize, leg: Leg, pattern: JointPattern) -> f64 {
        let (_, phase) = self.phase(i, leg);
        pattern.angle_at_phase(phase) + self.angle_noise.sample(&mut self.rng)
    }

    /// Generate one trial with `grf_vertical_*_N`, `knee_flexion_angle_*_rad`
    /// and `hip_flexion_angle_*_rad` channels for both legs
    pub fn generate(&mut self) -> GaitResult<Trial> {
        let n = self.config.total_samples();
        let knee = self.config.knee;
        let hip = self.config.hip;

        let mut columns = Vec::new();
        for leg in [Leg::Ipsilateral, Leg::Contralateral] {
            let grf: Vec<f64> = (0..n).map(|i| self.grf_sample(i, leg)).collect();
            let knee_angle: Vec<f64> = (0..n).map(|i| self.angle_sample(i, leg, knee)).collect();
            let hip_angle: Vec<f64> = (0..n).map(|i| self.angle_sample(i, leg, hip)).collect();

            columns.push(Column::float(leg.channel_name("grf_vertical_{leg}_N"), grf));
            columns.push(Column::float(leg.channel_name("knee_flexion_angle_{leg}_rad"), knee_angle));
            columns.push(Column::float(leg.channel_name("hip_flexion_angle_{leg}_rad"), hip_angle));
        }

        let mut metadata = TrialMetadata::new(
            self.config.subject.clone(),
            self.config.task.clone(),
            1.0 / self.config.sampling_rate,
        );
        if let Some(speed) = self.config.speed_m_s {
            metadata = metadata.with_task_param("speed_m_s", speed);
        }

        debug!(
            subject = %self.config.subject,
            task = %self.config.task,
            samples = n,
            cycles = self.config.cycles,
            "Simulated trial"
        );
        Trial::from_sampling_interval(metadata, Table::from_columns(columns)?)
    }
}

/// Subject identifier for the 1-based `index`
pub fn subject_id(index: usize) -> String {
    format!("S{:02}", index)
}

/// Trials for subjects `S01..` built from `base`. The 1-based
/// `corrupt_subject`, if any, gets an absent GRF.
pub fn simulate_batch(
    base: &TrialSimulatorConfig,
    subjects: usize,
    corrupt_subject: Option<usize>,
) -> GaitResult<Vec<Trial>> {
    (1..=subjects)
        .map(|index| {
            let mut config = base.clone();
            config.subject = subject_id(index);
            config.seed = base.seed.map(|seed| seed + index as u64);
            if corrupt_subject == Some(index) {
                config.grf = GrfProfile::Absent;
            }
            TrialSimulator::new(config)?.generate()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_trial_shape() {
        let mut simulator = TrialSimulator::new(TrialSimulatorConfig::default()).unwrap();
        let trial = simulator.generate().unwrap();

        assert_eq!(trial.len(), 520);
        assert_eq!(trial.subject(), "S01");
        assert!((trial.time()[100] - 1.0).abs() < 1e-12);
        for name in [
            "grf_vertical_ipsi_N",
            "grf_vertical_contra_N",
            "knee_flexion_angle_ipsi_rad",
            "hip_flexion_angle_contra_rad",
        ] {
            assert!(trial.channel(name).is_ok(), "missing {}", name);
        }
    }

    #[test]
    fn test_grf_stance_starts_at_heel_strikes() {
        let config = TrialSimulatorConfig::default();
        let expected = config.expected_heel_strikes();
        assert_eq!(expected, vec![20, 120, 220, 320, 420]);

        let trial = TrialSimulator::new(config).unwrap().generate().unwrap();
        let grf = trial.channel("grf_vertical_ipsi_N").unwrap();
        for &hs in &expected {
            assert_eq!(grf[hs - 1], 0.0);
            assert!(grf[hs] > 50.0);
        }
        assert_eq!(grf[80], 0.0);

        // Contralateral leg lags by half a cycle and starts in stance
        let contra = trial.channel("grf_vertical_contra_N").unwrap();
        assert!(contra[0] > 50.0);
        assert_eq!(contra[69], 0.0);
        assert!(contra[70] > 50.0);
    }

    #[test]
    fn test_absent_grf_is_all_zero() {
        let config = TrialSimulatorConfig {
            grf: GrfProfile::Absent,
            ..TrialSimulatorConfig::default()
        };
        let trial = TrialSimulator::new(config).unwrap().generate().unwrap();
        let stats = trial.channel_stats("grf_vertical_ipsi_N").unwrap();
        assert_eq!(stats.max, 0.0);
        assert_eq!(trial.channel_stats("grf_vertical_contra_N").unwrap().max, 0.0);
    }

    #[test]
    fn test_dropped_heel_strike_merges_cycles() {
        let config = TrialSimulatorConfig {
            dropped_heel_strikes: vec![2],
            ..TrialSimulatorConfig::default()
        };
        assert_eq!(config.expected_heel_strikes(), vec![20, 120, 320, 420]);
        let trial = TrialSimulator::new(config).unwrap().generate().unwrap();
        let grf = trial.channel("grf_vertical_ipsi_N").unwrap();
        assert!(grf[220..280].iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let config = TrialSimulatorConfig {
            noise: NoiseConfig {
                angle_std: 0.01,
                grf_std: 5.0,
            },
            seed: Some(7),
            ..TrialSimulatorConfig::default()
        };
        let a = TrialSimulator::new(config.clone()).unwrap().generate().unwrap();
        let b = TrialSimulator::new(config).unwrap().generate().unwrap();
        assert_eq!(a.channels(), b.channels());
        assert!(a.channel_stats("knee_flexion_angle_ipsi_rad").unwrap().std_dev > 0.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = TrialSimulatorConfig {
            stance_fraction: 1.5,
            ..TrialSimulatorConfig::default()
        };
        assert!(TrialSimulator::new(config).is_err());

        let config = TrialSimulatorConfig {
            noise: NoiseConfig {
                angle_std: -1.0,
                grf_std: 0.0,
            },
            ..TrialSimulatorConfig::default()
        };
        assert!(TrialSimulator::new(config).is_err());
    }

    #[test]
    fn test_simulate_batch_with_corrupt_subject() {
        let trials = simulate_batch(&TrialSimulatorConfig::default(), 3, Some(2)).unwrap();
        assert_eq!(trials.len(), 3);
        assert_eq!(trials[1].subject(), "S02");
        assert_eq!(trials[1].channel_stats("grf_vertical_ipsi_N").unwrap().max, 0.0);
        assert!(trials[2].channel_stats("grf_vertical_ipsi_N").unwrap().max > 0.0);
    }
}
