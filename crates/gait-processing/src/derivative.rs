//! Velocity and acceleration estimates for phase-normalized angle signals

use crate::discontinuity::{
    find_discontinuity, interpolate_discontinuity, smooth_localized_spikes, DiscontinuityOptions,
};
use serde::{Deserialize, Serialize};

/// Derivative settings carried by the phase configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeConfig {
    /// Derive velocity columns for `*_angle_*_rad` channels during normalization
    pub enabled: bool,
    /// Also derive acceleration from the velocity
    pub include_acceleration: bool,
    /// Search each cycle for a seam before differentiating
    pub auto_detect_discontinuity: bool,
    /// Detection and repair tunables
    pub options: DiscontinuityOptions,
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            include_acceleration: true,
            auto_detect_discontinuity: true,
            options: DiscontinuityOptions::default(),
        }
    }
}

/// Gradient with uniform spacing: central differences inside, one-sided
/// first-order differences at both ends
pub fn gradient(values: &[f64], spacing: f64) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![f64::NAN; n];
    }

    let mut result = Vec::with_capacity(n);
    result.push((values[1] - values[0]) / spacing);
    for i in 1..n - 1 {
        result.push((values[i + 1] - values[i - 1]) / (2.0 * spacing));
    }
    result.push((values[n - 1] - values[n - 2]) / spacing);
    result
}

/// Differentiates one cycle of a signal, repairing a circular-shift seam
/// first when one is given or detected
#[derive(Debug, Clone, Default)]
pub struct DerivativeEstimator {
    options: DiscontinuityOptions,
}

impl DerivativeEstimator {
    pub fn new(options: DiscontinuityOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DiscontinuityOptions {
        &self.options
    }

    /// Time derivative of `values`, which span `duration_s` seconds
    pub fn differentiate(
        &self,
        values: &[f64],
        duration_s: f64,
        discontinuity_index: Option<usize>,
        auto_detect: bool,
    ) -> Vec<f64> {
        let n = values.len();
        if n < 2 || !duration_s.is_finite() || duration_s <= 0.0 {
            return vec![f64::NAN; n];
        }
        let dt = duration_s / (n - 1) as f64;

        let seam = discontinuity_index.or_else(|| {
            if auto_detect {
                find_discontinuity(values, self.options.threshold_factor)
            } else {
                None
            }
        });

        match seam {
            Some(index) => {
                let smoothed =
                    interpolate_discontinuity(values, index, self.options.interpolation_window);
                let derivative = gradient(&smoothed, dt);
                smooth_localized_spikes(
                    &derivative,
                    index,
                    self.options.spike_window,
                    self.options.comparison_window,
                    self.options.threshold_std,
                )
            }
            None => gradient(values, dt),
        }
    }

    pub fn velocity_from_angle(
        &self,
        angle: &[f64],
        stride_duration_s: f64,
        discontinuity_index: Option<usize>,
        auto_detect: bool,
    ) -> Vec<f64> {
        self.differentiate(angle, stride_duration_s, discontinuity_index, auto_detect)
    }

    pub fn acceleration_from_velocity(
        &self,
        velocity: &[f64],
        stride_duration_s: f64,
        discontinuity_index: Option<usize>,
        auto_detect: bool,
    ) -> Vec<f64> {
        self.differentiate(velocity, stride_duration_s, discontinuity_index, auto_detect)
    }
}

/// Angular velocity from a phase-normalized angle cycle, using default
/// discontinuity options
pub fn velocity_from_angle(
    angle: &[f64],
    stride_duration_s: f64,
    discontinuity_index: Option<usize>,
    auto_detect: bool,
) -> Vec<f64> {
    DerivativeEstimator::default().velocity_from_angle(
        angle,
        stride_duration_s,
        discontinuity_index,
        auto_detect,
    )
}

/// Angular acceleration from a phase-normalized velocity cycle, using
/// default discontinuity options
pub fn acceleration_from_velocity(
    velocity: &[f64],
    stride_duration_s: f64,
    discontinuity_index: Option<usize>,
    auto_detect: bool,
) -> Vec<f64> {
    DerivativeEstimator::default().acceleration_from_velocity(
        velocity,
        stride_duration_s,
        discontinuity_index,
        auto_detect,
    )
}

/// Velocity channel name for an angle channel (`*_angle_*_rad`)
pub fn velocity_channel_name(angle_channel: &str) -> Option<String> {
    derived_name(angle_channel, "_velocity_", "_rad_s")
}

/// Acceleration channel name for an angle channel (`*_angle_*_rad`)
pub fn acceleration_channel_name(angle_channel: &str) -> Option<String> {
    derived_name(angle_channel, "_acceleration_", "_rad_s2")
}

fn derived_name(angle_channel: &str, marker: &str, suffix: &str) -> Option<String> {
    let stem = angle_channel.strip_suffix("_rad")?;
    if !stem.contains("_angle_") {
        return None;
    }
    Some(format!("{}{}", stem.replacen("_angle_", marker, 1), suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discontinuity::circular_shift;
    use std::f64::consts::PI;

    #[test]
    fn test_gradient_matches_numpy() {
        let values = [1.0, 2.0, 4.0, 7.0, 11.0];
        assert_eq!(gradient(&values, 1.0), vec![1.0, 1.5, 2.5, 3.5, 4.0]);
        assert_eq!(gradient(&values, 0.5), vec![2.0, 3.0, 5.0, 7.0, 8.0]);
    }

    #[test]
    fn test_degenerate_inputs_return_nan() {
        let single = velocity_from_angle(&[0.3], 1.0, None, true);
        assert_eq!(single.len(), 1);
        assert!(single[0].is_nan());

        let zero_duration = velocity_from_angle(&[0.0, 1.0, 2.0], 0.0, None, true);
        assert_eq!(zero_duration.len(), 3);
        assert!(zero_duration.iter().all(|v| v.is_nan()));

        let negative = acceleration_from_velocity(&[0.0, 1.0], -1.0, None, false);
        assert!(negative.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_sinusoid_velocity_matches_analytic() {
        let n = 150;
        let duration = 1.2;
        let omega = 2.0 * PI / duration;
        let angle: Vec<f64> = (0..n)
            .map(|i| (omega * duration * i as f64 / (n - 1) as f64).sin())
            .collect();

        let velocity = velocity_from_angle(&angle, duration, None, true);
        assert_eq!(velocity.len(), n);

        for i in 5..n - 5 {
            let t = duration * i as f64 / (n - 1) as f64;
            let expected = omega * (omega * t).cos();
            let error = (velocity[i] - expected).abs();
            assert!(error < 0.05 * omega, "sample {}: {} vs {}", i, velocity[i], expected);
        }
    }

    #[test]
    fn test_seam_does_not_produce_spike() {
        let n = 150;
        let duration = 1.0;
        let angle: Vec<f64> = (0..n)
            .map(|i| {
                let phase = i as f64 / n as f64;
                0.5 * (2.0 * PI * phase).sin() + phase
            })
            .collect();
        let shifted = circular_shift(&angle, 40);

        let naive = gradient(&shifted, duration / (n - 1) as f64);
        let repaired = velocity_from_angle(&shifted, duration, Some(40), false);

        let naive_peak = naive.iter().fold(0.0f64, |a, v| a.max(v.abs()));
        let repaired_peak = repaired.iter().fold(0.0f64, |a, v| a.max(v.abs()));
        assert!(repaired_peak < naive_peak / 5.0);
        // Samples far from the seam are the plain gradient
        assert!((repaired[100] - naive[100]).abs() < 1e-12);
    }

    #[test]
    fn test_auto_detect_matches_explicit_index() {
        let n = 150;
        let angle: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let shifted = circular_shift(&angle, 90);
        let explicit = velocity_from_angle(&shifted, 1.0, Some(90), false);
        let detected = velocity_from_angle(&shifted, 1.0, None, true);
        assert_eq!(explicit, detected);
    }

    #[test]
    fn test_derived_channel_names() {
        assert_eq!(
            velocity_channel_name("knee_flexion_angle_ipsi_rad").as_deref(),
            Some("knee_flexion_velocity_ipsi_rad_s")
        );
        assert_eq!(
            acceleration_channel_name("hip_flexion_angle_l_rad").as_deref(),
            Some("hip_flexion_acceleration_l_rad_s2")
        );
        assert_eq!(velocity_channel_name("grf_vertical_ipsi_N"), None);
        assert_eq!(velocity_channel_name("knee_flexion_moment_ipsi_rad"), None);
    }
}
