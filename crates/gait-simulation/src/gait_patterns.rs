//! Joint-angle waveforms over one gait cycle

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Joint angle (radians) as a function of gait phase in `[0, 1)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JointPattern {
    Constant { level: f64 },
    /// One sine period per cycle
    Sinusoidal { amplitude: f64, baseline: f64 },
    /// Linear rise from `min` at 0 to `max` at `peak_phase`, back to `min` at 1
    Triangular { min: f64, max: f64, peak_phase: f64 },
    /// Loading-response bump in stance and a larger flexion peak in swing
    Physiological { stance_peak: f64, swing_peak: f64 },
}

impl JointPattern {
    pub fn angle_at_phase(&self, phase: f64) -> f64 {
        let phase = phase.rem_euclid(1.0);
        match *self {
            JointPattern::Constant { level } => level,

            JointPattern::Sinusoidal { amplitude, baseline } => {
                baseline + amplitude * (2.0 * PI * phase).sin()
            }

            JointPattern::Triangular { min, max, peak_phase } => {
                let peak = peak_phase.clamp(f64::EPSILON, 1.0 - f64::EPSILON);
                if phase <= peak {
                    min + (max - min) * phase / peak
                } else {
                    max - (max - min) * (phase - peak) / (1.0 - peak)
                }
            }

            JointPattern::Physiological { stance_peak, swing_peak } => {
                let bump = |center: f64, width: f64| (-((phase - center) / width).powi(2)).exp();
                0.05 + stance_peak * bump(0.15, 0.07) + swing_peak * bump(0.72, 0.1)
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            JointPattern::Constant { .. } => "Constant angle",
            JointPattern::Sinusoidal { .. } => "Sinusoidal",
            JointPattern::Triangular { .. } => "Triangular",
            JointPattern::Physiological { .. } => "Physiological knee flexion",
        }
    }

    /// Common preset patterns
    pub fn presets() -> Vec<(&'static str, JointPattern)> {
        vec![
            ("Locked", JointPattern::Constant { level: 0.0 }),
            ("Hip Swing", JointPattern::Sinusoidal { amplitude: 0.35, baseline: 0.1 }),
            ("Knee Triangle", JointPattern::Triangular { min: 0.0, max: 1.0, peak_phase: 0.7 }),
            ("Knee Flexion", JointPattern::Physiological { stance_peak: 0.3, swing_peak: 1.0 }),
        ]
    }
}
