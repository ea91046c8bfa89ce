//! Gait-specific identifiers and trial metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Leg whose events anchor a gait cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    /// Reference leg in the ipsi/contra convention
    Ipsilateral,
    /// Opposite leg in the ipsi/contra convention
    Contralateral,
    Left,
    Right,
}

/// Channel naming convention used by a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegNaming {
    /// `_ipsi_` / `_contra_` channel tokens
    IpsiContra,
    /// `_l_` / `_r_` channel tokens
    LeftRight,
}

impl Leg {
    /// Token used inside channel names and in the `phase_leading_leg` column
    pub fn token(&self) -> &'static str {
        match self {
            Leg::Ipsilateral => "ipsi",
            Leg::Contralateral => "contra",
            Leg::Left => "l",
            Leg::Right => "r",
        }
    }

    pub fn opposite(&self) -> Leg {
        match self {
            Leg::Ipsilateral => Leg::Contralateral,
            Leg::Contralateral => Leg::Ipsilateral,
            Leg::Left => Leg::Right,
            Leg::Right => Leg::Left,
        }
    }

    /// Substitute this leg's token for `{leg}` in a channel template
    pub fn channel_name(&self, template: &str) -> String {
        template.replace("{leg}", self.token())
    }
}

impl LegNaming {
    /// Both legs, reference leg first
    pub fn legs(&self) -> [Leg; 2] {
        match self {
            LegNaming::IpsiContra => [Leg::Ipsilateral, Leg::Contralateral],
            LegNaming::LeftRight => [Leg::Left, Leg::Right],
        }
    }
}

impl Default for LegNaming {
    fn default() -> Self {
        LegNaming::IpsiContra
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Scalar metadata describing one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMetadata {
    /// Subject identifier
    pub subject: String,
    /// Task name (e.g. `level_walking`, `incline_walking`)
    pub task: String,
    /// Task parameters such as speed or incline
    pub task_info: BTreeMap<String, f64>,
    /// Nominal sample interval in seconds
    pub dt: f64,
}

impl TrialMetadata {
    pub fn new(subject: impl Into<String>, task: impl Into<String>, dt: f64) -> Self {
        Self {
            subject: subject.into(),
            task: task.into(),
            task_info: BTreeMap::new(),
            dt,
        }
    }

    /// Add a task parameter
    pub fn with_task_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.task_info.insert(key.into(), value);
        self
    }

    /// Task parameters rendered as `key:value` pairs, or `None` if there are none
    pub fn task_info_label(&self) -> Option<String> {
        if self.task_info.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .task_info
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect();
        Some(parts.join(","))
    }

    /// Sampling rate implied by `dt`
    pub fn sampling_rate(&self) -> f64 {
        if self.dt > 0.0 {
            1.0 / self.dt
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for TrialMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.subject, self.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg_tokens() {
        assert_eq!(Leg::Ipsilateral.channel_name("grf_vertical_{leg}_N"), "grf_vertical_ipsi_N");
        assert_eq!(Leg::Right.channel_name("knee_flexion_angle_{leg}_rad"), "knee_flexion_angle_r_rad");
        assert_eq!(Leg::Left.opposite(), Leg::Right);
        assert_eq!(LegNaming::default().legs(), [Leg::Ipsilateral, Leg::Contralateral]);
    }

    #[test]
    fn test_task_info_label() {
        let metadata = TrialMetadata::new("S01", "incline_walking", 0.01)
            .with_task_param("speed_m_s", 1.2)
            .with_task_param("incline_deg", 5.0);
        assert_eq!(metadata.task_info_label().unwrap(), "incline_deg:5,speed_m_s:1.2");
        assert!((metadata.sampling_rate() - 100.0).abs() < 1e-9);
        assert!(TrialMetadata::new("S01", "walk", 0.01).task_info_label().is_none());
    }
}
