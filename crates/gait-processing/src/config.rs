//! Configuration management for phase segmentation and normalization

use crate::derivative::DerivativeConfig;
use crate::events::{AnchorEvent, EventDetector};
use crate::normalizer::PhaseUnits;
use crate::sink::WriteMode;
use crate::strides::{IqrMode, OutlierFilter};
use gait_core::{config_error, GaitError, GaitResult, LegNaming};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default GRF channel template; `{leg}` is replaced by the leg token
pub const DEFAULT_GRF_CHANNEL: &str = "grf_vertical_{leg}_N";

/// GRF channel template for datasets normalized to body weight
pub const BODY_WEIGHT_GRF_CHANNEL: &str = "grf_vertical_{leg}_BW";

/// Named configuration profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigProfile {
    /// Library defaults
    Standard,
    /// Two-sided IQR with a longer debounce interval
    StrictCleaning,
    /// Only discards abnormally long strides
    Exploratory,
    /// GRF expressed in body weights instead of newtons
    BodyWeightNormalized,
}

/// Phase processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Vertical GRF above which a leg is in stance
    pub grf_threshold: f64,
    /// Rows per phase-normalized cycle
    pub num_phase_points: usize,
    /// IQR multiplier `k` for stride-duration outliers
    pub iqr_multiplier: f64,
    /// Which side of the IQR fence rejects strides
    pub iqr_mode: IqrMode,
    /// Minimum time between two accepted events of the same type
    pub min_stride_interval_s: f64,
    /// Units of the emitted `phase` column
    pub phase_units: PhaseUnits,
    /// Leg tokens used in channel names
    pub leg_naming: LegNaming,
    /// GRF channel name template containing `{leg}`
    pub grf_channel: String,
    /// Event that starts each cycle
    pub anchor_event: AnchorEvent,
    /// Derived velocity/acceleration columns
    pub derivatives: DerivativeConfig,
    /// Mode for the first sink write of a batch
    pub write_mode: WriteMode,
    /// Upper bound on concurrently processed trials
    pub max_parallel_units: usize,
}

impl PhaseConfig {
    pub fn standard() -> Self {
        Self {
            grf_threshold: 50.0,
            num_phase_points: 150,
            iqr_multiplier: 1.5,
            iqr_mode: IqrMode::TwoSided,
            min_stride_interval_s: 0.3,
            phase_units: PhaseUnits::Fraction,
            leg_naming: LegNaming::IpsiContra,
            grf_channel: DEFAULT_GRF_CHANNEL.to_string(),
            anchor_event: AnchorEvent::HeelStrike,
            derivatives: DerivativeConfig::default(),
            write_mode: WriteMode::Fresh,
            max_parallel_units: 4,
        }
    }

    pub fn strict_cleaning() -> Self {
        Self {
            iqr_mode: IqrMode::TwoSided,
            iqr_multiplier: 1.5,
            min_stride_interval_s: 0.4,
            ..Self::standard()
        }
    }

    pub fn exploratory() -> Self {
        Self {
            iqr_mode: IqrMode::UpperOnly,
            iqr_multiplier: 3.0,
            ..Self::standard()
        }
    }

    /// Threshold of 5% body weight on `grf_vertical_{leg}_BW` channels
    pub fn body_weight_normalized() -> Self {
        Self {
            grf_threshold: 0.05,
            grf_channel: BODY_WEIGHT_GRF_CHANNEL.to_string(),
            ..Self::standard()
        }
    }

    pub fn for_profile(profile: ConfigProfile) -> Self {
        match profile {
            ConfigProfile::Standard => Self::standard(),
            ConfigProfile::StrictCleaning => Self::strict_cleaning(),
            ConfigProfile::Exploratory => Self::exploratory(),
            ConfigProfile::BodyWeightNormalized => Self::body_weight_normalized(),
        }
    }

    pub fn validate(&self) -> GaitResult<()> {
        if !self.grf_threshold.is_finite() || self.grf_threshold <= 0.0 {
            return Err(config_error!("GRF threshold must be positive, got {}", self.grf_threshold));
        }

        if self.num_phase_points < 2 {
            return Err(config_error!(
                "At least 2 phase points are required, got {}",
                self.num_phase_points
            ));
        }

        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(config_error!("IQR multiplier must be non-negative, got {}", self.iqr_multiplier));
        }

        if !self.min_stride_interval_s.is_finite() || self.min_stride_interval_s <= 0.0 {
            return Err(config_error!(
                "Minimum stride interval must be positive, got {}",
                self.min_stride_interval_s
            ));
        }

        if !self.grf_channel.contains("{leg}") {
            return Err(config_error!(
                "GRF channel template '{}' must contain {{leg}}",
                self.grf_channel
            ));
        }

        if self.max_parallel_units == 0 {
            return Err(config_error!("max_parallel_units must be greater than 0"));
        }

        let options = &self.derivatives.options;
        if !options.threshold_factor.is_finite() || options.threshold_factor <= 0.0 {
            return Err(config_error!("Discontinuity threshold factor must be positive"));
        }
        if !options.threshold_std.is_finite() || options.threshold_std <= 0.0 {
            return Err(config_error!("Spike threshold must be positive"));
        }

        Ok(())
    }

    /// Event detector for this configuration
    pub fn event_detector(&self) -> EventDetector {
        EventDetector::new(self.grf_threshold, self.min_stride_interval_s)
    }

    /// Stride outlier filter for this configuration
    pub fn outlier_filter(&self) -> OutlierFilter {
        OutlierFilter::new(self.iqr_multiplier, self.iqr_mode)
    }

    pub fn to_json(&self) -> GaitResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GaitError::Serialization {
            reason: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Parse and validate a configuration
    pub fn from_json(json: &str) -> GaitResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| GaitError::Serialization {
            reason: format!("Failed to deserialize configuration: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> GaitResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_defaults() {
        let config = PhaseConfig::default();
        assert_eq!(config.grf_threshold, 50.0);
        assert_eq!(config.num_phase_points, 150);
        assert_eq!(config.iqr_mode, IqrMode::TwoSided);
        assert_eq!(config.iqr_multiplier, 1.5);
        assert_eq!(config.phase_units, PhaseUnits::Fraction);
        assert_eq!(config.leg_naming, LegNaming::IpsiContra);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        for profile in [
            ConfigProfile::Standard,
            ConfigProfile::StrictCleaning,
            ConfigProfile::Exploratory,
            ConfigProfile::BodyWeightNormalized,
        ] {
            assert!(PhaseConfig::for_profile(profile).validate().is_ok(), "{:?}", profile);
        }

        let exploratory = PhaseConfig::exploratory();
        assert_eq!(exploratory.iqr_mode, IqrMode::UpperOnly);
        assert_eq!(exploratory.iqr_multiplier, 3.0);
        assert_eq!(PhaseConfig::strict_cleaning().min_stride_interval_s, 0.4);
        assert_eq!(PhaseConfig::body_weight_normalized().grf_channel, "grf_vertical_{leg}_BW");
    }

    #[test]
    fn test_config_validation() {
        let mut config = PhaseConfig::standard();
        config.grf_threshold = -1.0;
        assert!(matches!(config.validate(), Err(GaitError::InvalidConfig { .. })));

        config = PhaseConfig::standard();
        config.num_phase_points = 1;
        assert!(config.validate().is_err());

        config = PhaseConfig::standard();
        config.iqr_multiplier = f64::NAN;
        assert!(config.validate().is_err());
        config.iqr_multiplier = -0.5;
        assert!(config.validate().is_err());
        // k = 0 keeps only strides inside the quartiles
        config.iqr_multiplier = 0.0;
        assert!(config.validate().is_ok());

        config = PhaseConfig::standard();
        config.min_stride_interval_s = 0.0;
        assert!(config.validate().is_err());

        config = PhaseConfig::standard();
        config.grf_channel = "grf_vertical_N".to_string();
        assert!(config.validate().is_err());

        config = PhaseConfig::standard();
        config.max_parallel_units = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = PhaseConfig::exploratory();
        config.phase_units = PhaseUnits::Percent;
        config.derivatives.enabled = true;

        let json = config.to_json().unwrap();
        let parsed = PhaseConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let mut config = PhaseConfig::standard();
        config.num_phase_points = 0;
        let json = config.to_json().unwrap();
        assert!(matches!(PhaseConfig::from_json(&json), Err(GaitError::InvalidConfig { .. })));
        assert!(matches!(PhaseConfig::from_json("{ not json"), Err(GaitError::Serialization { .. })));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phase.json");
        std::fs::write(&path, PhaseConfig::strict_cleaning().to_json().unwrap()).unwrap();
        assert_eq!(PhaseConfig::from_json_file(&path).unwrap(), PhaseConfig::strict_cleaning());

        let missing = PhaseConfig::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(GaitError::Persistence { .. })));
    }
}
