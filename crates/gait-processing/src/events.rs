//! Stance/swing transition detection from ground reaction force

use gait_core::{GaitResult, Leg, Trial};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Event type whose consecutive occurrences bound a stride
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorEvent {
    /// Swing → stance (0% phase at initial contact)
    HeelStrike,
    /// Stance → swing
    ToeOff,
}

impl Default for AnchorEvent {
    fn default() -> Self {
        AnchorEvent::HeelStrike
    }
}

/// Transition indices detected for one leg
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GaitEvents {
    /// First stance sample of each swing → stance crossing
    pub heel_strikes: Vec<usize>,
    /// First swing sample of each stance → swing crossing
    pub toe_offs: Vec<usize>,
}

impl GaitEvents {
    /// Events of the requested anchor type
    pub fn anchors(&self, anchor: AnchorEvent) -> &[usize] {
        match anchor {
            AnchorEvent::HeelStrike => &self.heel_strikes,
            AnchorEvent::ToeOff => &self.toe_offs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heel_strikes.is_empty() && self.toe_offs.is_empty()
    }
}

/// Keep transitions at least `min_interval_s` after the previously accepted one
fn debounce(indices: Vec<usize>, time: &[f64], min_interval_s: f64) -> Vec<usize> {
    let mut accepted: Vec<usize> = Vec::with_capacity(indices.len());
    for index in indices {
        match accepted.last() {
            Some(&last) if time[index] - time[last] < min_interval_s => {}
            _ => accepted.push(index),
        }
    }
    accepted
}

/// Threshold `grf` into stance/swing and collect the crossings.
///
/// NaN samples count as swing. `time` must have the same length as `grf`.
pub fn detect_events(grf: &[f64], time: &[f64], threshold: f64, min_interval_s: f64) -> GaitEvents {
    let n = grf.len().min(time.len());
    if n < 2 {
        return GaitEvents::default();
    }

    let stance: Vec<bool> = grf[..n].iter().map(|&f| f > threshold).collect();

    let mut heel_strikes = Vec::new();
    let mut toe_offs = Vec::new();
    for i in 1..n {
        match (stance[i - 1], stance[i]) {
            (false, true) => heel_strikes.push(i),
            (true, false) => toe_offs.push(i),
            _ => {}
        }
    }

    GaitEvents {
        heel_strikes: debounce(heel_strikes, time, min_interval_s),
        toe_offs: debounce(toe_offs, time, min_interval_s),
    }
}

/// Event detector configured with a force threshold and debounce interval
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetector {
    /// Stance threshold in the GRF channel's units
    pub threshold: f64,
    /// Minimum time between accepted events of the same type
    pub min_interval_s: f64,
}

impl EventDetector {
    pub fn new(threshold: f64, min_interval_s: f64) -> Self {
        Self { threshold, min_interval_s }
    }

    pub fn detect(&self, grf: &[f64], time: &[f64]) -> GaitEvents {
        detect_events(grf, time, self.threshold, self.min_interval_s)
    }

    /// Detect events on the GRF channel `grf_template` resolves to for `leg`
    pub fn detect_for_leg(&self, trial: &Trial, leg: Leg, grf_template: &str) -> GaitResult<GaitEvents> {
        let channel = leg.channel_name(grf_template);
        let grf = trial.channel(&channel)?;
        let events = self.detect(grf, trial.time());
        debug!(
            subject = trial.subject(),
            task = trial.task(),
            leg = leg.token(),
            channel = %channel,
            heel_strikes = events.heel_strikes.len(),
            toe_offs = events.toe_offs.len(),
            "Detected gait events"
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gait_core::{Column, GaitError, Table, TrialMetadata};

    fn time(n: usize, dt: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dt).collect()
    }

    /// 100 Hz square wave: `swing` samples below, `stance` samples above threshold
    fn square_grf(cycles: usize, swing: usize, stance: usize) -> Vec<f64> {
        let mut grf = Vec::new();
        for _ in 0..cycles {
            grf.extend(std::iter::repeat(0.0).take(swing));
            grf.extend(std::iter::repeat(700.0).take(stance));
        }
        grf.extend(std::iter::repeat(0.0).take(swing));
        grf
    }

    #[test]
    fn test_detects_clean_transitions() {
        let grf = square_grf(3, 40, 60);
        let events = detect_events(&grf, &time(grf.len(), 0.01), 50.0, 0.3);
        assert_eq!(events.heel_strikes, vec![40, 140, 240]);
        assert_eq!(events.toe_offs, vec![100, 200, 300]);
    }

    #[test]
    fn test_empty_and_constant_channels() {
        assert!(detect_events(&[], &[], 50.0, 0.3).is_empty());
        let flat = vec![0.0; 200];
        assert!(detect_events(&flat, &time(200, 0.01), 50.0, 0.3).is_empty());
        let loaded = vec![800.0; 200];
        assert!(detect_events(&loaded, &time(200, 0.01), 50.0, 0.3).is_empty());
    }

    #[test]
    fn test_starting_in_stance_is_allowed() {
        let mut grf = vec![700.0; 30];
        grf.extend(square_grf(2, 40, 60));
        let events = detect_events(&grf, &time(grf.len(), 0.01), 50.0, 0.3);
        assert_eq!(events.toe_offs[0], 30);
        assert_eq!(events.heel_strikes, vec![70, 170]);
    }

    #[test]
    fn test_bounce_is_debounced() {
        let mut grf = square_grf(2, 40, 60);
        // Brief unloading 5 samples after the first heel strike
        grf[45] = 0.0;
        let events = detect_events(&grf, &time(grf.len(), 0.01), 50.0, 0.3);
        assert_eq!(events.heel_strikes, vec![40, 140]);
        assert_eq!(events.toe_offs, vec![45, 100, 200]);

        let strict = detect_events(&grf, &time(grf.len(), 0.01), 50.0, 0.6);
        assert_eq!(strict.toe_offs, vec![45, 200]);
    }

    #[test]
    fn test_nan_counts_as_swing() {
        let mut grf = square_grf(1, 40, 60);
        grf[0] = f64::NAN;
        let events = detect_events(&grf, &time(grf.len(), 0.01), 50.0, 0.3);
        assert_eq!(events.heel_strikes, vec![40]);
    }

    #[test]
    fn test_detect_for_leg() {
        let grf = square_grf(2, 40, 60);
        let n = grf.len();
        let channels = Table::from_columns(vec![Column::float("grf_vertical_ipsi_N", grf)]).unwrap();
        let trial = Trial::from_sampling_interval(TrialMetadata::new("S01", "walk", 0.01), channels).unwrap();
        let detector = EventDetector::new(50.0, 0.3);

        let events = detector.detect_for_leg(&trial, Leg::Ipsilateral, "grf_vertical_{leg}_N").unwrap();
        assert_eq!(events.anchors(AnchorEvent::HeelStrike), &[40, 140]);
        assert_eq!(events.anchors(AnchorEvent::ToeOff), &[100, 200]);
        assert_eq!(trial.len(), n);

        let missing = detector.detect_for_leg(&trial, Leg::Contralateral, "grf_vertical_{leg}_N");
        assert!(matches!(missing, Err(GaitError::MissingChannel { .. })));
    }
}
