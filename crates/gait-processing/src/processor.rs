//! Per-unit processing: one trial, one leg, events through phase cycles

use crate::config::PhaseConfig;
use crate::normalizer::{PhaseCycle, PhaseNormalizer};
use crate::strides::{stride_candidates, StrideSelection};
use gait_core::{GaitError, GaitResult, Leg, Table, Trial};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Why a unit produced no cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// GRF never crossed the threshold in the anchor direction
    NoTransitions,
    /// Every stride candidate was rejected
    NoValidStrides { candidates: usize },
    /// The trial lacks a channel or is otherwise unusable for this leg
    MalformedInput { reason: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoTransitions => write!(f, "no transitions"),
            SkipReason::NoValidStrides { candidates } => {
                write!(f, "no valid strides ({} candidates)", candidates)
            }
            SkipReason::MalformedInput { reason } => write!(f, "malformed input: {}", reason),
        }
    }
}

/// Counters and timing for one processed unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitMetrics {
    /// Wall time spent on the unit in microseconds
    pub processing_time_us: u64,
    /// Anchor events detected (heel strikes or toe offs, per configuration)
    pub anchor_events: usize,
    pub candidates: usize,
    pub rejected_non_positive: usize,
    pub rejected_outliers: usize,
    pub cycles: usize,
}

impl UnitMetrics {
    pub fn start_timing() -> UnitTimer {
        UnitTimer {
            start_time: Instant::now(),
            metrics: UnitMetrics::default(),
        }
    }
}

/// Helper for timing one unit
pub struct UnitTimer {
    start_time: Instant,
    metrics: UnitMetrics,
}

impl UnitTimer {
    pub fn record_events(&mut self, anchors: usize) {
        self.metrics.anchor_events = anchors;
    }

    pub fn record_selection(&mut self, candidates: usize, selection: &StrideSelection) {
        self.metrics.candidates = candidates;
        self.metrics.rejected_non_positive = selection.rejected_non_positive;
        self.metrics.rejected_outliers = selection.rejected_outliers;
    }

    /// Finish timing and return metrics
    pub fn finish(mut self, cycles: usize) -> UnitMetrics {
        self.metrics.processing_time_us = self.start_time.elapsed().as_micros() as u64;
        self.metrics.cycles = cycles;
        self.metrics
    }
}

/// Result of processing one (trial, leg) unit
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Processed {
        cycles: Vec<PhaseCycle>,
        metrics: UnitMetrics,
    },
    Skipped {
        reason: SkipReason,
        metrics: UnitMetrics,
    },
    Failed {
        error: GaitError,
        metrics: UnitMetrics,
    },
}

impl UnitOutcome {
    pub fn metrics(&self) -> &UnitMetrics {
        match self {
            UnitOutcome::Processed { metrics, .. }
            | UnitOutcome::Skipped { metrics, .. }
            | UnitOutcome::Failed { metrics, .. } => metrics,
        }
    }

    pub fn cycles(&self) -> &[PhaseCycle] {
        match self {
            UnitOutcome::Processed { cycles, .. } => cycles,
            _ => &[],
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, UnitOutcome::Processed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, UnitOutcome::Skipped { .. })
    }

    /// Cycle tables stacked in stride order
    pub fn phase_table(&self) -> GaitResult<Table> {
        Table::concat(self.cycles().iter().map(|c| &c.table))
    }
}

/// Detect, segment, filter and normalize one leg of one trial.
///
/// Never panics and never touches shared state. Malformed input is reported
/// as a skip so batch runs continue.
pub fn process_unit(trial: &Trial, leg: Leg, config: &PhaseConfig) -> UnitOutcome {
    let mut timer = UnitMetrics::start_timing();

    let events = match config.event_detector().detect_for_leg(trial, leg, &config.grf_channel) {
        Ok(events) => events,
        Err(error) => return classify_error(trial, leg, error, timer.finish(0)),
    };

    let anchors = events.anchors(config.anchor_event);
    timer.record_events(anchors.len());
    if anchors.is_empty() {
        let metrics = timer.finish(0);
        warn!(subject = trial.subject(), task = trial.task(), leg = leg.token(), "Skipping unit: no transitions");
        return UnitOutcome::Skipped {
            reason: SkipReason::NoTransitions,
            metrics,
        };
    }

    let candidates = stride_candidates(anchors, trial.time());
    let selection = config.outlier_filter().apply(&candidates);
    timer.record_selection(candidates.len(), &selection);

    if selection.is_empty() {
        let metrics = timer.finish(0);
        warn!(
            subject = trial.subject(),
            task = trial.task(),
            leg = leg.token(),
            candidates = candidates.len(),
            "Skipping unit: no valid strides"
        );
        return UnitOutcome::Skipped {
            reason: SkipReason::NoValidStrides {
                candidates: candidates.len(),
            },
            metrics,
        };
    }

    let normalizer = PhaseNormalizer::new(config.num_phase_points, config.phase_units)
        .with_derivatives(config.derivatives.clone());

    let mut cycles = Vec::with_capacity(selection.strides.len());
    for (number, stride) in selection.strides.iter().enumerate() {
        match normalizer.normalize(trial, stride, leg, number as i64) {
            Ok(cycle) => cycles.push(cycle),
            Err(error) => return classify_error(trial, leg, error, timer.finish(cycles.len())),
        }
    }

    let metrics = timer.finish(cycles.len());
    debug!(
        subject = trial.subject(),
        task = trial.task(),
        leg = leg.token(),
        candidates = metrics.candidates,
        rejected = metrics.rejected_non_positive + metrics.rejected_outliers,
        cycles = metrics.cycles,
        time_us = metrics.processing_time_us,
        "Processed unit"
    );

    UnitOutcome::Processed { cycles, metrics }
}

fn classify_error(trial: &Trial, leg: Leg, error: GaitError, metrics: UnitMetrics) -> UnitOutcome {
    if error.is_malformed_input() {
        warn!(
            subject = trial.subject(),
            task = trial.task(),
            leg = leg.token(),
            reason = %error,
            "Skipping unit: malformed input"
        );
        UnitOutcome::Skipped {
            reason: SkipReason::MalformedInput {
                reason: error.to_string(),
            },
            metrics,
        }
    } else {
        warn!(
            subject = trial.subject(),
            task = trial.task(),
            leg = leg.token(),
            error = %error,
            "Unit failed"
        );
        UnitOutcome::Failed { error, metrics }
    }
}
