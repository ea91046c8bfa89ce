//! Gait-Processing: gait-cycle segmentation and phase normalization
//!
//! Detects heel strikes from ground reaction force, filters abnormal strides
//! and resamples each accepted stride onto a fixed phase grid. Also repairs
//! circular-shift discontinuities before differentiating cyclic signals.

pub mod pipeline;
pub mod processor;
pub mod config;
pub mod discontinuity;
pub mod derivative;
pub mod events;
pub mod strides;
pub mod normalizer;
pub mod sink;
pub mod spline;
pub mod stats;

pub use pipeline::*;
pub use processor::{process_unit, SkipReason, UnitMetrics, UnitOutcome};
pub use config::{ConfigProfile, PhaseConfig};
pub use discontinuity::{
    circular_shift, find_discontinuity, interpolate_discontinuity, locate_discontinuity,
    smooth_localized_spikes, Discontinuity, DiscontinuityOptions,
};
pub use derivative::{
    acceleration_from_velocity, velocity_from_angle, DerivativeConfig, DerivativeEstimator,
};
pub use events::{detect_events, AnchorEvent, EventDetector, GaitEvents};
pub use strides::{
    stride_candidates, IqrBounds, IqrMode, OutlierFilter, Stride, StrideCandidate, StrideSelection,
};
pub use normalizer::{phase_axis, resample_linear, PhaseCycle, PhaseNormalizer, PhaseUnits};
pub use sink::{CsvSink, MemorySink, TableSink, WriteMode};
