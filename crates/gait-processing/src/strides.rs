//! Stride segmentation between consecutive anchor events and IQR-based
//! rejection of abnormal stride durations

use crate::stats;
use serde::{Deserialize, Serialize};

/// Relative floor applied to the IQR so near-identical durations are not
/// rejected over floating-point rounding
const RELATIVE_IQR_FLOOR: f64 = 1e-6;

/// Which IQR fence rejects strides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IqrMode {
    /// Reject durations outside `[Q1 - k·IQR, Q3 + k·IQR]`
    TwoSided,
    /// Reject only durations above `Q3 + k·IQR`
    UpperOnly,
}

impl Default for IqrMode {
    fn default() -> Self {
        IqrMode::TwoSided
    }
}

/// Span between two consecutive anchor events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrideCandidate {
    pub start_index: usize,
    /// Index of the next anchor event (inclusive end of the cycle)
    pub end_index: usize,
    pub duration_s: f64,
}

/// Stride accepted by the outlier filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stride {
    pub start_index: usize,
    pub end_index: usize,
    pub duration_s: f64,
}

impl Stride {
    /// Samples in the stride, both anchors included
    pub fn sample_count(&self) -> usize {
        self.end_index.saturating_sub(self.start_index) + 1
    }
}

impl From<StrideCandidate> for Stride {
    fn from(candidate: StrideCandidate) -> Self {
        Self {
            start_index: candidate.start_index,
            end_index: candidate.end_index,
            duration_s: candidate.duration_s,
        }
    }
}

/// Pair each anchor with the next one. Anchors outside `time` are ignored.
pub fn stride_candidates(anchors: &[usize], time: &[f64]) -> Vec<StrideCandidate> {
    anchors
        .windows(2)
        .filter(|pair| pair[1] < time.len())
        .map(|pair| StrideCandidate {
            start_index: pair[0],
            end_index: pair[1],
            duration_s: time[pair[1]] - time[pair[0]],
        })
        .collect()
}

/// Fences computed from the positive stride durations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    /// IQR after the degeneracy floor
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Result of filtering one unit's stride candidates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrideSelection {
    pub strides: Vec<Stride>,
    pub rejected_non_positive: usize,
    pub rejected_outliers: usize,
    /// `None` when no candidate had a positive duration
    pub bounds: Option<IqrBounds>,
}

impl StrideSelection {
    pub fn is_empty(&self) -> bool {
        self.strides.is_empty()
    }
}

/// Stride-duration outlier filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierFilter {
    pub multiplier: f64,
    pub mode: IqrMode,
}

impl OutlierFilter {
    pub fn new(multiplier: f64, mode: IqrMode) -> Self {
        Self { multiplier, mode }
    }

    /// Fences for a set of positive durations
    pub fn bounds(&self, durations: &[f64]) -> Option<IqrBounds> {
        let (q1, q3) = stats::quartiles(durations)?;
        let median = stats::median(durations)?;
        let iqr = (q3 - q1)
            .max(RELATIVE_IQR_FLOOR * median.abs())
            .max(f64::EPSILON);

        Some(IqrBounds {
            q1,
            q3,
            iqr,
            lower: q1 - self.multiplier * iqr,
            upper: q3 + self.multiplier * iqr,
        })
    }

    pub fn apply(&self, candidates: &[StrideCandidate]) -> StrideSelection {
        let (positive, non_positive): (Vec<StrideCandidate>, Vec<StrideCandidate>) = candidates
            .iter()
            .copied()
            .partition(|c| c.duration_s.is_finite() && c.duration_s > 0.0);

        let durations: Vec<f64> = positive.iter().map(|c| c.duration_s).collect();
        let bounds = match self.bounds(&durations) {
            Some(bounds) => bounds,
            None => {
                return StrideSelection {
                    strides: Vec::new(),
                    rejected_non_positive: non_positive.len(),
                    rejected_outliers: 0,
                    bounds: None,
                }
            }
        };

        let accepted: Vec<Stride> = positive
            .iter()
            .filter(|c| {
                let d = c.duration_s;
                match self.mode {
                    IqrMode::TwoSided => d >= bounds.lower && d <= bounds.upper,
                    IqrMode::UpperOnly => d <= bounds.upper,
                }
            })
            .map(|&c| Stride::from(c))
            .collect();

        StrideSelection {
            rejected_non_positive: non_positive.len(),
            rejected_outliers: positive.len() - accepted.len(),
            strides: accepted,
            bounds: Some(bounds),
        }
    }
}
