//! Detection and repair of the artificial jump left by circularly shifting a
//! cyclic signal
//!
//! Phase-normalized cycles are often rotated so that 0% phase lands on a
//! different event than the one the recording started with. A signal whose
//! end does not meet its start then carries exactly one seam, and
//! differentiating across it produces a single large spurious peak. The
//! functions here locate that seam and smooth it locally. They never fail:
//! inputs that are too short or degenerate come back unchanged, and a spline
//! that cannot be fitted falls back to linear interpolation.

use crate::spline::{linear_fill, CubicSpline};
use crate::stats;
use gait_core::ChannelStats;
use serde::{Deserialize, Serialize};

/// Minimum number of anchor points needed to fit a repair spline
const MIN_ANCHORS: usize = 4;

/// Reference standard deviation below which spike detection is skipped
const MIN_REFERENCE_STD: f64 = 1e-10;

/// Tunables for discontinuity detection and repair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscontinuityOptions {
    /// Largest jump must exceed this multiple of the median jump
    pub threshold_factor: f64,
    /// Half-width of the neighborhood rewritten by `interpolate_discontinuity`
    pub interpolation_window: usize,
    /// Half-width of the region checked by `smooth_localized_spikes`
    pub spike_window: usize,
    /// Width of each flanking reference window used for spike statistics
    pub comparison_window: usize,
    /// z-score above which a sample counts as a spike
    pub threshold_std: f64,
}

impl Default for DiscontinuityOptions {
    fn default() -> Self {
        Self {
            threshold_factor: 3.0,
            interpolation_window: 3,
            spike_window: 5,
            comparison_window: 15,
            threshold_std: 2.5,
        }
    }
}

/// Location and size of a detected jump
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discontinuity {
    /// Index of the first sample after the jump
    pub index: usize,
    /// Absolute size of the jump
    pub magnitude: f64,
}

/// Locate the single largest adjacent jump if it stands out from the typical
/// step size by more than `threshold_factor`.
pub fn locate_discontinuity(sequence: &[f64], threshold_factor: f64) -> Option<Discontinuity> {
    if sequence.len() < 3 {
        return None;
    }

    let jumps: Vec<f64> = sequence.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let median_jump = stats::median(&jumps)?;
    let (i, max_jump) = stats::argmax(&jumps)?;

    if median_jump > 0.0 && max_jump > threshold_factor * median_jump {
        Some(Discontinuity {
            index: i + 1,
            magnitude: max_jump,
        })
    } else {
        None
    }
}

/// Index just after the discontinuity, if one is present
pub fn find_discontinuity(sequence: &[f64], threshold_factor: f64) -> Option<usize> {
    locate_discontinuity(sequence, threshold_factor).map(|d| d.index)
}

/// Rotate `sequence` right by `offset` samples (`out[i] = in[i - offset]`)
pub fn circular_shift(sequence: &[f64], offset: usize) -> Vec<f64> {
    let n = sequence.len();
    if n == 0 {
        return Vec::new();
    }
    let split = n - offset % n;
    let mut shifted = Vec::with_capacity(n);
    shifted.extend_from_slice(&sequence[split..]);
    shifted.extend_from_slice(&sequence[..split]);
    shifted
}

/// Inclusive `[index - half_width, index + half_width]` clipped to `len`
fn clipped_region(index: usize, half_width: usize, len: usize) -> (usize, usize) {
    (index.saturating_sub(half_width), (index + half_width).min(len - 1))
}

/// Replace `[start, end]` with a spline through the anchors, or a straight
/// line between the samples bordering the region when no spline can be fitted
fn repair_region(sequence: &[f64], start: usize, end: usize, anchors: &[usize]) -> Vec<f64> {
    let mut repaired = sequence.to_vec();

    let x: Vec<f64> = anchors.iter().map(|&i| i as f64).collect();
    let y: Vec<f64> = anchors.iter().map(|&i| sequence[i]).collect();

    match CubicSpline::fit(&x, &y) {
        Some(spline) => {
            for (i, value) in repaired.iter_mut().enumerate().take(end + 1).skip(start) {
                *value = spline.evaluate(i as f64);
            }
        }
        None => {
            let before = start.checked_sub(1).map(|i| sequence[i]);
            let after = sequence.get(end + 1).copied();
            let (left, right) = match (before, after) {
                (Some(l), Some(r)) => (l, r),
                (Some(l), None) => (l, l),
                (None, Some(r)) => (r, r),
                (None, None) => return repaired,
            };
            if left.is_finite() && right.is_finite() {
                linear_fill(&mut repaired, start, end, left, right);
            }
        }
    }

    repaired
}

/// Smooth the neighborhood of a known jump so it can be differentiated.
///
/// Anchors are up to `window + 2` samples before and `window + 3` samples
/// after the `±window` neighborhood around `index`. With fewer than four
/// anchors the input is returned unchanged.
pub fn interpolate_discontinuity(sequence: &[f64], index: usize, window: usize) -> Vec<f64> {
    let len = sequence.len();
    if len == 0 || index >= len {
        return sequence.to_vec();
    }

    let (start, end) = clipped_region(index, window, len);
    let left_from = start.saturating_sub(window + 2);
    let right_to = (end + 1 + window + 3).min(len);

    let anchors: Vec<usize> = (left_from..start).chain(end + 1..right_to).collect();
    if anchors.len() < MIN_ANCHORS {
        return sequence.to_vec();
    }

    repair_region(sequence, start, end, &anchors)
}

/// Replace the `±window` region around `index` when any of its samples is a
/// spike relative to the flanking `comparison_window` samples.
pub fn smooth_localized_spikes(
    sequence: &[f64],
    index: usize,
    window: usize,
    comparison_window: usize,
    threshold_std: f64,
) -> Vec<f64> {
    let len = sequence.len();
    if len == 0 || index >= len {
        return sequence.to_vec();
    }

    let (start, end) = clipped_region(index, window, len);
    let left_from = start.saturating_sub(comparison_window);
    let right_to = (end + 1 + comparison_window).min(len);

    let reference: Vec<usize> = (left_from..start)
        .chain(end + 1..right_to)
        .filter(|&i| sequence[i].is_finite())
        .collect();
    if reference.len() < MIN_ANCHORS {
        return sequence.to_vec();
    }

    let values: Vec<f64> = reference.iter().map(|&i| sequence[i]).collect();
    let reference_stats = ChannelStats::calculate(&values);
    if reference_stats.std_dev < MIN_REFERENCE_STD {
        return sequence.to_vec();
    }

    let has_spike = sequence[start..=end].iter().any(|v| {
        !v.is_finite() || ((v - reference_stats.mean) / reference_stats.std_dev).abs() > threshold_std
    });
    if !has_spike {
        return sequence.to_vec();
    }

    repair_region(sequence, start, end, &reference)
}
