//! Robust summary statistics used by the outlier filter and discontinuity
//! detection

use std::cmp::Ordering;

/// Sorted copy of the finite values in `data`
fn sorted_finite(data: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Median of the finite values, or `None` if there are none
pub fn median(data: &[f64]) -> Option<f64> {
    quantile(data, 0.5)
}

/// Quantile `q` in `[0, 1]` with linear interpolation between order
/// statistics (the default method of `numpy.percentile`)
pub fn quantile(data: &[f64], q: f64) -> Option<f64> {
    let sorted = sorted_finite(data);
    quantile_sorted(&sorted, q)
}

fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !q.is_finite() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// First and third quartiles
pub fn quartiles(data: &[f64]) -> Option<(f64, f64)> {
    let sorted = sorted_finite(data);
    Some((quantile_sorted(&sorted, 0.25)?, quantile_sorted(&sorted, 0.75)?))
}

/// Index and value of the largest finite element
pub fn argmax(data: &[f64]) -> Option<(usize, f64)> {
    data.iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}
