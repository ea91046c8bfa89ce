//! Natural cubic spline and linear gap filling for local signal repair

/// Natural cubic spline through strictly increasing knots
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative at each knot
    m: Vec<f64>,
}

impl CubicSpline {
    /// Fit a spline; `None` if there are fewer than 3 knots, the knots are
    /// not strictly increasing, or any value is non-finite.
    pub fn fit(x: &[f64], y: &[f64]) -> Option<Self> {
        let n = x.len();
        if n < 3 || y.len() != n {
            return None;
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return None;
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        // Tridiagonal system for the interior second derivatives (Thomas algorithm)
        let interior = n - 2;
        let mut diag = vec![0.0; interior];
        let mut upper = vec![0.0; interior];
        let mut rhs = vec![0.0; interior];
        for k in 0..interior {
            let i = k + 1;
            diag[k] = 2.0 * (h[i - 1] + h[i]);
            upper[k] = h[i];
            rhs[k] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }

        for k in 1..interior {
            let lower = h[k];
            let factor = lower / diag[k - 1];
            diag[k] -= factor * upper[k - 1];
            rhs[k] -= factor * rhs[k - 1];
        }

        let mut m = vec![0.0; n];
        for k in (0..interior).rev() {
            let next = if k + 1 < interior { m[k + 2] } else { 0.0 };
            m[k + 1] = (rhs[k] - upper[k] * next) / diag[k];
        }

        if m.iter().any(|v| !v.is_finite()) {
            return None;
        }

        Some(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    /// Evaluate at `xq`; outside the knot range the end segments are extended
    pub fn evaluate(&self, xq: f64) -> f64 {
        let n = self.x.len();
        let segment = match self.x.partition_point(|&knot| knot <= xq) {
            0 => 0,
            p if p >= n => n - 2,
            p => p - 1,
        };

        let (x0, x1) = (self.x[segment], self.x[segment + 1]);
        let (y0, y1) = (self.y[segment], self.y[segment + 1]);
        let (m0, m1) = (self.m[segment], self.m[segment + 1]);
        let h = x1 - x0;
        let a = x1 - xq;
        let b = xq - x0;

        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Overwrite `values[start..=end]` with a straight line from `left` (at
/// `start - 1`) to `right` (at `end + 1`)
pub fn linear_fill(values: &mut [f64], start: usize, end: usize, left: f64, right: f64) {
    if start > end || end >= values.len() {
        return;
    }
    let span = (end - start + 2) as f64;
    for (offset, value) in values[start..=end].iter_mut().enumerate() {
        let fraction = (offset + 1) as f64 / span;
        *value = left + (right - left) * fraction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spline_passes_through_knots() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 1.0, 0.0, -1.0, 0.0];
        let spline = CubicSpline::fit(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((spline.evaluate(*xi) - yi).abs() < 1e-12);
        }
    }

    #[test]
    fn test_spline_reproduces_line() {
        let x = [0.0, 1.0, 3.0, 4.0, 7.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let spline = CubicSpline::fit(&x, &y).unwrap();
        assert!((spline.evaluate(2.0) - 5.0).abs() < 1e-12);
        assert!((spline.evaluate(5.5) - 12.0).abs() < 1e-12);
        // Extrapolation follows the end segment
        assert!((spline.evaluate(8.0) - 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_spline_rejects_bad_knots() {
        assert!(CubicSpline::fit(&[0.0, 1.0], &[0.0, 1.0]).is_none());
        assert!(CubicSpline::fit(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]).is_none());
        assert!(CubicSpline::fit(&[0.0, 1.0, 2.0], &[0.0, f64::NAN, 2.0]).is_none());
    }

    #[test]
    fn test_linear_fill() {
        let mut values = vec![0.0, 9.0, 9.0, 9.0, 4.0];
        linear_fill(&mut values, 1, 3, 0.0, 4.0);
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}
