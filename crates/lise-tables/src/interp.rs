//! Piecewise-linear interpolation over tabulated points.
//!
//! Range tables are sampled at discrete energies. Between knots the relation
//! is interpolated linearly; outside the knots the first or last segment is
//! extended, the same way a graph evaluation would.

use crate::provider::TableError;

/// A piecewise-linear interpolator for real-valued data.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    /// Strictly increasing x values (knots).
    xs: Vec<f64>,
    /// Corresponding y values.
    ys: Vec<f64>,
}

impl LinearInterpolator {
    /// Construct from data points.
    ///
    /// # Arguments
    /// * `xs` - Strictly increasing x values.
    /// * `ys` - Corresponding y values (same length as `xs`).
    ///
    /// # Errors
    /// Fails if the lengths differ, fewer than 2 points are provided, any
    /// value is not finite, or `xs` is not strictly increasing.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, TableError> {
        if xs.len() != ys.len() {
            return Err(TableError::Interpolation(format!(
                "xs and ys must have equal length ({} vs {})",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(TableError::Interpolation(
                "need at least 2 data points".into(),
            ));
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(TableError::Interpolation("non-finite value".into()));
        }
        for i in 1..xs.len() {
            if xs[i] <= xs[i - 1] {
                return Err(TableError::Interpolation(format!(
                    "xs must be strictly increasing at index {}",
                    i
                )));
            }
        }

        Ok(Self { xs, ys })
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Always false; construction requires at least two knots.
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// The `(first, last)` knot positions.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate at `x`.
    ///
    /// Extrapolation beyond the data range uses the boundary segment.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();

        // Binary search for the enclosing interval, clamped to the end segments
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let t = (x - self.xs[lo]) / (self.xs[hi] - self.xs[lo]);
        self.ys[lo] + t * (self.ys[hi] - self.ys[lo])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_passes_through_data_points() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = vec![2.0, 3.0, 5.0, 4.0, 1.0];
        let interp = LinearInterpolator::new(xs.clone(), ys.clone()).unwrap();

        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_abs_diff_eq!(interp.evaluate(*x), *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_midpoint_and_extrapolation() {
        let interp = LinearInterpolator::new(vec![0.0, 1.0, 3.0], vec![0.0, 2.0, 3.0]).unwrap();
        assert_abs_diff_eq!(interp.evaluate(0.5), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(interp.evaluate(2.0), 2.5, epsilon = 1e-12);
        // Left of the first knot: slope 2
        assert_abs_diff_eq!(interp.evaluate(-1.0), -2.0, epsilon = 1e-12);
        // Right of the last knot: slope 0.5
        assert_abs_diff_eq!(interp.evaluate(5.0), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(LinearInterpolator::new(vec![1.0], vec![1.0]).is_err());
        assert!(LinearInterpolator::new(vec![1.0, 2.0], vec![1.0]).is_err());
        assert!(LinearInterpolator::new(vec![1.0, 1.0], vec![1.0, 2.0]).is_err());
        assert!(LinearInterpolator::new(vec![2.0, 1.0], vec![1.0, 2.0]).is_err());
        assert!(LinearInterpolator::new(vec![1.0, f64::NAN], vec![1.0, 2.0]).is_err());
    }
}
