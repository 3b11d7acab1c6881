//! Interpolation primitives used by every resampling operation.
//!
//! All resampling in this crate goes through the [`Interpolator`] trait so
//! that callers can swap the default cubic spline for their own scheme
//! (the strategy is an explicit parameter, not a subclass hook).
//!
//! Implementation choices:
//! - The cubic spline uses natural boundary conditions (zero second
//!   derivative at both ends) and solves the interior second-derivative
//!   system with nalgebra. The system is tridiagonal and diagonally
//!   dominant, so a dense LU solve is both robust and cheap at the sizes
//!   seen here (tens of points per curve).
//! - Evaluation outside the knot range is an error, not an extrapolation.
//!   Callers that generate grids are expected to clamp to the observed
//!   range first.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Strategy for evaluating a sampled function at new abscissae.
pub trait Interpolator {
    /// Interpolate `(xs, ys)` at each of `new_xs`.
    ///
    /// `xs` must be strictly increasing and the same length as `ys`.
    fn interpolate(&self, xs: &[f64], ys: &[f64], new_xs: &[f64]) -> Result<Vec<f64>>;
}

fn check_knots(xs: &[f64], ys: &[f64], min_len: usize) -> Result<()> {
    if xs.len() != ys.len() {
        return Err(Error::LengthMismatch(format!(
            "interpolation knots: |x|={} but |y|={}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < min_len {
        return Err(Error::InvalidValue(format!(
            "interpolation needs at least {min_len} points, got {}",
            xs.len()
        )));
    }
    for w in xs.windows(2) {
        if w[1] <= w[0] {
            return Err(Error::InvalidValue(format!(
                "interpolation abscissae must be strictly increasing ({} then {})",
                w[0], w[1]
            )));
        }
    }
    Ok(())
}

/// Locate the knot interval containing `x`, with a small relative slack at
/// both ends so grid endpoints computed in floating point still land
/// inside the data range.
fn locate(xs: &[f64], x: f64) -> Result<usize> {
    let lo = xs[0];
    let hi = xs[xs.len() - 1];
    let slack = 1e-9 * (hi - lo).abs().max(1.0);
    if x < lo - slack || x > hi + slack {
        return Err(Error::InvalidValue(format!(
            "interpolation point {x} outside data range [{lo}, {hi}]"
        )));
    }
    let x = x.clamp(lo, hi);
    // partition_point returns the first knot > x; the containing interval
    // starts one before that.
    let idx = xs.partition_point(|&k| k <= x);
    Ok(idx.saturating_sub(1).min(xs.len() - 2))
}

/// Piecewise-linear interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl Interpolator for Linear {
    fn interpolate(&self, xs: &[f64], ys: &[f64], new_xs: &[f64]) -> Result<Vec<f64>> {
        check_knots(xs, ys, 2)?;
        let mut out = Vec::with_capacity(new_xs.len());
        for &x in new_xs {
            let i = locate(xs, x)?;
            let t = (x.clamp(xs[0], xs[xs.len() - 1]) - xs[i]) / (xs[i + 1] - xs[i]);
            out.push(ys[i] + t * (ys[i + 1] - ys[i]));
        }
        Ok(out)
    }
}

/// Natural cubic spline interpolation (the default everywhere).
///
/// Falls back to linear interpolation for 2-point data, where a cubic is
/// underdetermined.
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicSpline;

impl CubicSpline {
    /// Solve for the second derivative at each knot (natural boundary:
    /// zero at both ends).
    fn second_derivatives(xs: &[f64], ys: &[f64]) -> Result<Vec<f64>> {
        let n = xs.len();
        let m = n - 2;
        let mut mat = DMatrix::<f64>::zeros(m, m);
        let mut rhs = DVector::<f64>::zeros(m);

        for i in 1..n - 1 {
            let h0 = xs[i] - xs[i - 1];
            let h1 = xs[i + 1] - xs[i];
            let row = i - 1;
            if row > 0 {
                mat[(row, row - 1)] = h0 / 6.0;
            }
            mat[(row, row)] = (h0 + h1) / 3.0;
            if row + 1 < m {
                mat[(row, row + 1)] = h1 / 6.0;
            }
            rhs[row] = (ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0;
        }

        let solved = mat
            .lu()
            .solve(&rhs)
            .ok_or_else(|| Error::InvalidValue("singular spline system".into()))?;

        let mut d2 = vec![0.0; n];
        for (i, v) in solved.iter().enumerate() {
            d2[i + 1] = *v;
        }
        Ok(d2)
    }
}

impl Interpolator for CubicSpline {
    fn interpolate(&self, xs: &[f64], ys: &[f64], new_xs: &[f64]) -> Result<Vec<f64>> {
        check_knots(xs, ys, 2)?;
        if xs.len() == 2 {
            return Linear.interpolate(xs, ys, new_xs);
        }

        let d2 = Self::second_derivatives(xs, ys)?;
        let mut out = Vec::with_capacity(new_xs.len());
        for &x in new_xs {
            let i = locate(xs, x)?;
            let x = x.clamp(xs[0], xs[xs.len() - 1]);
            let h = xs[i + 1] - xs[i];
            let a = (xs[i + 1] - x) / h;
            let b = (x - xs[i]) / h;
            let val = a * ys[i]
                + b * ys[i + 1]
                + ((a * a * a - a) * d2[i] + (b * b * b - b) * d2[i + 1]) * h * h / 6.0;
            out.push(val);
        }
        Ok(out)
    }
}
