//! Minimal `(x, y)` pair containers and resampling.
//!
//! [`Curve`] is the base container every specialized curve builds on;
//! [`CurveUncertain`] decorates it with optional per-point error channels.

pub mod uncertain;

pub use uncertain::CurveUncertain;

use crate::error::{Error, Result};
use crate::math::Interpolator;

/// Ordered sequence of `(x, y)` float pairs.
///
/// Invariant: `x` and `y` have the same non-zero length and every value is
/// finite. Positivity (and any other domain constraint) is the call site's
/// business via [`Curve::validated`].
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Curve {
    /// Construct from raw samples.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::LengthMismatch(format!(
                "curve: |x|={} but |y|={}",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(Error::LengthMismatch("curve: empty sample arrays".into()));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(Error::InvalidValue("curve: non-finite sample".into()));
        }
        Ok(Self { x, y })
    }

    /// Construct with an additional per-pair domain check.
    pub fn validated(
        x: Vec<f64>,
        y: Vec<f64>,
        check: impl Fn(f64, f64) -> Result<()>,
    ) -> Result<Self> {
        let curve = Self::new(x, y)?;
        for (&xv, &yv) in curve.x.iter().zip(&curve.y) {
            check(xv, yv)?;
        }
        Ok(curve)
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Resample onto `new_x`, returning a new curve.
    pub fn resample(&self, new_x: &[f64], interp: &dyn Interpolator) -> Result<Curve> {
        let new_y = interp.interpolate(&self.x, &self.y, new_x)?;
        Curve::new(new_x.to_vec(), new_y)
    }

    /// Resample onto `new_x` in place.
    pub fn resample_in_place(&mut self, new_x: &[f64], interp: &dyn Interpolator) -> Result<()> {
        let resampled = self.resample(new_x, interp)?;
        *self = resampled;
        Ok(())
    }

    /// Element-wise comparison within a floating tolerance.
    pub fn approx_eq(&self, other: &Curve, tol: f64) -> bool {
        self.len() == other.len()
            && self
                .x
                .iter()
                .zip(&other.x)
                .chain(self.y.iter().zip(&other.y))
                .all(|(a, b)| (a - b).abs() <= tol + tol * b.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{CubicSpline, Linear};

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(matches!(
            Curve::new(vec![1.0, 2.0], vec![1.0]),
            Err(Error::LengthMismatch(_))
        ));
        assert!(matches!(
            Curve::new(vec![], vec![]),
            Err(Error::LengthMismatch(_))
        ));
    }

    #[test]
    fn validator_runs_per_pair() {
        let positive = |x: f64, y: f64| {
            if x > 0.0 && y > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidValue(format!("non-positive pair ({x}, {y})")))
            }
        };
        assert!(Curve::validated(vec![1.0, 2.0], vec![3.0, 4.0], positive).is_ok());
        assert!(matches!(
            Curve::validated(vec![1.0, -2.0], vec![3.0, 4.0], positive),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn resample_copy_and_in_place_agree() {
        let curve = Curve::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 4.0, 9.0]).unwrap();
        let grid = [0.5, 1.5, 2.5];

        let copied = curve.resample(&grid, &CubicSpline).unwrap();

        let mut mutated = curve.clone();
        mutated.resample_in_place(&grid, &CubicSpline).unwrap();

        assert!(copied.approx_eq(&mutated, 1e-12));
        assert_eq!(copied.len(), 3);
    }

    #[test]
    fn caller_supplied_interpolation_replaces_the_default() {
        let curve = Curve::new(vec![0.0, 2.0, 4.0], vec![0.0, 4.0, 0.0]).unwrap();
        let linear = curve.resample(&[1.0], &Linear).unwrap();
        assert!((linear.y()[0] - 2.0).abs() < 1e-12);

        // A custom strategy is just another Interpolator impl.
        struct NearestLeft;
        impl Interpolator for NearestLeft {
            fn interpolate(&self, xs: &[f64], ys: &[f64], new_xs: &[f64]) -> Result<Vec<f64>> {
                Ok(new_xs
                    .iter()
                    .map(|&x| {
                        let i = xs.partition_point(|&k| k <= x).saturating_sub(1);
                        ys[i]
                    })
                    .collect())
            }
        }
        let nearest = curve.resample(&[1.0], &NearestLeft).unwrap();
        assert_eq!(nearest.y()[0], 0.0);
    }
}
