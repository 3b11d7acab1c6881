//! Curve with optional per-point uncertainty channels.

use crate::curve::Curve;
use crate::error::{Error, Result};
use crate::math::Interpolator;

/// A [`Curve`] plus optional `xerr`/`yerr` arrays.
///
/// The presence flags are independent: either, both, or neither channel
/// may be set. When present, an error array has exactly the curve's
/// length. Resampling propagates through each present channel with its
/// own interpolant over the same new abscissae.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveUncertain {
    curve: Curve,
    xerr: Option<Vec<f64>>,
    yerr: Option<Vec<f64>>,
}

impl CurveUncertain {
    pub fn new(curve: Curve, xerr: Option<Vec<f64>>, yerr: Option<Vec<f64>>) -> Result<Self> {
        for (name, channel) in [("xerr", &xerr), ("yerr", &yerr)] {
            if let Some(err) = channel {
                if err.len() != curve.len() {
                    return Err(Error::LengthMismatch(format!(
                        "{name}: expected {} values, got {}",
                        curve.len(),
                        err.len()
                    )));
                }
            }
        }
        Ok(Self { curve, xerr, yerr })
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    pub fn xerr(&self) -> Option<&[f64]> {
        self.xerr.as_deref()
    }

    pub fn yerr(&self) -> Option<&[f64]> {
        self.yerr.as_deref()
    }

    /// Resample the curve and each present error channel onto `new_x`.
    pub fn resample(&self, new_x: &[f64], interp: &dyn Interpolator) -> Result<CurveUncertain> {
        let curve = self.curve.resample(new_x, interp)?;
        let xerr = self
            .xerr
            .as_ref()
            .map(|err| interp.interpolate(self.curve.x(), err, new_x))
            .transpose()?;
        let yerr = self
            .yerr
            .as_ref()
            .map(|err| interp.interpolate(self.curve.x(), err, new_x))
            .transpose()?;
        CurveUncertain::new(curve, xerr, yerr)
    }

    pub fn resample_in_place(&mut self, new_x: &[f64], interp: &dyn Interpolator) -> Result<()> {
        *self = self.resample(new_x, interp)?;
        Ok(())
    }

    /// Element-wise comparison within a floating tolerance, including
    /// channel presence.
    pub fn approx_eq(&self, other: &CurveUncertain, tol: f64) -> bool {
        let channel_eq = |a: &Option<Vec<f64>>, b: &Option<Vec<f64>>| match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| (x - y).abs() <= tol + tol * y.abs())
            }
            _ => false,
        };
        self.curve.approx_eq(&other.curve, tol)
            && channel_eq(&self.xerr, &other.xerr)
            && channel_eq(&self.yerr, &other.yerr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Linear;

    fn base() -> Curve {
        Curve::new(vec![0.0, 1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0, 40.0]).unwrap()
    }

    #[test]
    fn error_channel_length_is_checked() {
        assert!(CurveUncertain::new(base(), Some(vec![1.0; 4]), None).is_ok());
        assert!(matches!(
            CurveUncertain::new(base(), Some(vec![1.0; 3]), None),
            Err(Error::LengthMismatch(_))
        ));
        assert!(matches!(
            CurveUncertain::new(base(), None, Some(vec![1.0; 5])),
            Err(Error::LengthMismatch(_))
        ));
    }

    #[test]
    fn resample_propagates_only_present_channels() {
        let grid = [0.5, 1.5, 2.5];

        let neither = CurveUncertain::new(base(), None, None).unwrap();
        let out = neither.resample(&grid, &Linear).unwrap();
        assert!(out.xerr().is_none() && out.yerr().is_none());

        let both = CurveUncertain::new(
            base(),
            Some(vec![0.1, 0.2, 0.3, 0.4]),
            Some(vec![1.0, 2.0, 3.0, 4.0]),
        )
        .unwrap();
        let out = both.resample(&grid, &Linear).unwrap();
        assert!((out.xerr().unwrap()[0] - 0.15).abs() < 1e-12);
        assert!((out.yerr().unwrap()[1] - 2.5).abs() < 1e-12);
        assert_eq!(out.curve().len(), 3);
    }

    #[test]
    fn yerr_only_keeps_xerr_absent() {
        let yerr_only = CurveUncertain::new(base(), None, Some(vec![1.0; 4])).unwrap();
        let out = yerr_only.resample(&[1.0, 2.0], &Linear).unwrap();
        assert!(out.xerr().is_none());
        assert!(out.yerr().is_some());
    }
}
