//! A single mode's dispersion curve.

use std::io::Write;

use crate::curve::Curve;
use crate::domain::WaveType;
use crate::error::{Error, Result};
use crate::io::scan;
use crate::math::Interpolator;

/// Frequency/velocity samples for one dispersion mode.
///
/// Frequency is in Hz, velocity in m/s; both strictly positive. The
/// stored y-channel is velocity; the engine's text format stores slowness,
/// which is derived at write time and inverted at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionCurve {
    curve: Curve,
}

impl DispersionCurve {
    pub fn new(frequency: Vec<f64>, velocity: Vec<f64>) -> Result<Self> {
        let curve = Curve::validated(frequency, velocity, |f, v| {
            if f <= 0.0 {
                Err(Error::InvalidValue(format!("non-positive frequency {f}")))
            } else if v <= 0.0 {
                Err(Error::InvalidValue(format!("non-positive velocity {v}")))
            } else {
                Ok(())
            }
        })?;
        Ok(Self { curve })
    }

    pub fn frequency(&self) -> &[f64] {
        self.curve.x()
    }

    pub fn velocity(&self) -> &[f64] {
        self.curve.y()
    }

    pub fn len(&self) -> usize {
        self.curve.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curve.is_empty()
    }

    /// Wavelength (m) per sample: velocity / frequency.
    pub fn wavelength(&self) -> Vec<f64> {
        self.frequency()
            .iter()
            .zip(self.velocity())
            .map(|(f, v)| v / f)
            .collect()
    }

    /// Slowness (s/m) per sample: 1 / velocity.
    pub fn slowness(&self) -> Vec<f64> {
        self.velocity().iter().map(|v| 1.0 / v).collect()
    }

    /// Resample onto new frequencies.
    pub fn resample(&self, frequency: &[f64], interp: &dyn Interpolator) -> Result<Self> {
        let curve = self.curve.resample(frequency, interp)?;
        Ok(Self { curve })
    }

    /// Parse `<frequency> <slowness>` data lines from a mode block.
    ///
    /// Collection stops at the first frequency below its predecessor:
    /// frequencies are expected monotone within a mode, so a drop means a
    /// runaway match into a following block, and the input is silently
    /// truncated there rather than erroring.
    pub(crate) fn from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Self> {
        let mut frequency = Vec::new();
        let mut velocity = Vec::new();
        for line in lines {
            let Some((f, p)) = scan::parse_pair(line) else {
                continue;
            };
            if let Some(&prev) = frequency.last() {
                if f < prev {
                    break;
                }
            }
            if p <= 0.0 {
                return Err(Error::Format(format!("non-positive slowness {p}")));
            }
            frequency.push(f);
            velocity.push(1.0 / p);
        }
        if frequency.is_empty() {
            return Err(Error::Format("no frequency/slowness pairs found".into()));
        }
        Self::new(frequency, velocity)
    }

    /// Parse the first mode block out of `text`.
    pub fn from_report(text: &str) -> Result<Self> {
        Self::from_lines(text.lines())
    }

    /// Emit `<frequency> <slowness>` data lines.
    pub fn write_points<W: Write>(&self, w: &mut W) -> Result<()> {
        for (f, v) in self.frequency().iter().zip(self.velocity()) {
            writeln!(w, "{} {}", f, 1.0 / v)?;
        }
        Ok(())
    }

    /// Emit this curve wrapped in the engine's full multi-mode block
    /// structure (single mode), for single-curve export.
    pub fn write_block<W: Write>(
        &self,
        w: &mut W,
        identifier: usize,
        misfit: f64,
        wave: WaveType,
        mode: usize,
    ) -> Result<()> {
        writeln!(w, "# Layered model {identifier}: value={misfit}")?;
        writeln!(w, "# 1 {wave} dispersion mode(s)")?;
        writeln!(w, "# CPU Time = 0 ms")?;
        writeln!(w, "# Mode {mode}")?;
        self.write_points(w)
    }

    /// Element-wise comparison within a floating tolerance.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.curve.approx_eq(&other.curve, tol)
    }
}
