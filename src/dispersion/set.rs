//! One velocity model's full set of modal dispersion curves.

use std::collections::BTreeMap;
use std::io::Write;

use crate::dispersion::suite;
use crate::dispersion::DispersionCurve;
use crate::domain::{Limit, WaveType};
use crate::error::{Error, Result};

/// Mode-number → curve mapping for one wave type.
///
/// A `BTreeMap` keyed by the small non-negative mode numbers gives the
/// ascending-mode iteration order the serializer needs.
pub type ModeMap = BTreeMap<usize, DispersionCurve>;

/// All modal curves computed for a single velocity model.
///
/// Invariant: at least one of `rayleigh`/`love` is present and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionSet {
    identifier: usize,
    misfit: f64,
    rayleigh: Option<ModeMap>,
    love: Option<ModeMap>,
}

impl DispersionSet {
    pub fn new(
        identifier: usize,
        misfit: f64,
        rayleigh: Option<ModeMap>,
        love: Option<ModeMap>,
    ) -> Result<Self> {
        if !(misfit.is_finite() && misfit >= 0.0) {
            return Err(Error::InvalidValue(format!("misfit {misfit} must be >= 0")));
        }
        let empty = |m: &Option<ModeMap>| m.as_ref().map_or(true, |m| m.is_empty());
        if empty(&rayleigh) && empty(&love) {
            return Err(Error::InvalidValue(
                "a dispersion set needs at least one Rayleigh or Love mode".into(),
            ));
        }
        Ok(Self {
            identifier,
            misfit,
            rayleigh,
            love,
        })
    }

    pub fn identifier(&self) -> usize {
        self.identifier
    }

    pub fn misfit(&self) -> f64 {
        self.misfit
    }

    pub fn rayleigh(&self) -> Option<&ModeMap> {
        self.rayleigh.as_ref()
    }

    pub fn love(&self) -> Option<&ModeMap> {
        self.love.as_ref()
    }

    /// Mode map for the given wave type, if present.
    pub fn modes(&self, wave: WaveType) -> Option<&ModeMap> {
        match wave {
            WaveType::Rayleigh => self.rayleigh(),
            WaveType::Love => self.love(),
        }
    }

    /// Parse the first model's record out of a report stream.
    ///
    /// `nrayleigh`/`nlove` cap the number of modes taken per wave type
    /// (`Limit::Count(0)` skips a wave type entirely); the caps are
    /// applied during parsing, so suppressed modes cost nothing.
    pub fn from_report(text: &str, nrayleigh: Limit, nlove: Limit) -> Result<Self> {
        let mut sets = suite::scan_sets(text, Limit::Count(1), nrayleigh, nlove)?;
        // scan_sets guarantees at least one record or an error.
        Ok(sets.remove(0))
    }

    /// Emit this model's record in the engine's bracketed structure.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        for wave in [WaveType::Rayleigh, WaveType::Love] {
            let Some(modes) = self.modes(wave) else {
                continue;
            };
            writeln!(
                w,
                "# Layered model {}: value={}",
                self.identifier, self.misfit
            )?;
            writeln!(w, "# {} {} dispersion mode(s)", modes.len(), wave)?;
            writeln!(w, "# CPU Time = 0 ms")?;
            for (mode, curve) in modes {
                writeln!(w, "# Mode {mode}")?;
                curve.write_points(w)?;
            }
        }
        Ok(())
    }

    /// Structural comparison within a floating tolerance on curve data.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        let maps_eq = |a: Option<&ModeMap>, b: Option<&ModeMap>| match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((ka, ca), (kb, cb))| {
                        ka == kb && ca.approx_eq(cb, tol)
                    })
            }
            _ => false,
        };
        self.identifier == other.identifier
            && (self.misfit - other.misfit).abs() <= tol + tol * other.misfit.abs()
            && maps_eq(self.rayleigh(), other.rayleigh())
            && maps_eq(self.love(), other.love())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(freqs: &[f64]) -> DispersionCurve {
        let vels: Vec<f64> = freqs.iter().map(|f| 100.0 + f).collect();
        DispersionCurve::new(freqs.to_vec(), vels).unwrap()
    }

    fn mode_map(n: usize) -> ModeMap {
        (0..n).map(|k| (k, curve(&[1.0, 2.0, 3.0]))).collect()
    }

    #[test]
    fn both_wave_types_absent_is_an_error() {
        assert!(DispersionSet::new(0, 0.5, None, None).is_err());
        assert!(DispersionSet::new(0, 0.5, Some(ModeMap::new()), None).is_err());
        assert!(DispersionSet::new(0, 0.5, Some(mode_map(1)), None).is_ok());
    }

    #[test]
    fn write_then_parse_round_trips_structurally() {
        let set =
            DispersionSet::new(4, 0.875, Some(mode_map(2)), Some(mode_map(1))).unwrap();
        let mut buf = Vec::new();
        set.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let back = DispersionSet::from_report(&text, Limit::All, Limit::All).unwrap();
        assert!(set.approx_eq(&back, 1e-12));
    }

    #[test]
    fn from_report_takes_only_the_first_model() {
        let a = DispersionSet::new(0, 0.5, Some(mode_map(1)), None).unwrap();
        let b = DispersionSet::new(1, 0.25, Some(mode_map(1)), None).unwrap();
        let mut buf = Vec::new();
        a.write_to(&mut buf).unwrap();
        b.write_to(&mut buf).unwrap();

        let parsed = DispersionSet::from_report(
            std::str::from_utf8(&buf).unwrap(),
            Limit::All,
            Limit::All,
        )
        .unwrap();
        assert_eq!(parsed.identifier(), 0);
    }

    #[test]
    fn mode_cap_truncates_during_parse() {
        let set = DispersionSet::new(0, 0.5, Some(mode_map(3)), None).unwrap();
        let mut buf = Vec::new();
        set.write_to(&mut buf).unwrap();

        let parsed = DispersionSet::from_report(
            std::str::from_utf8(&buf).unwrap(),
            Limit::Count(2),
            Limit::All,
        )
        .unwrap();
        assert_eq!(parsed.rayleigh().unwrap().len(), 2);
        assert!(parsed.rayleigh().unwrap().contains_key(&0));
        assert!(parsed.rayleigh().unwrap().contains_key(&1));
    }
}
