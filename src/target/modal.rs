//! Experimental dispersion target curve with uncertainty.
//!
//! A modal target is the measured curve an inversion is asked to fit:
//! frequency/velocity samples with a per-point velocity standard
//! deviation, plus a description of which physical modes the curve could
//! represent (ambiguity is allowed; the same curve may plausibly be the
//! fundamental mode of more than one wave type pending model selection).
//!
//! The samples are re-sorted ascending by frequency on every structural
//! mutation, because downstream interpolation assumes monotone abscissae.
//!
//! The engine serializes uncertainty in a version-dependent domain
//! (slowness half-width for 2.10.1, log half-width for 3.4.2); both
//! formulas and their algebraic inverses live here so the container and
//! CSV layers share one implementation.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{EngineVersion, ResampleDomain, Spacing, WaveType};
use crate::error::{Error, Result};
use crate::math::{CubicSpline, Interpolator};

/// One experimental dispersion target curve.
///
/// Invariants: `frequency`, `velocity`, and `velstd` have the same
/// non-zero length; frequency and velocity are strictly positive, velstd
/// non-negative; frequency is sorted ascending; `description` is
/// non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalTarget {
    frequency: Vec<f64>,
    velocity: Vec<f64>,
    velstd: Vec<f64>,
    description: Vec<(WaveType, usize)>,
}

impl ModalTarget {
    /// Construct with the default description (fundamental Rayleigh mode).
    pub fn new(frequency: Vec<f64>, velocity: Vec<f64>, velstd: Vec<f64>) -> Result<Self> {
        Self::with_description(frequency, velocity, velstd, vec![(WaveType::Rayleigh, 0)])
    }

    /// Construct with an explicit candidate-mode description.
    pub fn with_description(
        frequency: Vec<f64>,
        velocity: Vec<f64>,
        velstd: Vec<f64>,
        description: Vec<(WaveType, usize)>,
    ) -> Result<Self> {
        let n = frequency.len();
        for (name, seq) in [("velocity", &velocity), ("velstd", &velstd)] {
            if seq.len() != n {
                return Err(Error::LengthMismatch(format!(
                    "target: |frequency|={n} but |{name}|={}",
                    seq.len()
                )));
            }
        }
        if n == 0 {
            return Err(Error::LengthMismatch("target: no samples".into()));
        }
        for (name, seq) in [("frequency", &frequency), ("velocity", &velocity)] {
            if let Some(bad) = seq.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
                return Err(Error::InvalidValue(format!(
                    "{name} value {bad} must be finite and > 0"
                )));
            }
        }
        if let Some(bad) = velstd.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(Error::InvalidValue(format!(
                "velstd value {bad} must be finite and >= 0"
            )));
        }
        if description.is_empty() {
            return Err(Error::InvalidValue(
                "target description needs at least one (wave, mode) candidate".into(),
            ));
        }
        let mut target = Self {
            frequency,
            velocity,
            velstd,
            description,
        };
        target.sort_by_frequency();
        Ok(target)
    }

    /// Construct from a single coefficient of variation applied per point.
    pub fn from_cov(frequency: Vec<f64>, velocity: Vec<f64>, cov: f64) -> Result<Self> {
        if !(cov.is_finite() && cov >= 0.0) {
            return Err(Error::InvalidValue(format!("cov {cov} must be >= 0")));
        }
        let velstd = velocity.iter().map(|v| v * cov).collect();
        Self::new(frequency, velocity, velstd)
    }

    /// Construct with zero uncertainty.
    pub fn without_uncertainty(frequency: Vec<f64>, velocity: Vec<f64>) -> Result<Self> {
        let velstd = vec![0.0; velocity.len()];
        Self::new(frequency, velocity, velstd)
    }

    pub fn frequency(&self) -> &[f64] {
        &self.frequency
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    pub fn velstd(&self) -> &[f64] {
        &self.velstd
    }

    pub fn description(&self) -> &[(WaveType, usize)] {
        &self.description
    }

    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    /// Coefficient of variation per point: velstd / velocity.
    pub fn cov(&self) -> Vec<f64> {
        self.velstd
            .iter()
            .zip(&self.velocity)
            .map(|(s, v)| s / v)
            .collect()
    }

    /// Slowness (s/m) per point: 1 / velocity.
    pub fn slowness(&self) -> Vec<f64> {
        self.velocity.iter().map(|v| 1.0 / v).collect()
    }

    /// Wavelength (m) per point: velocity / frequency.
    pub fn wavelength(&self) -> Vec<f64> {
        self.velocity
            .iter()
            .zip(&self.frequency)
            .map(|(v, f)| v / f)
            .collect()
    }

    /// Pseudo-depth per point: wavelength / `depth_factor`.
    ///
    /// A factor below 2 has no empirical support and is clamped to 2 with
    /// a warning rather than rejected.
    pub fn pseudo_depth(&self, depth_factor: f64) -> Result<Vec<f64>> {
        if !(depth_factor.is_finite() && depth_factor > 0.0) {
            return Err(Error::InvalidValue(format!(
                "depth factor {depth_factor} must be > 0"
            )));
        }
        let factor = if depth_factor < 2.0 {
            warn!(depth_factor, "depth factor below 2; clamping to 2");
            2.0
        } else {
            depth_factor
        };
        Ok(self.wavelength().iter().map(|w| w / factor).collect())
    }

    /// Pseudo-Vs per point: velocity × `velocity_factor`.
    pub fn pseudo_vs(&self, velocity_factor: f64) -> Result<Vec<f64>> {
        if !(velocity_factor.is_finite() && velocity_factor > 0.0) {
            return Err(Error::InvalidValue(format!(
                "velocity factor {velocity_factor} must be > 0"
            )));
        }
        if velocity_factor < 1.0 {
            warn!(velocity_factor, "velocity factor below 1 underestimates vs");
        }
        Ok(self.velocity.iter().map(|v| v * velocity_factor).collect())
    }

    /// Rayleigh velocity at 40 m wavelength, via wavelength-domain
    /// interpolation. `None` when 40 m lies outside the observed
    /// wavelength range.
    pub fn vr40(&self) -> Option<f64> {
        let (wavelength, velocity, _) = self.by_wavelength();
        let (lo, hi) = (*wavelength.first()?, *wavelength.last()?);
        if !(lo..=hi).contains(&40.0) {
            return None;
        }
        CubicSpline
            .interpolate(&wavelength, &velocity, &[40.0])
            .ok()
            .map(|v| v[0])
    }

    /// Keep only the points whose frequency (or wavelength) lies in
    /// `[min, max]`. Reversed bounds are swapped with a warning; removing
    /// every point is an error.
    pub fn cut(&mut self, min: f64, max: f64, domain: ResampleDomain) -> Result<()> {
        let (min, max) = if min > max {
            warn!(min, max, "cut bounds were reversed; swapping");
            (max, min)
        } else {
            (min, max)
        };
        let keys = match domain {
            ResampleDomain::Frequency => self.frequency.clone(),
            ResampleDomain::Wavelength => self.wavelength(),
        };
        let keep: Vec<bool> = keys.iter().map(|k| (min..=max).contains(k)).collect();
        if !keep.iter().any(|&k| k) {
            return Err(Error::EmptyInput(format!(
                "cut to [{min}, {max}] removed every point"
            )));
        }
        let filter = |seq: &[f64]| -> Vec<f64> {
            seq.iter()
                .zip(&keep)
                .filter(|(_, &k)| k)
                .map(|(v, _)| *v)
                .collect()
        };
        self.frequency = filter(&self.frequency);
        self.velocity = filter(&self.velocity);
        self.velstd = filter(&self.velstd);
        self.sort_by_frequency();
        Ok(())
    }

    /// Resample onto a generated grid of `n` points in `[pmin, pmax]`.
    ///
    /// The grid is linear- or log-spaced in the frequency or wavelength
    /// domain. Reversed bounds are swapped and a grid reaching beyond the
    /// observed data range is clamped to it, both with a warning. Velocity
    /// and COV are interpolated with a cubic spline (COV rather than
    /// velstd directly, preserving the relative-uncertainty shape), and in
    /// the wavelength domain frequency is reconstructed as
    /// `velocity / wavelength` from the resampled velocity. That
    /// reconstruction is a single pass matching the engine's convention,
    /// not a fixed-point iteration.
    pub fn easy_resample(
        &self,
        pmin: f64,
        pmax: f64,
        n: usize,
        spacing: Spacing,
        domain: ResampleDomain,
    ) -> Result<Self> {
        if n < 2 {
            return Err(Error::InvalidValue(format!(
                "resampling needs at least 2 points, got {n}"
            )));
        }
        let (mut lo, mut hi) = if pmin > pmax {
            warn!(pmin, pmax, "resampling bounds were reversed; swapping");
            (pmax, pmin)
        } else {
            (pmin, pmax)
        };
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0) {
            return Err(Error::InvalidValue(format!(
                "resampling bounds [{lo}, {hi}] must be finite and positive"
            )));
        }

        let (xs, velocity, cov) = match domain {
            ResampleDomain::Frequency => {
                (self.frequency.clone(), self.velocity.clone(), self.cov())
            }
            ResampleDomain::Wavelength => self.by_wavelength(),
        };
        let (obs_lo, obs_hi) = (xs[0], xs[xs.len() - 1]);
        if lo < obs_lo {
            warn!(
                requested = lo,
                observed = obs_lo,
                "grid start clamped to the observed data range"
            );
            lo = obs_lo;
        }
        if hi > obs_hi {
            warn!(
                requested = hi,
                observed = obs_hi,
                "grid end clamped to the observed data range"
            );
            hi = obs_hi;
        }
        if lo >= hi {
            return Err(Error::InvalidValue(format!(
                "resampling range [{lo}, {hi}] is degenerate after clamping"
            )));
        }

        let grid = spaced_grid(lo, hi, n, spacing);
        let new_velocity = CubicSpline.interpolate(&xs, &velocity, &grid)?;
        let new_cov = CubicSpline.interpolate(&xs, &cov, &grid)?;

        let (frequency, velocity) = match domain {
            ResampleDomain::Frequency => (grid, new_velocity),
            ResampleDomain::Wavelength => {
                let frequency = new_velocity.iter().zip(&grid).map(|(v, w)| v / w).collect();
                (frequency, new_velocity)
            }
        };
        // Cubic overshoot can push an interpolated COV fractionally below
        // zero between near-zero samples; clamp rather than reject.
        let velstd = velocity
            .iter()
            .zip(&new_cov)
            .map(|(v, c)| v * c.max(0.0))
            .collect();
        Self::with_description(frequency, velocity, velstd, self.description.clone())
    }

    /// [`ModalTarget::easy_resample`], mutating in place.
    pub fn easy_resample_in_place(
        &mut self,
        pmin: f64,
        pmax: f64,
        n: usize,
        spacing: Spacing,
        domain: ResampleDomain,
    ) -> Result<()> {
        *self = self.easy_resample(pmin, pmax, n, spacing, domain)?;
        Ok(())
    }

    /// Per-point stddev in the engine's serialized domain.
    ///
    /// Engine 2.10.1 stores a slowness-domain half-width:
    /// `s = (1/(v−σ) − 1/(v+σ)) / 2 = σ / (v² − σ²)`.
    /// Engine 3.4.2 stores a log-domain half-width:
    /// `L = ln((v+σ)/(v−σ)) / 2`.
    /// Both degenerate when `σ ≥ v`, which is rejected.
    pub fn engine_stddev(velocity: f64, velstd: f64, version: EngineVersion) -> Result<f64> {
        if velstd >= velocity {
            return Err(Error::InvalidValue(format!(
                "velstd {velstd} >= velocity {velocity}; the {version} uncertainty transform degenerates"
            )));
        }
        match version {
            EngineVersion::V2 => Ok(velstd / (velocity * velocity - velstd * velstd)),
            EngineVersion::V3 => Ok(((velocity + velstd) / (velocity - velstd)).ln() / 2.0),
        }
    }

    /// Algebraic inverse of [`ModalTarget::engine_stddev`] given the
    /// recovered velocity.
    ///
    /// For 2.10.1 the quadratic `s·σ² + σ − s·v² = 0` solves to
    /// `σ = (−1 + √(1 + 4s²v²)) / (2s)`, with `σ = 0` at `s = 0`; for
    /// 3.4.2 the inverse is `σ = v·tanh(L)`.
    pub fn velstd_from_engine(velocity: f64, stddev: f64, version: EngineVersion) -> f64 {
        match version {
            EngineVersion::V2 => {
                if stddev == 0.0 {
                    0.0
                } else {
                    (-1.0 + (1.0 + 4.0 * stddev * stddev * velocity * velocity).sqrt())
                        / (2.0 * stddev)
                }
            }
            EngineVersion::V3 => velocity * stddev.tanh(),
        }
    }

    /// Emit `#`-comment metadata (description and engine version) followed
    /// by `frequency,velocity,velstd` rows.
    pub fn write_csv<W: Write>(&self, w: &mut W, version: EngineVersion) -> Result<()> {
        let description = self
            .description
            .iter()
            .map(|(wave, mode)| format!("{wave} {mode}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(w, "# Description: {description}")?;
        writeln!(w, "# Engine: {version}")?;
        let mut csv = csv::Writer::from_writer(&mut *w);
        for i in 0..self.len() {
            csv.serialize(CsvRow {
                frequency: self.frequency[i],
                velocity: self.velocity[i],
                velstd: self.velstd[i],
            })?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Parse the CSV target format, returning the target and the engine
    /// version named in the metadata.
    pub fn from_csv(text: &str) -> Result<(Self, EngineVersion)> {
        let mut description = Vec::new();
        let mut version = None;
        for line in text.lines() {
            let Some(body) = line.trim_start().strip_prefix('#') else {
                continue;
            };
            let body = body.trim();
            if let Some(rest) = body.strip_prefix("Description:") {
                for item in rest.split(',') {
                    let mut tokens = item.split_whitespace();
                    let (Some(wave), Some(mode)) = (tokens.next(), tokens.next()) else {
                        return Err(Error::Format(format!(
                            "bad description entry '{}'",
                            item.trim()
                        )));
                    };
                    let mode = mode
                        .parse()
                        .map_err(|_| Error::Format(format!("bad mode number '{mode}'")))?;
                    description.push((wave.parse::<WaveType>()?, mode));
                }
            } else if let Some(rest) = body.strip_prefix("Engine:") {
                version = Some(rest.trim().parse::<EngineVersion>()?);
            }
        }
        let version =
            version.ok_or_else(|| Error::Format("missing '# Engine:' metadata line".into()))?;

        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .from_reader(text.as_bytes());
        let mut frequency = Vec::new();
        let mut velocity = Vec::new();
        let mut velstd = Vec::new();
        for row in reader.deserialize() {
            let row: CsvRow = row?;
            frequency.push(row.frequency);
            velocity.push(row.velocity);
            velstd.push(row.velstd);
        }
        if frequency.is_empty() {
            return Err(Error::EmptyInput("no target rows found".into()));
        }
        let target = if description.is_empty() {
            Self::new(frequency, velocity, velstd)?
        } else {
            Self::with_description(frequency, velocity, velstd, description)?
        };
        Ok((target, version))
    }

    /// Element-wise comparison within a floating tolerance; descriptions
    /// must match exactly.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        let seq_eq = |a: &[f64], b: &[f64]| {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| (x - y).abs() <= tol + tol * y.abs())
        };
        self.description == other.description
            && seq_eq(&self.frequency, &other.frequency)
            && seq_eq(&self.velocity, &other.velocity)
            && seq_eq(&self.velstd, &other.velstd)
    }

    /// Re-establish the ascending-frequency invariant.
    fn sort_by_frequency(&mut self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.frequency[a].total_cmp(&self.frequency[b]));
        let permute = |seq: &[f64]| order.iter().map(|&i| seq[i]).collect();
        self.frequency = permute(&self.frequency);
        self.velocity = permute(&self.velocity);
        self.velstd = permute(&self.velstd);
    }

    /// The samples reordered by ascending wavelength:
    /// `(wavelength, velocity, cov)`.
    fn by_wavelength(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let wavelength = self.wavelength();
        let cov = self.cov();
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| wavelength[a].total_cmp(&wavelength[b]));
        let permute = |seq: &[f64]| order.iter().map(|&i| seq[i]).collect();
        (
            permute(&wavelength),
            permute(&self.velocity),
            permute(&cov),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    frequency: f64,
    velocity: f64,
    velstd: f64,
}

/// `n` points from `lo` to `hi` inclusive, linear- or log-spaced.
fn spaced_grid(lo: f64, hi: f64, n: usize, spacing: Spacing) -> Vec<f64> {
    let steps = (n - 1) as f64;
    match spacing {
        Spacing::Linear => (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / steps)
            .collect(),
        Spacing::Log => {
            let (la, lb) = (lo.log10(), hi.log10());
            (0..n)
                .map(|i| 10f64.powf(la + (lb - la) * i as f64 / steps))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ModalTarget {
        ModalTarget::new(
            vec![1.0, 2.0, 5.0, 10.0],
            vec![400.0, 300.0, 200.0, 150.0],
            vec![40.0, 30.0, 20.0, 15.0],
        )
        .unwrap()
    }

    #[test]
    fn construction_sorts_by_frequency() {
        let t = ModalTarget::new(
            vec![5.0, 1.0, 2.0],
            vec![200.0, 400.0, 300.0],
            vec![20.0, 40.0, 30.0],
        )
        .unwrap();
        assert_eq!(t.frequency(), &[1.0, 2.0, 5.0]);
        assert_eq!(t.velocity(), &[400.0, 300.0, 200.0]);
        assert_eq!(t.velstd(), &[40.0, 30.0, 20.0]);
    }

    #[test]
    fn from_cov_scales_velocity() {
        let t = ModalTarget::from_cov(vec![1.0, 2.0], vec![400.0, 300.0], 0.05).unwrap();
        assert_eq!(t.velstd(), &[20.0, 15.0]);
        assert!(matches!(
            ModalTarget::from_cov(vec![1.0], vec![400.0], -0.1),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn derived_quantities() {
        let t = target();
        assert_eq!(t.wavelength(), vec![400.0, 150.0, 40.0, 15.0]);
        assert_eq!(t.slowness()[0], 1.0 / 400.0);
        assert_eq!(t.cov(), vec![0.1, 0.1, 0.1, 0.1]);
    }

    #[test]
    fn pseudo_depth_clamps_small_factors() {
        let t = target();
        // Factor 1 is clamped to 2.
        let clamped = t.pseudo_depth(1.0).unwrap();
        let at_two = t.pseudo_depth(2.0).unwrap();
        assert_eq!(clamped, at_two);
        assert_eq!(at_two[0], 200.0);

        let at_three = t.pseudo_depth(3.0).unwrap();
        assert!((at_three[0] - 400.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn pseudo_vs_scales_velocity() {
        let t = target();
        let vs = t.pseudo_vs(1.1).unwrap();
        assert!((vs[0] - 440.0).abs() < 1e-12);
        assert!(t.pseudo_vs(0.0).is_err());
    }

    #[test]
    fn cut_in_frequency_domain() {
        let mut t = target();
        t.cut(2.0, 5.0, ResampleDomain::Frequency).unwrap();
        assert_eq!(t.frequency(), &[2.0, 5.0]);
        assert_eq!(t.velocity(), &[300.0, 200.0]);
    }

    #[test]
    fn cut_swaps_reversed_bounds_and_rejects_emptying() {
        let mut t = target();
        t.cut(150.0, 30.0, ResampleDomain::Wavelength).unwrap();
        assert_eq!(t.frequency(), &[2.0, 5.0]);

        let mut t = target();
        assert!(matches!(
            t.cut(1000.0, 2000.0, ResampleDomain::Frequency),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn resample_in_frequency_domain_hits_the_grid() {
        let t = target();
        let out = t
            .easy_resample(1.0, 10.0, 10, Spacing::Linear, ResampleDomain::Frequency)
            .unwrap();
        assert_eq!(out.len(), 10);
        assert!((out.frequency()[0] - 1.0).abs() < 1e-12);
        assert!((out.frequency()[9] - 10.0).abs() < 1e-12);
        // Knots are reproduced.
        assert!((out.frequency()[1] - 2.0).abs() < 1e-12);
        assert!((out.velocity()[1] - 300.0).abs() < 1e-9);
        assert_eq!(out.description(), t.description());
    }

    #[test]
    fn log_spacing_is_geometric() {
        let t = target();
        let out = t
            .easy_resample(1.0, 4.0, 3, Spacing::Log, ResampleDomain::Frequency)
            .unwrap();
        assert!((out.frequency()[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn resample_clamps_to_observed_range() {
        let t = target();
        let out = t
            .easy_resample(0.1, 100.0, 5, Spacing::Linear, ResampleDomain::Frequency)
            .unwrap();
        assert!((out.frequency()[0] - 1.0).abs() < 1e-12);
        assert!((out.frequency()[4] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn wavelength_resample_reconstructs_frequency() {
        let t = target();
        let out = t
            .easy_resample(20.0, 300.0, 8, Spacing::Log, ResampleDomain::Wavelength)
            .unwrap();
        assert_eq!(out.len(), 8);
        // frequency = velocity / wavelength at each grid point, so
        // velocity / frequency recovers the wavelength grid.
        let mut wavelength = out.wavelength();
        wavelength.sort_by(f64::total_cmp);
        assert!((wavelength[0] - 20.0).abs() < 1e-9);
        assert!((wavelength[7] - 300.0).abs() < 1e-9);
    }

    #[test]
    fn resample_with_reversed_bounds_swaps() {
        let t = target();
        let out = t
            .easy_resample(10.0, 1.0, 4, Spacing::Linear, ResampleDomain::Frequency)
            .unwrap();
        assert!((out.frequency()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn in_place_resample_matches_copy() {
        let t = target();
        let copied = t
            .easy_resample(1.0, 10.0, 6, Spacing::Linear, ResampleDomain::Frequency)
            .unwrap();
        let mut mutated = t.clone();
        mutated
            .easy_resample_in_place(1.0, 10.0, 6, Spacing::Linear, ResampleDomain::Frequency)
            .unwrap();
        assert!(copied.approx_eq(&mutated, 1e-12));
    }

    #[test]
    fn vr40_interpolates_in_wavelength() {
        // Constant 200 m/s: wavelengths run 20..200 m, so 40 m is inside
        // and the interpolated velocity is 200.
        let t = ModalTarget::without_uncertainty(
            vec![1.0, 2.0, 4.0, 10.0],
            vec![200.0, 200.0, 200.0, 200.0],
        )
        .unwrap();
        assert!((t.vr40().unwrap() - 200.0).abs() < 1e-9);

        // Wavelengths top out at 20 m: no 40 m sample.
        let t =
            ModalTarget::without_uncertainty(vec![1.0, 2.0, 4.0], vec![20.0, 20.0, 20.0]).unwrap();
        assert!(t.vr40().is_none());
    }

    #[test]
    fn engine_stddev_known_values() {
        // v=100, sigma=5.
        let s2 = ModalTarget::engine_stddev(100.0, 5.0, EngineVersion::V2).unwrap();
        assert!((s2 - 5.0 / 9975.0).abs() < 1e-15);
        let s3 = ModalTarget::engine_stddev(100.0, 5.0, EngineVersion::V3).unwrap();
        assert!((s3 - (105.0f64 / 95.0).ln() / 2.0).abs() < 1e-15);
        // The two conventions are genuinely different numbers.
        assert!((s2 - s3).abs() > 1e-4);
    }

    #[test]
    fn engine_stddev_inverts_exactly() {
        for version in [EngineVersion::V2, EngineVersion::V3] {
            for (v, sigma) in [(100.0, 5.0), (250.0, 0.0), (180.0, 44.9)] {
                let stored = ModalTarget::engine_stddev(v, sigma, version).unwrap();
                let back = ModalTarget::velstd_from_engine(v, stored, version);
                assert!(
                    (back - sigma).abs() < 1e-9,
                    "{version}: v={v} sigma={sigma} back={back}"
                );
            }
        }
    }

    #[test]
    fn degenerate_uncertainty_is_rejected() {
        for version in [EngineVersion::V2, EngineVersion::V3] {
            assert!(matches!(
                ModalTarget::engine_stddev(100.0, 100.0, version),
                Err(Error::InvalidValue(_))
            ));
            assert!(ModalTarget::engine_stddev(100.0, 120.0, version).is_err());
        }
    }

    #[test]
    fn csv_round_trips_data_and_metadata() {
        let t = ModalTarget::with_description(
            vec![1.0, 2.0, 5.0],
            vec![400.0, 300.0, 200.0],
            vec![40.0, 30.0, 20.0],
            vec![(WaveType::Rayleigh, 0), (WaveType::Love, 1)],
        )
        .unwrap();
        let mut buf = Vec::new();
        t.write_csv(&mut buf, EngineVersion::V3).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("# Description: Rayleigh 0, Love 1\n# Engine: 3.4.2\n"));

        let (back, version) = ModalTarget::from_csv(&text).unwrap();
        assert_eq!(version, EngineVersion::V3);
        assert!(back.approx_eq(&t, 1e-12));
    }

    #[test]
    fn csv_without_version_tag_is_a_format_error() {
        let text = "frequency,velocity,velstd\n1.0,100.0,5.0\n";
        assert!(matches!(
            ModalTarget::from_csv(text),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn csv_without_rows_is_empty_input() {
        let text = "# Engine: 2.10.1\nfrequency,velocity,velstd\n";
        assert!(matches!(
            ModalTarget::from_csv(text),
            Err(Error::EmptyInput(_))
        ));
    }
}
