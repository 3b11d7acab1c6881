//! A layered earth model.
//!
//! Layers are parallel sequences of thickness (m), Vp (m/s), Vs (m/s),
//! and mass density (kg/m³). The last layer is conventionally the
//! half-space and carries thickness 0.
//!
//! Numerical notes:
//! - `discretize` maps real-valued layer boundaries onto a fixed-step
//!   grid with fractional accumulation and carry, so rounding never
//!   drifts cumulatively across layers.
//! - boundary comparisons during profile merging use a small absolute
//!   slack so sums of thicknesses that should coincide are treated as one
//!   boundary.

use std::fmt;
use std::io::Write;

use tracing::debug;

use crate::domain::ModelParameter;
use crate::error::{Error, Result};
use crate::io::scan;

/// Synthetic bottom depth of the half-space in stair-step profiles
/// (stands in for infinity when plotting).
pub const HALF_SPACE_DEPTH: f64 = 9999.0;

/// Slack for merging nearly-coincident layer boundaries.
const BOUNDARY_EPS: f64 = 1e-9;

/// A layered ground profile with identifier/misfit metadata.
///
/// Invariants: the four per-layer sequences have the same non-zero
/// length, every value is non-negative, and `vp > vs` strictly in every
/// layer (anything else has no physical Poisson's ratio).
#[derive(Debug, Clone, PartialEq)]
pub struct GroundModel {
    thickness: Vec<f64>,
    vp: Vec<f64>,
    vs: Vec<f64>,
    density: Vec<f64>,
    identifier: usize,
    misfit: f64,
}

impl GroundModel {
    pub fn new(
        thickness: Vec<f64>,
        vp: Vec<f64>,
        vs: Vec<f64>,
        density: Vec<f64>,
    ) -> Result<Self> {
        Self::with_metadata(thickness, vp, vs, density, 0, 0.0)
    }

    pub fn with_metadata(
        thickness: Vec<f64>,
        vp: Vec<f64>,
        vs: Vec<f64>,
        density: Vec<f64>,
        identifier: usize,
        misfit: f64,
    ) -> Result<Self> {
        let nlay = thickness.len();
        for (name, seq) in [("vp", &vp), ("vs", &vs), ("density", &density)] {
            if seq.len() != nlay {
                return Err(Error::LengthMismatch(format!(
                    "ground model: |thickness|={nlay} but |{name}|={}",
                    seq.len()
                )));
            }
        }
        if nlay == 0 {
            return Err(Error::LengthMismatch("ground model: no layers".into()));
        }
        for (name, seq) in [
            ("thickness", &thickness),
            ("vp", &vp),
            ("vs", &vs),
            ("density", &density),
        ] {
            if let Some(bad) = seq.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
                return Err(Error::PhysicalConstraint(format!(
                    "{name} value {bad} must be finite and >= 0"
                )));
            }
        }
        for (i, (p, s)) in vp.iter().zip(&vs).enumerate() {
            if p <= s {
                return Err(Error::PhysicalConstraint(format!(
                    "layer {i}: vp={p} must exceed vs={s}"
                )));
            }
        }
        if !(misfit.is_finite() && misfit >= 0.0) {
            return Err(Error::InvalidValue(format!("misfit {misfit} must be >= 0")));
        }
        Ok(Self {
            thickness,
            vp,
            vs,
            density,
            identifier,
            misfit,
        })
    }

    pub fn thickness(&self) -> &[f64] {
        &self.thickness
    }

    pub fn vp(&self) -> &[f64] {
        &self.vp
    }

    pub fn vs(&self) -> &[f64] {
        &self.vs
    }

    pub fn density(&self) -> &[f64] {
        &self.density
    }

    pub fn nlay(&self) -> usize {
        self.thickness.len()
    }

    pub fn identifier(&self) -> usize {
        self.identifier
    }

    pub fn misfit(&self) -> f64 {
        self.misfit
    }

    /// Poisson's ratio for a single (vp, vs) pair.
    ///
    /// With `r = vp/vs`: `pr = (2 − r²) / (2 − 2r²)`. Requires
    /// `vp > vs > 0` and a strictly positive result (a ratio near 1 is
    /// numerically degenerate and non-physical).
    pub fn poissons_ratio(vp: f64, vs: f64) -> Result<f64> {
        if vs <= 0.0 {
            return Err(Error::PhysicalConstraint(format!(
                "vs={vs} must be positive to define Poisson's ratio"
            )));
        }
        if vp <= vs {
            return Err(Error::PhysicalConstraint(format!(
                "vp={vp} must exceed vs={vs}"
            )));
        }
        let r2 = (vp / vs) * (vp / vs);
        let pr = (2.0 - r2) / (2.0 - 2.0 * r2);
        if pr <= 0.0 {
            return Err(Error::PhysicalConstraint(format!(
                "Poisson's ratio {pr} <= 0 for vp={vp}, vs={vs}"
            )));
        }
        Ok(pr)
    }

    /// Per-layer values of the selected parameter.
    fn layer_values(&self, parameter: ModelParameter) -> Result<Vec<f64>> {
        match parameter {
            ModelParameter::Vp => Ok(self.vp.clone()),
            ModelParameter::Vs => Ok(self.vs.clone()),
            ModelParameter::Density => Ok(self.density.clone()),
            ModelParameter::PoissonRatio => self
                .vp
                .iter()
                .zip(&self.vs)
                .map(|(&p, &s)| Self::poissons_ratio(p, s))
                .collect(),
        }
    }

    /// Piecewise-constant plotting profile for the selected parameter.
    ///
    /// Returns `(depth, value)` where depth alternates the top and bottom
    /// of each layer; the final layer's bottom is [`HALF_SPACE_DEPTH`]
    /// (the half-space extends to infinity). Each layer's value appears
    /// at both its top and bottom breakpoint.
    pub fn stair_step(&self, parameter: ModelParameter) -> Result<(Vec<f64>, Vec<f64>)> {
        let values = self.layer_values(parameter)?;
        let nlay = self.nlay();
        let mut depth = Vec::with_capacity(2 * nlay);
        let mut profile = Vec::with_capacity(2 * nlay);
        let mut top = 0.0;
        for (i, (&tk, &v)) in self.thickness.iter().zip(&values).enumerate() {
            let bottom = if i == nlay - 1 {
                HALF_SPACE_DEPTH
            } else {
                top + tk
            };
            depth.push(top);
            depth.push(bottom);
            profile.push(v);
            profile.push(v);
            top = bottom;
        }
        Ok((depth, profile))
    }

    /// Rasterize the selected parameter onto a uniform depth grid.
    ///
    /// The grid is `[0, step, 2·step, …, max_depth]` with exactly
    /// `round(max_depth/step) + 1` points regardless of layer count or
    /// boundary alignment. Each layer claims `thickness/step` grid
    /// samples; the fractional part accumulates and triggers one extra
    /// sample when it reaches 1, then resets, so boundary rounding never
    /// drifts. The half-space fills all remaining points.
    pub fn discretize(
        &self,
        max_depth: f64,
        step: f64,
        parameter: ModelParameter,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        if !(max_depth.is_finite() && max_depth > 0.0) {
            return Err(Error::InvalidValue(format!("max_depth {max_depth} must be > 0")));
        }
        if !(step.is_finite() && step > 0.0 && step <= max_depth) {
            return Err(Error::InvalidValue(format!(
                "step {step} must be in (0, {max_depth}]"
            )));
        }
        let values = self.layer_values(parameter)?;

        let n = (max_depth / step).round() as usize + 1;
        let depth: Vec<f64> = (0..n).map(|i| i as f64 * step).collect();
        let mut profile = vec![0.0; n];

        let mut start = 0usize;
        let mut residual = 0.0;
        for (&tk, &v) in self.thickness.iter().zip(&values) {
            if start >= n {
                break;
            }
            if tk == 0.0 {
                profile[start..].fill(v);
                start = n;
                break;
            }
            let float_samples = tk / step;
            let mut samples = float_samples.floor() as usize;
            residual += float_samples - float_samples.floor();
            if residual >= 1.0 - BOUNDARY_EPS {
                samples += 1;
                residual -= 1.0;
            }
            let stop = (start + samples).min(n);
            profile[start..stop].fill(v);
            start = stop;
        }
        if start < n {
            // Profile shallower than the grid without an explicit
            // half-space row; extend the deepest value.
            let last = *values.last().unwrap_or(&0.0);
            profile[start..].fill(last);
        }
        Ok((depth, profile))
    }

    /// Merge adjacent layers whose selected parameter is identical.
    ///
    /// Returns `(thickness, value)` with the trailing half-space
    /// convention (last thickness 0). Applying `simplify` to its own
    /// output returns the same arrays. The merged layering is what
    /// aligns otherwise differently-layered profiles before elementwise
    /// statistics.
    pub fn simplify(&self, parameter: ModelParameter) -> Result<(Vec<f64>, Vec<f64>)> {
        let values = self.layer_values(parameter)?;
        let mut thickness = Vec::new();
        let mut merged = Vec::new();
        let mut run = self.thickness[0];
        for i in 1..self.nlay() {
            if values[i] == values[i - 1] {
                run += self.thickness[i];
            } else {
                thickness.push(run);
                merged.push(values[i - 1]);
                run = self.thickness[i];
            }
        }
        thickness.push(0.0);
        merged.push(values[self.nlay() - 1]);
        Ok((thickness, merged))
    }

    /// Time-averaged shear-wave velocity over the top 30 m.
    ///
    /// Travel time accumulates layer by layer until cumulative depth
    /// reaches 30 m; a zero-thickness half-space reached earlier is
    /// treated as extending to exactly 30 m. Assumes positive vs.
    pub fn vs30(&self) -> f64 {
        let mut depth = 0.0;
        let mut travel_time = 0.0;
        for (&tk, &vs) in self.thickness.iter().zip(&self.vs) {
            let mut t = tk;
            if t == 0.0 || depth + t > 30.0 {
                t = 30.0 - depth;
            }
            travel_time += t / vs;
            depth += t;
            if depth >= 30.0 {
                break;
            }
        }
        30.0 / travel_time
    }

    /// Layer-top depths for a thickness sequence (same length; the
    /// half-space terminator contributes no boundary).
    pub fn thickness_to_depth(thickness: &[f64]) -> Vec<f64> {
        let mut depth = Vec::with_capacity(thickness.len());
        depth.push(0.0);
        for &tk in &thickness[..thickness.len().saturating_sub(1)] {
            let last = *depth.last().unwrap_or(&0.0);
            depth.push(last + tk);
        }
        depth
    }

    /// Thickness sequence for a layer-top depth sequence.
    ///
    /// The first depth must be 0; the output ends with the 0-thickness
    /// half-space. A single-layer model is `[0]` both ways.
    pub fn depth_to_thickness(depth: &[f64]) -> Result<Vec<f64>> {
        match depth.first() {
            Some(&first) if first == 0.0 => {}
            Some(&first) => {
                return Err(Error::InvalidValue(format!(
                    "first depth must be 0, got {first}"
                )))
            }
            None => return Err(Error::LengthMismatch("empty depth sequence".into())),
        }
        let mut thickness: Vec<f64> = depth.windows(2).map(|w| w[1] - w[0]).collect();
        thickness.push(0.0);
        Ok(thickness)
    }

    /// Build one unified model from three independently-layered simple
    /// profiles (vp, vs, density each with their own thickness breaks).
    ///
    /// The output layering is the union of all three boundary depths; a
    /// profile that reaches its zero-thickness half-space early repeats
    /// its last value for every remaining output layer.
    pub fn from_simple_profiles(
        vp_thickness: &[f64],
        vp: &[f64],
        vs_thickness: &[f64],
        vs: &[f64],
        density_thickness: &[f64],
        density: &[f64],
    ) -> Result<Self> {
        for (name, tk, values) in [
            ("vp", vp_thickness, vp),
            ("vs", vs_thickness, vs),
            ("density", density_thickness, density),
        ] {
            if tk.len() != values.len() {
                return Err(Error::LengthMismatch(format!(
                    "{name} profile: |thickness|={} but |values|={}",
                    tk.len(),
                    values.len()
                )));
            }
            if tk.is_empty() {
                return Err(Error::LengthMismatch(format!("{name} profile is empty")));
            }
        }

        let mut depths = Vec::new();
        for tk in [vp_thickness, vs_thickness, density_thickness] {
            depths.extend(Self::thickness_to_depth(tk));
        }
        depths.sort_by(f64::total_cmp);
        depths.dedup_by(|a, b| (*a - *b).abs() <= BOUNDARY_EPS);

        let sample = |tk: &[f64], values: &[f64]| -> Vec<f64> {
            let mut layer = 0usize;
            let mut bottom = tk[0];
            depths
                .iter()
                .map(|&d| {
                    while layer + 1 < tk.len() && tk[layer] != 0.0 && d >= bottom - BOUNDARY_EPS {
                        layer += 1;
                        bottom += tk[layer];
                    }
                    values[layer]
                })
                .collect()
        };

        let new_vp = sample(vp_thickness, vp);
        let new_vs = sample(vs_thickness, vs);
        let new_density = sample(density_thickness, density);
        let new_thickness = Self::depth_to_thickness(&depths)?;
        Self::new(new_thickness, new_vp, new_vs, new_density)
    }

    /// Parse the first model block out of a ground-model stream.
    ///
    /// Quad rows (`thickness vp vs density`) are collected until the
    /// zero-thickness half-space row; the layer-count line and
    /// annotations are skipped.
    pub fn from_report(text: &str) -> Result<Self> {
        Self::from_lines(text.lines())
    }

    pub(crate) fn from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Self> {
        let mut header: Option<scan::ModelHeader> = None;
        let mut declared: Option<usize> = None;
        let mut rows: Vec<[f64; 4]> = Vec::new();
        for line in lines {
            if let Some(h) = scan::parse_model_header(line) {
                if header.is_some() {
                    break;
                }
                header = Some(h);
            } else if header.is_some() {
                if let Some(quad) = scan::parse_quad(line) {
                    let half_space = quad[0] == 0.0;
                    rows.push(quad);
                    if half_space {
                        break;
                    }
                } else if rows.is_empty() && declared.is_none() {
                    declared = scan::parse_count(line);
                }
            }
        }
        if let (Some(declared), Some(h)) = (declared, header) {
            if declared != rows.len() {
                debug!(
                    model = h.identifier,
                    declared,
                    parsed = rows.len(),
                    "layer count line disagrees with parsed rows"
                );
            }
        }
        let header =
            header.ok_or_else(|| Error::Format("no ground model header found".into()))?;
        if rows.is_empty() {
            return Err(Error::Format(format!(
                "ground model {} has no layer rows",
                header.identifier
            )));
        }
        let thickness = rows.iter().map(|r| r[0]).collect();
        let vp = rows.iter().map(|r| r[1]).collect();
        let vs = rows.iter().map(|r| r[2]).collect();
        let density = rows.iter().map(|r| r[3]).collect();
        Self::with_metadata(
            thickness,
            vp,
            vs,
            density,
            header.identifier,
            header.misfit,
        )
    }

    /// Emit this model in the engine's text format.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(
            w,
            "# Layered model {}: value={}",
            self.identifier, self.misfit
        )?;
        writeln!(w, "{}", self.nlay())?;
        for i in 0..self.nlay() {
            writeln!(
                w,
                "{} {} {} {}",
                self.thickness[i], self.vp[i], self.vs[i], self.density[i]
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for GroundModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.write_to(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}
