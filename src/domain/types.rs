//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be passed
//! freely between parsing, numeric transforms, and serialization without
//! any hidden state.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Wave polarization of a dispersion curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WaveType {
    Rayleigh,
    Love,
}

impl WaveType {
    /// Exact label used by the engine's text and container formats.
    pub fn as_str(self) -> &'static str {
        match self {
            WaveType::Rayleigh => "Rayleigh",
            WaveType::Love => "Love",
        }
    }
}

impl fmt::Display for WaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaveType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "Rayleigh" | "rayleigh" => Ok(WaveType::Rayleigh),
            "Love" | "love" => Ok(WaveType::Love),
            other => Err(Error::Format(format!("unknown wave type '{other}'"))),
        }
    }
}

/// Version of the external inversion engine a file targets.
///
/// The two container schemas are mutually incompatible: the per-point
/// stddev is stored as a slowness-domain half-width by [`EngineVersion::V2`]
/// and as a log-domain half-width by [`EngineVersion::V3`], and the XML
/// layout differs structurally (see `target::xml`). Only the enumerated
/// versions are supported; anything else is `UnsupportedVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineVersion {
    /// Engine 2.10.1 (slowness-domain uncertainty, `StatPoint` entries).
    V2,
    /// Engine 3.4.2 (log-domain uncertainty, `RealStatisticalPoint` entries).
    V3,
}

impl EngineVersion {
    /// Exact version string written into files.
    pub fn as_str(self) -> &'static str {
        match self {
            EngineVersion::V2 => "2.10.1",
            EngineVersion::V3 => "3.4.2",
        }
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "2.10.1" => Ok(EngineVersion::V2),
            "3.4.2" => Ok(EngineVersion::V3),
            other => Err(Error::UnsupportedVersion(other.to_string())),
        }
    }
}

/// Cap on how many records (or modes) a scanner is allowed to take.
///
/// For per-wave mode caps, `Count(0)` means "skip that wave type
/// entirely"; the cap is applied *during* parsing so suppressed modes cost
/// nothing. For record caps, `Count(0)` is rejected by the suite
/// constructors (a suite is non-empty by invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// No cap.
    All,
    /// Take at most the first `n`.
    Count(usize),
}

impl Limit {
    /// Whether index `i` (0-based) is within the cap.
    pub fn admits(self, i: usize) -> bool {
        match self {
            Limit::All => true,
            Limit::Count(n) => i < n,
        }
    }

    /// Whether the cap is exactly zero (skip everything).
    pub fn is_zero(self) -> bool {
        matches!(self, Limit::Count(0))
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::All
    }
}

/// Spacing of a generated resampling grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spacing {
    Linear,
    Log,
}

impl FromStr for Spacing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "linear" => Ok(Spacing::Linear),
            "log" => Ok(Spacing::Log),
            other => Err(Error::InvalidValue(format!("unknown spacing '{other}'"))),
        }
    }
}

/// Domain in which a target curve is cut or resampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleDomain {
    Frequency,
    Wavelength,
}

impl FromStr for ResampleDomain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "frequency" => Ok(ResampleDomain::Frequency),
            "wavelength" => Ok(ResampleDomain::Wavelength),
            other => Err(Error::InvalidValue(format!("unknown domain '{other}'"))),
        }
    }
}

/// Which per-layer parameter of a ground model an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelParameter {
    Vp,
    Vs,
    Density,
    /// Poisson's ratio, derived pointwise from vp and vs.
    PoissonRatio,
}

impl FromStr for ModelParameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "vp" => Ok(ModelParameter::Vp),
            "vs" => Ok(ModelParameter::Vs),
            "rh" | "density" => Ok(ModelParameter::Density),
            "pr" => Ok(ModelParameter::PoissonRatio),
            other => Err(Error::InvalidValue(format!("unknown parameter '{other}'"))),
        }
    }
}
