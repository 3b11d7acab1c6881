//! `sw-curves` library crate.
//!
//! A pre/post-processing toolkit for surface-wave dispersion inversion:
//!
//! - layered ground profiles ([`GroundModel`], [`GroundModelSuite`])
//! - per-mode dispersion curves ([`DispersionCurve`], [`DispersionSet`],
//!   [`DispersionSuite`])
//! - experimental target curves ([`ModalTarget`], [`TargetSet`])
//! - the text and gzip-tar container formats used by the external
//!   inversion engine, round-tripped byte-compatibly
//!
//! The crate is a pure library: plotting and CLI glue live elsewhere so
//! that core logic stays testable and reusable.

pub mod curve;
pub mod dispersion;
pub mod domain;
pub mod error;
pub mod ground;
pub mod io;
pub mod math;
pub mod target;

pub use curve::{Curve, CurveUncertain};
pub use dispersion::{DispersionCurve, DispersionSet, DispersionSuite};
pub use domain::{EngineVersion, Limit, ModelParameter, ResampleDomain, Spacing, WaveType};
pub use error::{Error, Result};
pub use ground::{GroundModel, GroundModelSuite};
pub use math::{CubicSpline, Interpolator, Linear};
pub use target::{ModalTarget, TargetSet};
