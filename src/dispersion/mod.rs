//! Modal dispersion curves and their containers.
//!
//! - [`DispersionCurve`]: one mode's frequency/velocity samples
//! - [`DispersionSet`]: one velocity model's full set of Rayleigh/Love
//!   modal curves, keyed by mode number
//! - [`DispersionSuite`]: an ordered, misfit-sortable collection of sets,
//!   owning the single-pass multi-record report scanner

pub mod curve;
pub mod set;
pub mod suite;

pub use curve::DispersionCurve;
pub use set::DispersionSet;
pub use suite::DispersionSuite;
