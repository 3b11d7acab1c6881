//! Layered earth models and their containers.
//!
//! - [`GroundModel`]: thickness/Vp/Vs/density per layer, with the
//!   stair-step, discretization, and layer-merging transforms
//! - [`GroundModelSuite`]: misfit-sortable collection with median-profile
//!   and lognormal-sigma statistics across a suite

pub mod model;
pub mod suite;

pub use model::GroundModel;
pub use suite::GroundModelSuite;
