//! Domain types used throughout the toolkit.
//!
//! This module defines:
//!
//! - wave polarization and engine-version enums (`WaveType`, `EngineVersion`)
//! - record/mode caps for the report scanners (`Limit`)
//! - resampling controls (`Spacing`, `ResampleDomain`)
//! - per-layer parameter selection for ground models (`ModelParameter`)

pub mod types;

pub use types::*;
