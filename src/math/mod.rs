//! Mathematical utilities: interpolation primitives.

pub mod interp;

pub use interp::*;
