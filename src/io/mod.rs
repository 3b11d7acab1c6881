//! Input/output helpers.
//!
//! - line-oriented tokenizer for the engine's text grammar (`scan`)
//! - gzip-tar container read/write for `.target` archives (`container`)

pub mod container;
pub mod scan;
