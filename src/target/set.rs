//! Ordered collection of modal targets and the container round trip.

use std::path::Path;

use crate::domain::EngineVersion;
use crate::error::{Error, Result};
use crate::io::container;
use crate::target::{xml, ModalTarget};

/// One full multi-mode experimental target.
///
/// Invariant: non-empty. Order is preserved as given; the engine treats
/// every curve in the set as part of the same inversion target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSet {
    targets: Vec<ModalTarget>,
}

impl TargetSet {
    pub fn new(targets: Vec<ModalTarget>) -> Result<Self> {
        if targets.is_empty() {
            return Err(Error::EmptyInput(
                "a target set needs at least one curve".into(),
            ));
        }
        Ok(Self { targets })
    }

    pub fn targets(&self) -> &[ModalTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ModalTarget> {
        self.targets.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModalTarget> {
        self.targets.iter()
    }

    pub fn push(&mut self, target: ModalTarget) {
        self.targets.push(target);
    }

    /// Write the set as a `.target` archive for the given engine version.
    ///
    /// Round trips preserve frequency and velocity up to floating
    /// precision; velstd passes through the version's lossy uncertainty
    /// re-encoding (see [`ModalTarget::engine_stddev`]).
    pub fn to_target(&self, path: &Path, version: EngineVersion) -> Result<()> {
        let xml = xml::render(self, version)?;
        container::write_container(path, &xml)
    }

    /// Read a `.target` archive written for the given engine version.
    pub fn from_target(path: &Path, version: EngineVersion) -> Result<Self> {
        let xml = container::read_container(path)?;
        xml::parse(&xml, version)
    }

    /// Element-wise comparison within a floating tolerance.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.len() == other.len()
            && self
                .targets
                .iter()
                .zip(&other.targets)
                .all(|(a, b)| a.approx_eq(b, tol))
    }
}
