//! Misfit-sortable collection of dispersion sets and the report scanner.
//!
//! The scanner is the performance-sensitive piece of the crate: a report
//! stream can hold thousands of consecutive model records, each with a
//! header and Rayleigh and/or Love sections. We make exactly one linear
//! pass over the lines, maintaining explicit "current record" state, and
//! finalize a pending record whenever the model identifier changes.
//! Mode caps are applied while parsing so suppressed modes are never
//! materialized, and the record cap stops the scan early.

use std::io::Write;

use tracing::debug;

use crate::dispersion::curve::DispersionCurve;
use crate::dispersion::set::{DispersionSet, ModeMap};
use crate::domain::{Limit, WaveType};
use crate::error::{Error, Result};
use crate::io::scan;

/// Ordered collection of [`DispersionSet`], optionally misfit-sorted.
///
/// Invariant: non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionSuite {
    sets: Vec<DispersionSet>,
}

impl DispersionSuite {
    /// Start a suite from its first set.
    pub fn new(set: DispersionSet) -> Self {
        Self { sets: vec![set] }
    }

    /// Construct from an ordered list of sets.
    pub fn from_sets(sets: Vec<DispersionSet>, sort: bool) -> Result<Self> {
        if sets.is_empty() {
            return Err(Error::EmptyInput("a suite needs at least one set".into()));
        }
        let mut suite = Self { sets };
        if sort {
            suite.sort_by_misfit();
        }
        Ok(suite)
    }

    /// Append a set.
    ///
    /// With `sort`, the whole suite is re-sorted ascending by misfit
    /// (O(n log n)); callers that know the incoming misfit is already the
    /// worst can pass `false` for an O(1) append.
    pub fn append(&mut self, set: DispersionSet, sort: bool) {
        self.sets.push(set);
        if sort {
            self.sort_by_misfit();
        }
    }

    /// Re-sort ascending by misfit (stable).
    pub fn sort_by_misfit(&mut self) {
        self.sets.sort_by(|a, b| a.misfit().total_cmp(&b.misfit()));
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sets(&self) -> &[DispersionSet] {
        &self.sets
    }

    pub fn get(&self, index: usize) -> Option<&DispersionSet> {
        self.sets.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DispersionSet> {
        self.sets.iter()
    }

    pub fn misfits(&self) -> Vec<f64> {
        self.sets.iter().map(DispersionSet::misfit).collect()
    }

    pub fn identifiers(&self) -> Vec<usize> {
        self.sets.iter().map(DispersionSet::identifier).collect()
    }

    /// Scan a full report stream into a suite, preserving stream order.
    ///
    /// `nsets` caps the number of records emitted; `nrayleigh`/`nlove`
    /// cap modes per wave type (`Limit::Count(0)` skips that wave type).
    /// A stream with no records at all is `Error::EmptyInput`.
    pub fn from_report(
        text: &str,
        nsets: Limit,
        nrayleigh: Limit,
        nlove: Limit,
    ) -> Result<Self> {
        let sets = scan_sets(text, nsets, nrayleigh, nlove)?;
        Self::from_sets(sets, false)
    }

    /// Emit every set in order.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        for set in &self.sets {
            set.write_to(w)?;
        }
        Ok(())
    }
}

/// In-flight accumulation for one mode block.
struct ModeAccum {
    wave: WaveType,
    number: usize,
    frequency: Vec<f64>,
    velocity: Vec<f64>,
    /// Set once a frequency drop is seen; later pairs in this block are
    /// ignored (runaway-match guard).
    truncated: bool,
}

/// In-flight accumulation for one model record.
struct Pending {
    identifier: usize,
    misfit: f64,
    rayleigh: ModeMap,
    love: ModeMap,
}

impl Pending {
    fn new(header: scan::ModelHeader) -> Self {
        Self {
            identifier: header.identifier,
            misfit: header.misfit,
            rayleigh: ModeMap::new(),
            love: ModeMap::new(),
        }
    }

    fn finalize(self) -> Result<Option<DispersionSet>> {
        if self.rayleigh.is_empty() && self.love.is_empty() {
            // All of this record's data was suppressed by the mode caps
            // (or the record carried none); skip it.
            return Ok(None);
        }
        let rayleigh = (!self.rayleigh.is_empty()).then_some(self.rayleigh);
        let love = (!self.love.is_empty()).then_some(self.love);
        DispersionSet::new(self.identifier, self.misfit, rayleigh, love).map(Some)
    }
}

/// Single-pass scan of a report stream.
pub(crate) fn scan_sets(
    text: &str,
    nsets: Limit,
    nrayleigh: Limit,
    nlove: Limit,
) -> Result<Vec<DispersionSet>> {
    if nsets.is_zero() {
        return Err(Error::InvalidValue("record cap of zero".into()));
    }
    if nrayleigh.is_zero() && nlove.is_zero() {
        return Err(Error::InvalidValue(
            "both wave types suppressed; nothing to parse".into(),
        ));
    }

    let mode_cap = |wave: WaveType| match wave {
        WaveType::Rayleigh => nrayleigh,
        WaveType::Love => nlove,
    };

    let mut sets: Vec<DispersionSet> = Vec::new();
    let mut pending: Option<Pending> = None;
    // (wave type, modes already taken in this wave section)
    let mut wave_section: Option<(WaveType, usize)> = None;
    let mut mode: Option<ModeAccum> = None;

    // Fold the finished mode block into the pending record.
    fn flush_mode(mode: &mut Option<ModeAccum>, pending: &mut Option<Pending>) -> Result<()> {
        let Some(accum) = mode.take() else {
            return Ok(());
        };
        if accum.frequency.is_empty() {
            return Ok(());
        }
        let curve = DispersionCurve::new(accum.frequency, accum.velocity)?;
        if let Some(pending) = pending {
            let map = match accum.wave {
                WaveType::Rayleigh => &mut pending.rayleigh,
                WaveType::Love => &mut pending.love,
            };
            map.insert(accum.number, curve);
        }
        Ok(())
    }

    'lines: for line in text.lines() {
        if let Some(header) = scan::parse_model_header(line) {
            flush_mode(&mut mode, &mut pending)?;
            wave_section = None;
            match &mut pending {
                Some(p) if p.identifier == header.identifier => {
                    // Same model's next wave section; keep accumulating.
                }
                Some(_) => {
                    let finished = pending.take().map(Pending::finalize).transpose()?.flatten();
                    if let Some(set) = finished {
                        sets.push(set);
                        if !nsets.admits(sets.len()) {
                            break 'lines;
                        }
                    }
                    pending = Some(Pending::new(header));
                }
                None => pending = Some(Pending::new(header)),
            }
        } else if let Some(wave_header) = scan::parse_wave_header(line) {
            flush_mode(&mut mode, &mut pending)?;
            if pending.is_some() {
                wave_section = Some((wave_header.wave, 0));
            }
        } else if let Some(number) = scan::parse_mode_header(line) {
            flush_mode(&mut mode, &mut pending)?;
            if let Some((wave, taken)) = &mut wave_section {
                if mode_cap(*wave).admits(*taken) {
                    *taken += 1;
                    mode = Some(ModeAccum {
                        wave: *wave,
                        number,
                        frequency: Vec::new(),
                        velocity: Vec::new(),
                        truncated: false,
                    });
                }
            }
        } else if let Some((frequency, slowness)) = scan::parse_pair(line) {
            if let Some(accum) = &mut mode {
                if accum.truncated {
                    continue;
                }
                if accum.frequency.last().is_some_and(|&prev| frequency < prev) {
                    accum.truncated = true;
                    continue;
                }
                if slowness <= 0.0 {
                    return Err(Error::Format(format!("non-positive slowness {slowness}")));
                }
                accum.frequency.push(frequency);
                accum.velocity.push(1.0 / slowness);
            }
        }
        // Anything else (CPU-time annotations, blanks) is ignored.
    }

    flush_mode(&mut mode, &mut pending)?;
    if let Some(set) = pending.take().map(Pending::finalize).transpose()?.flatten() {
        if nsets.admits(sets.len()) {
            sets.push(set);
        }
    }

    if sets.is_empty() {
        return Err(Error::EmptyInput("no dispersion records found".into()));
    }
    debug!(records = sets.len(), "scanned dispersion report");
    Ok(sets)
}
