//! Misfit-sortable collection of ground models and suite statistics.
//!
//! The multi-model report parse finds block boundaries in one pass and
//! parses the blocks in parallel; the suite keeps input order because the
//! parallel map collects in block order (and a misfit sort makes the
//! final ordering independent of scan order anyway).

use std::io::Write;

use rayon::prelude::*;
use tracing::debug;

use crate::domain::{Limit, ModelParameter};
use crate::error::{Error, Result};
use crate::ground::GroundModel;
use crate::io::scan;

/// Ordered collection of [`GroundModel`], optionally misfit-sorted.
///
/// Invariant: non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundModelSuite {
    models: Vec<GroundModel>,
}

impl GroundModelSuite {
    /// Start a suite from its first model.
    pub fn new(model: GroundModel) -> Self {
        Self {
            models: vec![model],
        }
    }

    /// Construct from an ordered list of models.
    pub fn from_models(models: Vec<GroundModel>, sort: bool) -> Result<Self> {
        if models.is_empty() {
            return Err(Error::EmptyInput("a suite needs at least one model".into()));
        }
        let mut suite = Self { models };
        if sort {
            suite.sort_by_misfit();
        }
        Ok(suite)
    }

    /// Vectorized constructor from per-model layer arrays.
    ///
    /// All four outer sequences must hold the same number of models.
    pub fn from_arrays(
        thicknesses: Vec<Vec<f64>>,
        vps: Vec<Vec<f64>>,
        vss: Vec<Vec<f64>>,
        densities: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let n = thicknesses.len();
        for (name, seq) in [("vp", &vps), ("vs", &vss), ("density", &densities)] {
            if seq.len() != n {
                return Err(Error::DimensionMismatch(format!(
                    "{n} thickness rows but {} {name} rows",
                    seq.len()
                )));
            }
        }
        let models = thicknesses
            .into_iter()
            .zip(vps)
            .zip(vss)
            .zip(densities)
            .enumerate()
            .map(|(i, (((tk, vp), vs), rh))| {
                GroundModel::with_metadata(tk, vp, vs, rh, i, 0.0)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_models(models, false)
    }

    /// Append a model.
    ///
    /// With `sort`, the whole suite is re-sorted ascending by misfit
    /// (O(n log n)); callers that know the incoming misfit is already the
    /// worst can pass `false` for an O(1) append.
    pub fn append(&mut self, model: GroundModel, sort: bool) {
        self.models.push(model);
        if sort {
            self.sort_by_misfit();
        }
    }

    /// Re-sort ascending by misfit (stable).
    pub fn sort_by_misfit(&mut self) {
        self.models
            .sort_by(|a, b| a.misfit().total_cmp(&b.misfit()));
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[GroundModel] {
        &self.models
    }

    pub fn get(&self, index: usize) -> Option<&GroundModel> {
        self.models.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GroundModel> {
        self.models.iter()
    }

    pub fn misfits(&self) -> Vec<f64> {
        self.models.iter().map(GroundModel::misfit).collect()
    }

    /// Parse a multi-model stream, preserving stream order.
    ///
    /// Block boundaries are located in a single pass; the independent
    /// blocks are then parsed in parallel. `nmodels` caps how many blocks
    /// are parsed at all.
    pub fn from_report(text: &str, nmodels: Limit) -> Result<Self> {
        if nmodels.is_zero() {
            return Err(Error::InvalidValue("model cap of zero".into()));
        }

        // Line indices of every model header.
        let lines: Vec<&str> = text.lines().collect();
        let mut starts: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| scan::parse_model_header(line).is_some())
            .map(|(i, _)| i)
            .collect();
        if starts.is_empty() {
            return Err(Error::EmptyInput("no ground models found".into()));
        }
        let block_ends: Vec<usize> = starts
            .iter()
            .skip(1)
            .copied()
            .chain([lines.len()])
            .collect();
        if let Limit::Count(n) = nmodels {
            starts.truncate(n);
        }

        let models: Vec<GroundModel> = starts
            .par_iter()
            .zip(&block_ends)
            .map(|(&start, &end)| GroundModel::from_lines(lines[start..end].iter().copied()))
            .collect::<Result<Vec<_>>>()?;
        debug!(models = models.len(), "parsed ground model report");
        Self::from_models(models, false)
    }

    /// Indices of the `nbest` lowest-misfit models (stable order).
    fn best_indices(&self, nbest: Limit) -> Result<Vec<usize>> {
        let n = match nbest {
            Limit::All => self.len(),
            Limit::Count(n) => n.min(self.len()),
        };
        if n == 0 {
            return Err(Error::InvalidValue("nbest of zero".into()));
        }
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.sort_by(|&a, &b| self.models[a].misfit().total_cmp(&self.models[b].misfit()));
        indices.truncate(n);
        Ok(indices)
    }

    /// Median simplified profile of one parameter across the `nbest`
    /// lowest-misfit models.
    ///
    /// Each model is simplified first; the simplified layerings are
    /// stacked by layer position, which presumes structural similarity
    /// across the suite. Ragged stacks are rejected rather than silently
    /// mis-aligned.
    pub fn median_simple(
        &self,
        nbest: Limit,
        parameter: ModelParameter,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let indices = self.best_indices(nbest)?;
        let mut thicknesses = Vec::with_capacity(indices.len());
        let mut values = Vec::with_capacity(indices.len());
        for &i in &indices {
            let (tk, v) = self.models[i].simplify(parameter)?;
            thicknesses.push(tk);
            values.push(v);
        }
        let nlay = thicknesses[0].len();
        if thicknesses.iter().any(|tk| tk.len() != nlay) {
            return Err(Error::DimensionMismatch(format!(
                "simplified {parameter:?} layerings are not congruent across the suite"
            )));
        }

        let mut med_tk = Vec::with_capacity(nlay);
        let mut med_v = Vec::with_capacity(nlay);
        for layer in 0..nlay {
            med_tk.push(median(thicknesses.iter().map(|tk| tk[layer])));
            med_v.push(median(values.iter().map(|v| v[layer])));
        }
        Ok((med_tk, med_v))
    }

    /// Median ground model across the `nbest` lowest-misfit models.
    ///
    /// Vp, Vs, and density medians are computed independently on their
    /// own simplified layerings and reassembled onto a unified layering.
    pub fn median(&self, nbest: Limit) -> Result<GroundModel> {
        let (vp_tk, vp) = self.median_simple(nbest, ModelParameter::Vp)?;
        let (vs_tk, vs) = self.median_simple(nbest, ModelParameter::Vs)?;
        let (rh_tk, rh) = self.median_simple(nbest, ModelParameter::Density)?;
        GroundModel::from_simple_profiles(&vp_tk, &vp, &vs_tk, &vs, &rh_tk, &rh)
    }

    /// Lognormal standard deviation of one parameter across the `nbest`
    /// lowest-misfit models, on a uniform depth grid.
    ///
    /// Sample standard deviation of `ln(value)` at each depth, with the
    /// n−1 denominator.
    pub fn sigma_ln(
        &self,
        max_depth: f64,
        step: f64,
        nbest: Limit,
        parameter: ModelParameter,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let indices = self.best_indices(nbest)?;
        if indices.len() < 2 {
            return Err(Error::InvalidValue(
                "sigma_ln needs at least two models".into(),
            ));
        }
        let profiles: Vec<(Vec<f64>, Vec<f64>)> = indices
            .par_iter()
            .map(|&i| self.models[i].discretize(max_depth, step, parameter))
            .collect::<Result<Vec<_>>>()?;

        let (depth, first) = &profiles[0];
        let n_depths = first.len();
        let n_models = profiles.len() as f64;
        let mut sigma = Vec::with_capacity(n_depths);
        for d in 0..n_depths {
            let mut mean = 0.0;
            for (_, values) in &profiles {
                let v = values[d];
                if v <= 0.0 {
                    return Err(Error::InvalidValue(format!(
                        "non-positive value {v} has no logarithm"
                    )));
                }
                mean += v.ln();
            }
            mean /= n_models;
            let ss: f64 = profiles
                .iter()
                .map(|(_, values)| {
                    let r = values[d].ln() - mean;
                    r * r
                })
                .sum();
            sigma.push((ss / (n_models - 1.0)).sqrt());
        }
        Ok((depth.clone(), sigma))
    }

    /// Vs30 of each of the `nbest` lowest-misfit models.
    pub fn vs30(&self, nbest: Limit) -> Result<Vec<f64>> {
        let indices = self.best_indices(nbest)?;
        Ok(indices.iter().map(|&i| self.models[i].vs30()).collect())
    }

    /// Emit every model in order.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        for model in &self.models {
            model.write_to(w)?;
        }
        Ok(())
    }
}

/// Median of a non-empty iterator (mean of middle two for even counts).
fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(vs_surface: f64, misfit: f64, identifier: usize) -> GroundModel {
        GroundModel::with_metadata(
            vec![5.0, 0.0],
            vec![2.0 * vs_surface, 4.0 * vs_surface],
            vec![vs_surface, 2.0 * vs_surface],
            vec![2000.0, 2000.0],
            identifier,
            misfit,
        )
        .unwrap()
    }

    #[test]
    fn from_report_round_trips_many_models() {
        let suite = GroundModelSuite::from_models(
            vec![model(100.0, 0.9, 0), model(120.0, 0.4, 1), model(140.0, 0.7, 2)],
            false,
        )
        .unwrap();
        let mut buf = Vec::new();
        suite.write_to(&mut buf).unwrap();

        let back =
            GroundModelSuite::from_report(std::str::from_utf8(&buf).unwrap(), Limit::All).unwrap();
        assert_eq!(suite, back);
    }

    #[test]
    fn from_report_honours_the_model_cap() {
        let suite = GroundModelSuite::from_models(
            vec![model(100.0, 0.9, 0), model(120.0, 0.4, 1)],
            false,
        )
        .unwrap();
        let mut buf = Vec::new();
        suite.write_to(&mut buf).unwrap();

        let back = GroundModelSuite::from_report(
            std::str::from_utf8(&buf).unwrap(),
            Limit::Count(1),
        )
        .unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.get(0).unwrap().identifier(), 0);
    }

    #[test]
    fn empty_report_is_an_explicit_error() {
        assert!(matches!(
            GroundModelSuite::from_report("# nothing\n", Limit::All),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn median_of_three_models() {
        let suite = GroundModelSuite::from_models(
            vec![model(100.0, 0.1, 0), model(120.0, 0.2, 1), model(300.0, 0.3, 2)],
            false,
        )
        .unwrap();
        let med = suite.median(Limit::All).unwrap();
        assert_eq!(med.vs(), &[120.0, 240.0]);
        assert_eq!(med.vp(), &[240.0, 480.0]);
        assert_eq!(med.thickness(), &[5.0, 0.0]);
    }

    #[test]
    fn median_respects_nbest() {
        // The worst model (vs=300) must not influence the 2-best median.
        let suite = GroundModelSuite::from_models(
            vec![model(100.0, 0.1, 0), model(120.0, 0.2, 1), model(300.0, 0.9, 2)],
            false,
        )
        .unwrap();
        let med = suite.median(Limit::Count(2)).unwrap();
        assert_eq!(med.vs(), &[110.0, 220.0]);
    }

    #[test]
    fn median_rejects_ragged_simplified_layering() {
        let three_layer = GroundModel::with_metadata(
            vec![2.0, 3.0, 0.0],
            vec![200.0, 400.0, 600.0],
            vec![100.0, 200.0, 300.0],
            vec![2000.0; 3],
            3,
            0.05,
        )
        .unwrap();
        let suite =
            GroundModelSuite::from_models(vec![model(100.0, 0.1, 0), three_layer], false).unwrap();
        assert!(matches!(
            suite.median(Limit::All),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn sigma_ln_matches_hand_computation() {
        let suite = GroundModelSuite::from_models(
            vec![model(100.0, 0.1, 0), model(200.0, 0.2, 1)],
            false,
        )
        .unwrap();
        let (depth, sigma) = suite
            .sigma_ln(10.0, 1.0, Limit::All, ModelParameter::Vs)
            .unwrap();
        assert_eq!(depth.len(), 11);
        // Two samples a and b: std with ddof=1 is |ln a - ln b| / sqrt(2).
        let expected = (200.0_f64.ln() - 100.0_f64.ln()).abs() / 2.0_f64.sqrt();
        assert!((sigma[0] - expected).abs() < 1e-12);
        // Same ratio holds in the half-space.
        assert!((sigma[10] - expected).abs() < 1e-12);
    }

    #[test]
    fn from_arrays_checks_outer_dimensions() {
        let err = GroundModelSuite::from_arrays(
            vec![vec![5.0, 0.0], vec![5.0, 0.0]],
            vec![vec![200.0, 400.0]],
            vec![vec![100.0, 200.0], vec![100.0, 200.0]],
            vec![vec![2000.0, 2000.0], vec![2000.0, 2000.0]],
        )
        .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));

        let suite = GroundModelSuite::from_arrays(
            vec![vec![5.0, 0.0], vec![5.0, 0.0]],
            vec![vec![200.0, 400.0], vec![220.0, 440.0]],
            vec![vec![100.0, 200.0], vec![110.0, 220.0]],
            vec![vec![2000.0, 2000.0], vec![2000.0, 2000.0]],
        )
        .unwrap();
        assert_eq!(suite.len(), 2);
    }

    #[test]
    fn vs30_selects_best_models() {
        let suite = GroundModelSuite::from_models(
            vec![model(100.0, 0.5, 0), model(200.0, 0.1, 1)],
            false,
        )
        .unwrap();
        let vs30s = suite.vs30(Limit::Count(1)).unwrap();
        assert_eq!(vs30s.len(), 1);
        // Best model is the vs=200 one.
        assert!((vs30s[0] - suite.get(1).unwrap().vs30()).abs() < 1e-12);
    }

    #[test]
    fn append_sort_orders_by_misfit() {
        let mut suite = GroundModelSuite::new(model(100.0, 0.9, 0));
        suite.append(model(120.0, 0.2, 1), true);
        assert_eq!(suite.misfits(), vec![0.2, 0.9]);
    }

    #[test]
    fn synthetic_suite_statistics_stay_finite() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let models: Vec<GroundModel> = (0..20)
            .map(|i| {
                let vs_top = rng.gen_range(80.0..120.0);
                let vs_half = rng.gen_range(180.0..260.0);
                GroundModel::with_metadata(
                    vec![5.0, 0.0],
                    vec![2.2 * vs_top, 2.2 * vs_half],
                    vec![vs_top, vs_half],
                    vec![2000.0, 2000.0],
                    i,
                    rng.gen_range(0.0..2.0),
                )
                .unwrap()
            })
            .collect();
        let suite = GroundModelSuite::from_models(models, true).unwrap();
        assert!(suite.misfits().windows(2).all(|w| w[0] <= w[1]));

        let med = suite.median(Limit::Count(10)).unwrap();
        assert!(med.vs()[0] >= 80.0 && med.vs()[0] <= 120.0);
        assert!(med.vs()[1] >= 180.0 && med.vs()[1] <= 260.0);

        let (_, sigma) = suite
            .sigma_ln(20.0, 1.0, Limit::All, ModelParameter::Vs)
            .unwrap();
        assert!(sigma.iter().all(|s| s.is_finite() && *s >= 0.0));
    }
}
