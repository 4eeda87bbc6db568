use crate::error::PalmError;
use crate::family::ProcessFamilyTrait;
use crate::fit::{FitOptions, FittedModel, PalmFit};
use crate::params::{Param, Params};
use crate::simulate::simulate;
use crate::sorted_array::SortedArray;

use ndarray::{Array1, Array2, Axis};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Estimates of parametric bootstrap resamples
///
/// Summaries do not depend on the order of the samples.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    samples: Vec<Params>,
    skipped: usize,
}

impl BootstrapResult {
    pub fn samples(&self) -> &[Params] {
        &self.samples
    }

    /// Number of resamples whose simulation or refit failed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn names(&self) -> Vec<Param> {
        self.samples
            .first()
            .map(|params| params.names().collect())
            .unwrap_or_default()
    }

    /// Samples as a `len × n_params` matrix, columns ordered as [BootstrapResult::names]
    pub fn matrix(&self) -> Array2<f64> {
        let names = self.names();
        Array2::from_shape_fn((self.len(), names.len()), |(i, j)| {
            self.samples[i].get(names[j]).unwrap_or(f64::NAN)
        })
    }

    fn by_column(&self, f: impl Fn(&Array1<f64>) -> f64) -> Params {
        let matrix = self.matrix();
        self.names()
            .into_iter()
            .zip(matrix.columns())
            .map(|(p, column)| (p, f(&column.to_owned())))
            .collect()
    }

    pub fn mean(&self) -> Option<Params> {
        if self.is_empty() {
            return None;
        }
        Some(self.by_column(|column| column.mean().unwrap_or(f64::NAN)))
    }

    pub fn median(&self) -> Option<Params> {
        if self.is_empty() {
            return None;
        }
        Some(self.by_column(|column| SortedArray::from(column.to_vec()).median()))
    }

    /// Sample standard deviations, the bootstrap standard errors
    pub fn std_err(&self) -> Option<Params> {
        if self.len() < 2 {
            return None;
        }
        Some(self.by_column(|column| column.std(1.0)))
    }

    /// Sample covariance matrix, rows and columns ordered as [BootstrapResult::names]
    pub fn covariance(&self) -> Option<Array2<f64>> {
        if self.len() < 2 {
            return None;
        }
        let matrix = self.matrix();
        let mean = matrix.mean_axis(Axis(0))?;
        let centred = matrix - &mean;
        Some(centred.t().dot(&centred) / (self.len() - 1) as f64)
    }

    /// Percentile confidence intervals with coverage `level`
    pub fn percentile_interval(
        &self,
        level: f64,
    ) -> Result<BTreeMap<Param, (f64, f64)>, PalmError> {
        if !(level > 0.0 && level < 1.0) {
            return Err(PalmError::configuration(format!(
                "confidence level must be within (0, 1), got {level}"
            )));
        }
        if self.is_empty() {
            return Ok(BTreeMap::new());
        }
        let tail = 0.5 * (1.0 - level);
        let matrix = self.matrix();
        Ok(self
            .names()
            .into_iter()
            .zip(matrix.columns())
            .map(|(p, column)| {
                let sorted: SortedArray = column.to_vec().into();
                (p, (sorted.ppf(tail), sorted.ppf(1.0 - tail)))
            })
            .collect())
    }
}

impl FittedModel {
    /// Parametric bootstrap
    ///
    /// Each of `n` resamples is simulated from the estimate with edges matching the fit's edge
    /// correction, then refitted with the same configuration starting from the estimate.
    /// Successful refits are appended to [FittedModel::bootstrap], failures are counted as
    /// skipped.
    pub fn boot(mut self, n: usize, rng: &mut dyn RngCore, report_progress: bool) -> Self {
        let mut result = self.bootstrap.take().unwrap_or_default();
        for i in 0..n {
            match self.resample(rng) {
                Ok(fitted) => result.samples.push(fitted.estimate().clone()),
                Err(err) => {
                    warn!(resample = i + 1, error = %err, "bootstrap resample skipped");
                    result.skipped += 1;
                }
            }
            if report_progress {
                info!("bootstrap resample {}/{} done", i + 1, n);
            }
        }
        self.bootstrap = Some(result);
        self
    }

    fn resample(&self, rng: &mut dyn RngCore) -> Result<FittedModel, PalmError> {
        let simulation = simulate(
            self.family(),
            self.estimate(),
            self.domain(),
            self.edge().simulation_edges(),
            rng,
        )?;
        let siblings = match (self.family().sibling_info(), &simulation.siblings) {
            (Some(info), Some(truth)) => Some(info.resample(truth, rng)),
            _ => None,
        };
        let family = self.family().with_siblings(siblings)?;
        let fixed = &self.options().fixed;
        let options = FitOptions {
            start: self
                .estimate()
                .iter()
                .filter(|&(p, _)| !fixed.contains(p))
                .collect(),
            ..self.options().clone()
        };
        PalmFit::new(
            simulation.points,
            self.domain().clone(),
            self.r(),
            family,
            self.edge(),
            options,
        )?
        .fit()
    }
}
