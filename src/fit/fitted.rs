use crate::data::{Domain, PointSet};
use crate::edge::EdgeCorrection;
use crate::error::PalmError;
use crate::family::{ProcessFamily, ProcessFamilyTrait};
use crate::fit::bootstrap::BootstrapResult;
use crate::fit::{FitOptions, Minimum};
use crate::params::Params;

/// Successfully fitted model
///
/// The estimate is fixed at construction, [FittedModel::boot] only attaches bootstrap samples.
#[derive(Clone, Debug)]
pub struct FittedModel {
    points: PointSet,
    domain: Domain,
    r: f64,
    family: ProcessFamily,
    edge: EdgeCorrection,
    options: FitOptions,
    estimate: Params,
    value: f64,
    n_evaluations: usize,
    converged: bool,
    pub(super) bootstrap: Option<BootstrapResult>,
}

impl FittedModel {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        points: PointSet,
        domain: Domain,
        r: f64,
        family: ProcessFamily,
        edge: EdgeCorrection,
        options: FitOptions,
        estimate: Params,
        minimum: Minimum,
    ) -> Self {
        Self {
            points,
            domain,
            r,
            family,
            edge,
            options,
            estimate,
            value: minimum.value,
            n_evaluations: minimum.n_evaluations,
            converged: minimum.converged,
            bootstrap: None,
        }
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Truncation distance
    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn family(&self) -> &ProcessFamily {
        &self.family
    }

    pub fn edge(&self) -> EdgeCorrection {
        self.edge
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Estimated parameters, fixed parameters included
    pub fn estimate(&self) -> &Params {
        &self.estimate
    }

    /// Minimised negative Palm log-likelihood
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn log_palm_likelihood(&self) -> f64 {
        -self.value
    }

    pub fn n_evaluations(&self) -> usize {
        self.n_evaluations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn bootstrap(&self) -> Option<&BootstrapResult> {
        self.bootstrap.as_ref()
    }

    /// Quantities derived from the estimate: the child density `Dc` of Neyman-Scott processes or
    /// the observed density `D` of void processes
    pub fn derived(&self) -> Result<Params, PalmError> {
        Ok(self.family.derived(&self.estimate, self.domain.dim())?)
    }
}
