//! Palm-likelihood fitting engine
//!
//! # Parameter space
//!
//! Every model parameter is positive, so the optimiser works with logarithms of the free
//! parameters. Bounds are transformed the same way, a zero lower bound becomes minus infinity.
//! Fixed parameters never reach the optimiser, they are merged back into every evaluated
//! [Params].
//!
//! The data pin down the density of observed points much better than the number of parents
//! or the number of children per parent, so the likelihood has a long ridge along which
//! `D * E[N]` is constant. When the parameter the observed density is proportional to
//! ([ProcessFamilyTrait::density_param]) is free and unbounded, its coordinate is the logarithm
//! of the observed density ([ProcessFamilyTrait::observed_density]) instead. The model value is
//! recovered by dividing the observed density by its value at a unit density parameter.
//!
//! # Workflow
//!
//! 1. [PalmFit::new] validates the options against the composed model, builds the
//!    [Contrasts](crate::edge::Contrasts) and the [PalmObjective], fills missing starting values
//!    from [ProcessFamilyTrait::start_values] and bounds from [default_bounds]. All the
//!    configuration errors are raised here.
//! 2. [PalmFit::fit] minimises the negative Palm log-likelihood and produces a [FittedModel], or
//!    fails with [PalmError::Optimization].
//! 3. [FittedModel::boot] runs a parametric bootstrap.

mod algorithm;
pub use algorithm::{FitAlgorithm, FitAlgorithmTrait, Minimum};

mod bootstrap;
pub use bootstrap::BootstrapResult;

mod cobyla;
pub use cobyla::CobylaFit;

mod fitted;
pub use fitted::FittedModel;

mod objective;
pub use objective::PalmObjective;

use crate::config::default_bounds;
use crate::data::{Domain, PointSet};
use crate::edge::EdgeCorrection;
use crate::error::{IntensityError, PalmError};
use crate::family::{ProcessFamily, ProcessFamilyTrait};
use crate::params::{Bounds, Param, Params};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use tracing::{debug, info};

/// User options of a fit
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FitOptions {
    /// Starting values, missing ones are guessed from the data
    #[serde(default)]
    pub start: Params,
    /// Bounds overriding [default_bounds]
    #[serde(default)]
    pub bounds: Bounds,
    /// Parameters held constant
    #[serde(default)]
    pub fixed: Params,
    /// Log every evaluated parameter vector
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub algorithm: FitAlgorithm,
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, start: Params) -> Self {
        self.start = start;
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_fixed(mut self, fixed: Params) -> Self {
        self.fixed = fixed;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<FitAlgorithm>) -> Self {
        self.algorithm = algorithm.into();
        self
    }
}

/// Composed, not yet fitted model
#[derive(Clone, Debug)]
pub struct PalmFit {
    points: PointSet,
    domain: Domain,
    r: f64,
    family: ProcessFamily,
    edge: EdgeCorrection,
    options: FitOptions,
    objective: PalmObjective,
    free: Vec<Param>,
    // free parameter whose coordinate is the log of the observed density
    density_coordinate: Option<Param>,
    start: Params,
    bounds: Bounds,
}

impl PalmFit {
    /// Compose the Palm likelihood of `points` observed in `domain` with truncation distance `r`
    pub fn new(
        points: PointSet,
        domain: Domain,
        r: f64,
        family: ProcessFamily,
        edge: EdgeCorrection,
        options: FitOptions,
    ) -> Result<Self, PalmError> {
        let names = family.param_names();
        options.fixed.check_names(&names, "fixed parameters")?;
        let free: Vec<_> = names
            .iter()
            .copied()
            .filter(|&p| !options.fixed.contains(p))
            .collect();
        if free.is_empty() {
            return Err(PalmError::configuration(
                "all parameters are fixed, nothing to fit",
            ));
        }
        options.start.check_names(&free, "start values")?;
        options.bounds.check_names(&free, "bounds")?;
        family.check_dim(domain.dim())?;

        let contrasts = edge.contrasts(&points, &domain, r)?;
        let objective = PalmObjective::new(family.clone(), contrasts)?;

        let mut start = family.start_values(&objective.contrasts().summary());
        start.extend(&options.start);
        start.extend(&options.fixed);
        let mut bounds = default_bounds(&family, r);
        bounds.extend(&options.bounds);
        for &p in &free {
            let value = start.require(p)?;
            let (lower, upper) = bounds
                .get(p)
                .ok_or_else(|| PalmError::configuration(format!("no bounds for {p}")))?;
            if !(lower < upper && upper > 0.0) {
                return Err(PalmError::configuration(format!(
                    "bounds of {p} are ({lower}, {upper}), but must contain positive values"
                )));
            }
            if !(value.is_finite() && value > 0.0 && lower <= value && value <= upper) {
                return Err(PalmError::configuration(format!(
                    "start value {p} = {value} must be positive and within ({lower}, {upper})"
                )));
            }
        }
        // parameters outside of the formula domains are reported before optimisation
        objective.evaluate(&start)?;
        let density_param = family.density_param();
        let unbounded = bounds.get(density_param) == Some((0.0, f64::INFINITY));
        let density_coordinate =
            (unbounded && free.contains(&density_param)).then_some(density_param);
        debug!(
            start = %start,
            free = ?free,
            density_coordinate = ?density_coordinate,
            "composed Palm likelihood"
        );

        Ok(Self {
            points,
            domain,
            r,
            family,
            edge,
            options,
            objective,
            free,
            density_coordinate,
            start,
            bounds,
        })
    }

    pub fn objective(&self) -> &PalmObjective {
        &self.objective
    }

    /// Starting values of all the parameters, fixed ones included
    pub fn start(&self) -> &Params {
        &self.start
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    fn to_internal(&self) -> Result<(Vec<f64>, Vec<(f64, f64)>), IntensityError> {
        self.free
            .iter()
            .map(|&p| -> Result<_, IntensityError> {
                if self.density_coordinate == Some(p) {
                    let density = self.family.observed_density(&self.start, self.domain.dim())?;
                    return Ok((density.ln(), (f64::NEG_INFINITY, f64::INFINITY)));
                }
                let value = self.start.require(p)?;
                let (lower, upper) = self.bounds.get(p).unwrap_or((0.0, f64::INFINITY));
                Ok((value.ln(), (lower.max(0.0).ln(), upper.ln())))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|coordinates| coordinates.into_iter().unzip())
    }

    fn to_params(&self, x: &[f64]) -> Result<Params, IntensityError> {
        let mut params: Params = self.free.iter().zip(x).map(|(&p, v)| (p, v.exp())).collect();
        params.extend(&self.options.fixed);
        if let Some(p) = self.density_coordinate {
            let density = params.require(p)?;
            params.insert(p, 1.0);
            let unit = self.family.observed_density(&params, self.domain.dim())?;
            if !(unit.is_finite() && unit > 0.0) {
                return Err(IntensityError::Domain(format!(
                    "observed density {unit} at unit {p} must be positive and finite"
                )));
            }
            params.insert(p, density / unit);
        }
        Ok(params)
    }

    /// Maximise the Palm likelihood
    pub fn fit(self) -> Result<FittedModel, PalmError> {
        let (x0, bounds) = self.to_internal()?;
        let last = RefCell::new(self.start.clone());
        let failure = RefCell::new(None);
        let objective = |x: &[f64]| -> f64 {
            let params = match self.to_params(x) {
                Ok(params) => params,
                Err(err) => {
                    let at = last.borrow().clone();
                    failure
                        .borrow_mut()
                        .get_or_insert_with(|| (at, err.to_string()));
                    return f64::MAX;
                }
            };
            let value = self.objective.evaluate(&params);
            if self.options.trace {
                info!(params = %params, value = ?value, "evaluated Palm likelihood");
            }
            let value = match value {
                Ok(value) => value,
                Err(err) => {
                    failure
                        .borrow_mut()
                        .get_or_insert_with(|| (params.clone(), err.to_string()));
                    f64::MAX
                }
            };
            *last.borrow_mut() = params;
            value
        };
        let minimum = self.options.algorithm.minimize(&objective, &x0, &bounds);

        if let Some((params, reason)) = failure.into_inner() {
            return Err(PalmError::Optimization { params, reason });
        }
        if !minimum.converged {
            return Err(PalmError::Optimization {
                params: last.into_inner(),
                reason: format!(
                    "optimizer did not converge after {} evaluations: {}",
                    minimum.n_evaluations, minimum.status
                ),
            });
        }
        let estimate = self
            .to_params(&minimum.x)
            .map_err(|err| PalmError::Optimization {
                params: last.into_inner(),
                reason: err.to_string(),
            })?;
        info!(
            estimate = %estimate,
            value = minimum.value,
            n_evaluations = minimum.n_evaluations,
            "Palm likelihood fit converged"
        );
        Ok(FittedModel::new(
            self.points,
            self.domain,
            self.r,
            self.family,
            self.edge,
            self.options,
            estimate,
            minimum,
        ))
    }
}
