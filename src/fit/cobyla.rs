use crate::error::PalmError;
use crate::fit::algorithm::{FitAlgorithm, FitAlgorithmTrait, Minimum};

use cobyla::{Func, RhoBeg, StopTols, SuccessStatus, minimize};
use ordered_float::NotNan;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// COBYLA (Constrained Optimization BY Linear Approximations) minimiser
///
/// COBYLA is a derivative-free optimization algorithm that supports boundaries through
/// constraints. Palm likelihoods are sums over pair distances with no cheap derivatives, so it
/// is the default algorithm.
///
/// Optionally, if `fine_tuning_algorithm` is `Some`, it sends the best guess from COBYLA to the
/// next optimization as an initial guess and returns its result.
///
/// The algorithm works by building linear approximations to the objective and constraint functions
/// and is described in M.J.D. Powell's 1994 paper "A direct search optimization method that models
/// the objective and constraint functions by linear interpolation".
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename = "Cobyla")]
pub struct CobylaFit {
    pub niterations: u32,
    pub rhobeg: NotNan<f64>,
    pub ftol_rel: NotNan<f64>,
    pub xtol_rel: NotNan<f64>,
    pub fine_tuning_algorithm: Option<Box<FitAlgorithm>>,
}

impl CobylaFit {
    /// Create a new [CobylaFit].
    ///
    /// # Arguments
    /// - `niterations`: maximum number of function evaluations
    /// - `rhobeg`: initial change to parameters, the optimiser works with logarithms of the
    ///   model parameters, so it is a relative change
    /// - `ftol_rel`: relative tolerance on function value for convergence
    /// - `xtol_rel`: final trust-region radius relative to `rhobeg`, the optimiser converges when
    ///   the radius shrinks to `xtol_rel * rhobeg`
    /// - `fine_tuning_algorithm`: optional algorithm to refine COBYLA's result
    pub fn new(
        niterations: u32,
        rhobeg: f64,
        ftol_rel: f64,
        xtol_rel: f64,
        fine_tuning_algorithm: Option<FitAlgorithm>,
    ) -> Result<Self, PalmError> {
        if niterations == 0 {
            return Err(PalmError::configuration("niterations must be positive"));
        }
        if !(rhobeg.is_finite() && rhobeg > 0.0) {
            return Err(PalmError::configuration(format!(
                "rhobeg must be positive and finite, got {rhobeg}"
            )));
        }
        if !(ftol_rel.is_finite() && ftol_rel >= 0.0) {
            return Err(PalmError::configuration(format!(
                "ftol_rel must be non-negative and finite, got {ftol_rel}"
            )));
        }
        if !(xtol_rel.is_finite() && xtol_rel > 0.0 && xtol_rel < 1.0) {
            return Err(PalmError::configuration(format!(
                "xtol_rel must be within (0, 1), got {xtol_rel}"
            )));
        }
        Ok(Self {
            niterations,
            rhobeg: NotNan::new(rhobeg).map_err(|_| PalmError::configuration("rhobeg is NaN"))?,
            ftol_rel: NotNan::new(ftol_rel)
                .map_err(|_| PalmError::configuration("ftol_rel is NaN"))?,
            xtol_rel: NotNan::new(xtol_rel)
                .map_err(|_| PalmError::configuration("xtol_rel is NaN"))?,
            fine_tuning_algorithm: fine_tuning_algorithm.map(|x| x.into()),
        })
    }

    #[inline]
    pub fn default_niterations() -> u32 {
        2000
    }

    #[inline]
    pub fn default_rhobeg() -> f64 {
        0.5
    }

    #[inline]
    pub fn default_ftol_rel() -> f64 {
        1e-6
    }

    #[inline]
    pub fn default_xtol_rel() -> f64 {
        1e-6
    }

    #[inline]
    pub fn default_fine_tuning_algorithm() -> Option<FitAlgorithm> {
        None
    }
}

impl Default for CobylaFit {
    fn default() -> Self {
        Self::new(
            Self::default_niterations(),
            Self::default_rhobeg(),
            Self::default_ftol_rel(),
            Self::default_xtol_rel(),
            Self::default_fine_tuning_algorithm(),
        )
        .expect("default COBYLA settings are valid")
    }
}

impl FitAlgorithmTrait for CobylaFit {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        x0: &[f64],
        bounds: &[(f64, f64)],
    ) -> Minimum {
        let evaluations = Cell::new(0_usize);
        let func = |x: &[f64], _user_data: &mut ()| -> f64 {
            evaluations.set(evaluations.get() + 1);
            objective(x)
        };

        // No additional constraints beyond bounds
        let constraints: Vec<&dyn Func<()>> = vec![];

        let stop_tol = StopTols {
            ftol_rel: self.ftol_rel.into(),
            xtol_rel: self.xtol_rel.into(),
            ..StopTols::default()
        };

        let result = minimize(
            func,
            x0,
            bounds,
            &constraints,
            (),
            self.niterations as usize,
            RhoBeg::All(self.rhobeg.into()),
            Some(stop_tol),
        );

        let cobyla_minimum = match result {
            Ok((status, x, value)) => Minimum {
                x,
                value,
                converged: matches!(
                    status,
                    SuccessStatus::Success
                        | SuccessStatus::FtolReached
                        | SuccessStatus::XtolReached
                ),
                n_evaluations: evaluations.get(),
                status: format!("{status:?}"),
            },
            Err((status, x, value)) => Minimum {
                x,
                value,
                converged: false,
                n_evaluations: evaluations.get(),
                status: format!("{status:?}"),
            },
        };

        match &self.fine_tuning_algorithm {
            Some(fine_tuning_algorithm) if cobyla_minimum.converged => {
                let fine = fine_tuning_algorithm.minimize(objective, &cobyla_minimum.x, bounds);
                Minimum {
                    n_evaluations: cobyla_minimum.n_evaluations + fine.n_evaluations,
                    ..fine
                }
            }
            _ => cobyla_minimum,
        }
    }
}
