use crate::fit::cobyla::CobylaFit;

use enum_dispatch::enum_dispatch;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Result of a bounded minimisation
#[derive(Clone, Debug, PartialEq)]
pub struct Minimum {
    /// Best parameter vector found
    pub x: Vec<f64>,
    /// Objective at `x`
    pub value: f64,
    pub converged: bool,
    pub n_evaluations: usize,
    /// Optimiser-specific description of the stopping reason
    pub status: String,
}

#[enum_dispatch]
pub trait FitAlgorithmTrait: Clone + Debug {
    /// Minimise `objective` starting from `x0` within per-parameter `(lower, upper)` bounds
    ///
    /// Bounds may be infinite.
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        x0: &[f64],
        bounds: &[(f64, f64)],
    ) -> Minimum;
}

/// Optimisation algorithm used to maximise the Palm likelihood
#[enum_dispatch(FitAlgorithmTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FitAlgorithm {
    Cobyla(CobylaFit),
}

impl Default for FitAlgorithm {
    fn default() -> Self {
        CobylaFit::default().into()
    }
}
