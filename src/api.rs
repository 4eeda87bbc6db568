use crate::data::{Domain, PointSet};
use crate::edge::EdgeCorrection;
use crate::error::PalmError;
use crate::family::ProcessFamily;
use crate::fit::{FitOptions, FittedModel, PalmFit};
use crate::params::Params;
use crate::simulate::{Simulation, SimulationEdges, simulate};

use rand::RngCore;

/// Fit `family` to `points` observed in `domain` by maximising the Palm likelihood truncated at
/// distance `r`
///
/// Configuration errors, invalid domains and radii, and empty pair sets are reported before the
/// optimiser starts.
pub fn fit_process(
    points: PointSet,
    domain: Domain,
    r: f64,
    family: ProcessFamily,
    edge: EdgeCorrection,
    options: FitOptions,
) -> Result<FittedModel, PalmError> {
    PalmFit::new(points, domain, r, family, edge, options)?.fit()
}

/// Simulate a pattern of `family` with parameters `params` in `domain`
pub fn simulate_process(
    params: &Params,
    domain: &Domain,
    family: &ProcessFamily,
    edges: SimulationEdges,
    rng: &mut dyn RngCore,
) -> Result<Simulation, PalmError> {
    simulate(family, params, domain, edges, rng)
}

/// Attach `n` parametric bootstrap resamples to `fitted`, see [FittedModel::boot]
pub fn bootstrap(
    fitted: FittedModel,
    n: usize,
    rng: &mut dyn RngCore,
    report_progress: bool,
) -> FittedModel {
    fitted.boot(n, rng, report_progress)
}
