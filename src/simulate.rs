//! Simulation of point patterns from a fully specified process

use crate::data::{Domain, PointSet};
use crate::error::PalmError;
use crate::family::child_dist::poisson_count;
use crate::family::{
    ChildDistTrait, DispersionTrait, NeymanScott, ProcessFamily, ProcessFamilyTrait,
    SiblingGroundTruth, VoidProcess,
};
use crate::geometry::{euclidean_distance, periodic_distance};
use crate::params::{Param, Params};

use rand::{Rng, RngCore};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Treatment of points generated outside of the domain
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub enum SimulationEdges {
    #[default]
    /// Parents are placed inside the domain, children leaving it are wrapped around and voids
    /// delete points through the boundary
    Periodic,
    /// Parents are placed inside the domain grown by `width`, points outside of the domain are
    /// discarded
    ///
    /// The default width is the reach of the dispersion kernel (`4 sigma` or `tau`) for
    /// Neyman-Scott processes and `tau` for void processes.
    Buffer { width: Option<f64> },
}

impl SimulationEdges {
    fn parent_region(&self, domain: &Domain, default_width: f64) -> Result<Domain, PalmError> {
        match *self {
            Self::Periodic => Ok(domain.clone()),
            Self::Buffer { width: None } => Ok(domain.expanded(default_width)),
            Self::Buffer { width: Some(width) } => {
                if width.is_finite() && width >= 0.0 {
                    Ok(domain.expanded(width))
                } else {
                    Err(PalmError::configuration(format!(
                        "simulation buffer width must be non-negative and finite, got {width}"
                    )))
                }
            }
        }
    }
}

/// Simulated point pattern
#[derive(Clone, Debug, PartialEq)]
pub struct Simulation {
    pub points: PointSet,
    /// Parent of every point, for processes with siblings
    pub siblings: Option<SiblingGroundTruth>,
    pub n_parents: usize,
    /// Number of points before edge handling or deletion
    pub n_generated: usize,
}

fn uniform_point(rng: &mut dyn RngCore, region: &Domain) -> Vec<f64> {
    region
        .lower()
        .iter()
        .zip(region.upper())
        .map(|(&lo, &hi)| rng.random_range(lo..hi))
        .collect()
}

/// Simulate `family` with `params` observed in `domain`
pub fn simulate(
    family: &ProcessFamily,
    params: &Params,
    domain: &Domain,
    edges: SimulationEdges,
    rng: &mut dyn RngCore,
) -> Result<Simulation, PalmError> {
    params.check_exact(&family.param_names(), "simulation parameters")?;
    family.check_dim(domain.dim())?;
    let simulation = match family {
        ProcessFamily::NeymanScott(ns) => simulate_neyman_scott(ns, params, domain, edges, rng)?,
        ProcessFamily::Void(void) => simulate_void(void, params, domain, edges, rng)?,
    };
    debug!(
        n_parents = simulation.n_parents,
        n_generated = simulation.n_generated,
        n_points = simulation.points.len(),
        "simulated point pattern"
    );
    Ok(simulation)
}

fn simulate_neyman_scott(
    ns: &NeymanScott,
    params: &Params,
    domain: &Domain,
    edges: SimulationEdges,
    rng: &mut dyn RngCore,
) -> Result<Simulation, PalmError> {
    let dim = domain.dim();
    let scale = ns.dispersion().scale(params)?;
    let region = edges.parent_region(domain, ns.dispersion().reach(scale))?;
    let parent_intensity = ns.child().parent_intensity(params)?;
    let n_parents = poisson_count(rng, parent_intensity * region.volume())?;

    let mut flat = vec![];
    let mut parents = vec![];
    let mut n_generated = 0;
    for parent in 0..n_parents {
        let centre = uniform_point(rng, &region);
        let n_children = ns.child().sample(rng, params)?;
        n_generated += n_children;
        for _ in 0..n_children {
            let offset = ns.dispersion().sample_offset(rng, scale, dim);
            let mut child: Vec<f64> = centre.iter().zip(&offset).map(|(c, o)| c + o).collect();
            match edges {
                SimulationEdges::Periodic => {
                    for (d, x) in child.iter_mut().enumerate() {
                        *x = domain.wrap(d, *x);
                    }
                }
                SimulationEdges::Buffer { .. } => {
                    if !domain.contains(&child) {
                        continue;
                    }
                }
            }
            flat.extend(child);
            parents.push(parent);
        }
    }
    Ok(Simulation {
        points: PointSet::from_flat(dim, flat)?,
        siblings: Some(SiblingGroundTruth::new(parents)),
        n_parents,
        n_generated,
    })
}

fn simulate_void(
    _void: &VoidProcess,
    params: &Params,
    domain: &Domain,
    edges: SimulationEdges,
    rng: &mut dyn RngCore,
) -> Result<Simulation, PalmError> {
    let dim = domain.dim();
    let baseline_density = params.positive(Param::Dc)?;
    let parent_density = params.positive(Param::Dp)?;
    let tau = params.positive(Param::Tau)?;
    let region = edges.parent_region(domain, tau)?;

    let n_generated = poisson_count(rng, baseline_density * domain.volume())?;
    let baseline: Vec<_> = (0..n_generated)
        .map(|_| uniform_point(rng, domain))
        .collect();
    let n_parents = poisson_count(rng, parent_density * region.volume())?;
    let centres: Vec<_> = (0..n_parents)
        .map(|_| uniform_point(rng, &region))
        .collect();

    let extents = domain.extents();
    let distance = |a: &[f64], b: &[f64]| match edges {
        SimulationEdges::Periodic => periodic_distance(a, b, &extents),
        SimulationEdges::Buffer { .. } => euclidean_distance(a, b),
    };
    let flat: Vec<f64> = baseline
        .into_iter()
        .filter(|point| {
            centres
                .iter()
                .all(|centre| distance(point.as_slice(), centre.as_slice()) > tau)
        })
        .flatten()
        .collect();
    Ok(Simulation {
        points: PointSet::from_flat(dim, flat)?,
        siblings: None,
        n_parents,
        n_generated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::family::{ChildDist, Dispersion};

    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn thomas() -> ProcessFamily {
        ProcessFamily::neyman_scott(ChildDist::poisson(), Dispersion::gaussian()).unwrap()
    }

    fn thomas_params() -> Params {
        Params::new()
            .with(Param::D, 10.0)
            .with(Param::Lambda, 5.0)
            .with(Param::Sigma, 0.025)
    }

    #[test]
    fn periodic_children_stay_inside() {
        let mut rng = StdRng::seed_from_u64(0);
        let domain = Domain::unit(2).unwrap();
        let params = thomas_params().with(Param::D, 50.0);
        let sim =
            simulate(&thomas(), &params, &domain, SimulationEdges::Periodic, &mut rng).unwrap();
        assert_eq!(sim.points.len(), sim.n_generated);
        assert!(sim.points.check_inside(&domain).is_ok());
        let siblings = sim.siblings.unwrap();
        assert_eq!(siblings.len(), sim.points.len());
        assert!(siblings.parents().iter().all(|&p| p < sim.n_parents));
    }

    #[test]
    fn buffer_discards_outside() {
        let mut rng = StdRng::seed_from_u64(1);
        let domain = Domain::unit(1).unwrap();
        let edges = SimulationEdges::Buffer { width: Some(0.2) };
        let params = thomas_params().with(Param::Sigma, 0.1);
        let sim = simulate(&thomas(), &params, &domain, edges, &mut rng).unwrap();
        assert!(sim.points.len() <= sim.n_generated);
        assert!(sim.points.check_inside(&domain).is_ok());
    }

    #[test]
    fn mean_count() {
        let mut rng = StdRng::seed_from_u64(2);
        let domain = Domain::unit(1).unwrap();
        let n = 2000;
        let total: usize = (0..n)
            .map(|_| {
                simulate(&thomas(), &thomas_params(), &domain, SimulationEdges::Periodic, &mut rng)
                    .unwrap()
                    .points
                    .len()
            })
            .sum();
        assert_relative_eq!(total as f64 / n as f64, 50.0, max_relative = 0.05);
    }

    #[test]
    fn void_deletes() {
        let mut rng = StdRng::seed_from_u64(3);
        let domain = Domain::unit(2).unwrap();
        let params = Params::new()
            .with(Param::Dc, 50.0)
            .with(Param::Dp, 5.0)
            .with(Param::Tau, 0.05);
        for edges in [SimulationEdges::Periodic, SimulationEdges::Buffer { width: None }] {
            for _ in 0..20 {
                let sim =
                    simulate(&ProcessFamily::void(), &params, &domain, edges, &mut rng).unwrap();
                assert!(sim.points.len() <= sim.n_generated);
                assert!(sim.siblings.is_none());
            }
        }
    }

    #[test]
    fn wrong_parameters() {
        let mut rng = StdRng::seed_from_u64(4);
        let domain = Domain::unit(1).unwrap();
        let params = thomas_params().with(Param::Tau, 0.1);
        assert!(matches!(
            simulate(&thomas(), &params, &domain, SimulationEdges::Periodic, &mut rng),
            Err(PalmError::Configuration(_))
        ));
        let edges = SimulationEdges::Buffer {
            width: Some(f64::NAN),
        };
        assert!(matches!(
            simulate(&thomas(), &thomas_params(), &domain, edges, &mut rng),
            Err(PalmError::Configuration(_))
        ));
    }
}
