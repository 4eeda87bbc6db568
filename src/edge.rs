//! Edge corrections and the pairwise contrasts they produce

use crate::data::{Domain, PointSet};
use crate::error::PalmError;
use crate::family::{PatternSummary, SiblingInfo, SiblingLabel};
use crate::geometry::{
    buffer_interior, buffer_survival_mask, check_radius, euclidean_distances, pair_index,
    periodic_distances,
};
use crate::simulate::SimulationEdges;

use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// How the Palm likelihood deals with the boundary of the observation window
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum EdgeCorrection {
    /// Toroidal wrap-around: every point is a focal point and distances are periodic
    #[default]
    Periodic,
    /// Only points at least the truncation distance away from the boundary are focal points
    Buffer,
}

impl EdgeCorrection {
    /// Pairwise contrasts of `points` not further apart than `r`
    pub fn contrasts(
        &self,
        points: &PointSet,
        domain: &Domain,
        r: f64,
    ) -> Result<Contrasts, PalmError> {
        points.check_inside(domain)?;
        check_radius(domain, r)?;
        let n = points.len();
        let contrasts = match self {
            Self::Periodic => {
                let distances = periodic_distances(points, domain)?;
                let (pairs, distances): (Vec<_>, Vec<_>) = (0..n)
                    .tuple_combinations::<(usize, usize)>()
                    .zip(distances)
                    .filter(|&(_, d)| d <= r)
                    .unzip();
                Contrasts {
                    weights: vec![2.0; pairs.len()],
                    pairs,
                    distances,
                    n_focal: n,
                    n_points: n,
                    dim: domain.dim(),
                    r,
                    volume: domain.volume(),
                }
            }
            Self::Buffer => {
                let interior = buffer_interior(points, domain, r)?;
                let survival = buffer_survival_mask(points, domain, r)?;
                let distances = euclidean_distances(points);
                let mut contrasts = Contrasts {
                    pairs: vec![],
                    distances: vec![],
                    weights: vec![],
                    n_focal: interior.iter().filter(|&&x| x).count(),
                    n_points: n,
                    dim: domain.dim(),
                    r,
                    volume: domain.volume(),
                };
                for (i, j) in (0..n).tuple_combinations() {
                    let d = distances[pair_index(n, i, j)];
                    if d <= r && survival[[i, j]] {
                        contrasts.pairs.push((i, j));
                        contrasts.distances.push(d);
                        contrasts
                            .weights
                            .push(f64::from(u8::from(interior[i]) + u8::from(interior[j])));
                    }
                }
                contrasts
            }
        };
        if contrasts.is_empty() {
            return Err(PalmError::EmptyPairSet { r });
        }
        debug!(
            edge = ?self,
            n_points = n,
            n_focal = contrasts.n_focal,
            n_pairs = contrasts.len(),
            "built Palm likelihood contrasts"
        );
        Ok(contrasts)
    }

    /// Simulation edge handling consistent with this correction
    pub fn simulation_edges(&self) -> SimulationEdges {
        match self {
            Self::Periodic => SimulationEdges::Periodic,
            Self::Buffer => SimulationEdges::Buffer { width: None },
        }
    }
}

impl FromStr for EdgeCorrection {
    type Err = PalmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pbc" | "periodic" => Ok(Self::Periodic),
            "buffer" => Ok(Self::Buffer),
            _ => Err(PalmError::configuration(format!(
                "unrecognised edge correction {s:?}, expected \"pbc\" or \"buffer\""
            ))),
        }
    }
}

/// Point pairs entering the Palm likelihood
///
/// Each contrast is an unordered pair `(i, j)`, `i < j`, whose weight is the number of its
/// ordered versions with a focal first point.
#[derive(Clone, Debug, PartialEq)]
pub struct Contrasts {
    pairs: Vec<(usize, usize)>,
    distances: Vec<f64>,
    weights: Vec<f64>,
    n_focal: usize,
    n_points: usize,
    dim: usize,
    r: f64,
    volume: f64,
}

impl Contrasts {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn n_focal(&self) -> usize {
        self.n_focal
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn r(&self) -> f64 {
        self.r
    }

    /// Sibling labels of the contrasts
    pub fn labels(&self, siblings: &SiblingInfo) -> Result<Vec<SiblingLabel>, PalmError> {
        if siblings.n_points() != self.n_points {
            return Err(PalmError::configuration(format!(
                "sibling matrix describes {} points, but the pattern has {}",
                siblings.n_points(),
                self.n_points
            )));
        }
        Ok(self
            .pairs
            .iter()
            .map(|&(i, j)| siblings.label(i, j))
            .collect())
    }

    pub fn summary(&self) -> PatternSummary {
        let close_r = PatternSummary::CLOSE_FRACTION * self.r;
        let close_neighbours = if self.n_focal > 0 {
            self.distances
                .iter()
                .zip(&self.weights)
                .filter(|&(&d, _)| d <= close_r)
                .map(|(_, &w)| w)
                .sum::<f64>()
                / self.n_focal as f64
        } else {
            0.0
        };
        PatternSummary {
            density: self.n_points as f64 / self.volume,
            close_neighbours,
            close_r,
            r: self.r,
            dim: self.dim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::GeometryError;
    use crate::tests::*;

    use ndarray::array;

    #[test]
    fn periodic_pairs() {
        let domain = Domain::unit(1).unwrap();
        let points = PointSet::from_1d(&[0.05, 0.1, 0.5, 0.97]).unwrap();
        let contrasts = EdgeCorrection::Periodic
            .contrasts(&points, &domain, 0.1)
            .unwrap();
        // (1, 3) is 0.13 apart through the boundary
        assert_eq!(contrasts.pairs(), &[(0, 1), (0, 3)]);
        assert_eq!(contrasts.weights(), &[2.0, 2.0]);
        assert_eq!(contrasts.n_focal(), 4);
        approx::assert_relative_eq!(contrasts.distances()[1], 0.08, epsilon = 1e-12);
    }

    #[test]
    fn buffer_weights_count_interior_points() {
        let domain = Domain::unit(2).unwrap();
        let points =
            PointSet::new(array![[0.05, 0.5], [0.15, 0.5], [0.3, 0.5], [0.95, 0.95]]).unwrap();
        let contrasts = EdgeCorrection::Buffer
            .contrasts(&points, &domain, 0.2)
            .unwrap();
        // only the third point is interior
        assert_eq!(contrasts.n_focal(), 1);
        assert_eq!(contrasts.pairs(), &[(1, 2)]);
        assert_eq!(contrasts.weights(), &[1.0]);
    }

    #[test]
    fn summary_counts_close_neighbours() {
        let domain = Domain::unit(1).unwrap();
        let points = PointSet::from_1d(&[0.1, 0.11, 0.5, 0.515, 0.9]).unwrap();
        let summary = EdgeCorrection::Periodic
            .contrasts(&points, &domain, 0.2)
            .unwrap()
            .summary();
        assert_relative_eq!(summary.close_r, 0.02);
        assert_relative_eq!(summary.density, 5.0);
        // two close pairs, each counted from both ends
        assert_relative_eq!(summary.close_neighbours, 0.8);
        assert_relative_eq!(summary.close_excess(), 0.6, max_relative = 1e-12);
    }

    #[test]
    fn no_pairs() {
        let domain = Domain::unit(1).unwrap();
        let points = PointSet::from_1d(&[0.1, 0.4, 0.7]).unwrap();
        assert!(matches!(
            EdgeCorrection::Periodic.contrasts(&points, &domain, 0.05),
            Err(PalmError::EmptyPairSet { .. })
        ));
    }

    #[test]
    fn buffer_radius_larger_than_domain() {
        let domain = Domain::unit(2).unwrap();
        let points = PointSet::new(array![[0.5, 0.5], [0.6, 0.5]]).unwrap();
        assert!(matches!(
            EdgeCorrection::Buffer.contrasts(&points, &domain, 2.0),
            Err(PalmError::Geometry(GeometryError::InvalidRadius { .. }))
        ));
    }

    #[test]
    fn points_outside() {
        let domain = Domain::unit(1).unwrap();
        let points = PointSet::from_1d(&[0.1, 1.4]).unwrap();
        assert!(matches!(
            EdgeCorrection::Periodic.contrasts(&points, &domain, 0.5),
            Err(PalmError::Geometry(GeometryError::PointOutsideDomain { index: 1 }))
        ));
    }

    #[test]
    fn parse() {
        assert_eq!("pbc".parse::<EdgeCorrection>().unwrap(), EdgeCorrection::Periodic);
        assert_eq!("buffer".parse::<EdgeCorrection>().unwrap(), EdgeCorrection::Buffer);
        assert!("mirror".parse::<EdgeCorrection>().is_err());
    }

    #[test]
    fn random_pattern_weights() {
        let mut rng = StdRng::seed_from_u64(0);
        let domain = Domain::new([(0.0, 2.0), (-1.0, 1.0)]).unwrap();
        let points = random_points(&mut rng, &domain, 200);
        let r = 0.3;

        let periodic = EdgeCorrection::Periodic
            .contrasts(&points, &domain, r)
            .unwrap();
        assert_eq!(periodic.n_focal(), 200);
        assert!(periodic.distances().iter().all(|&d| d <= r));

        let buffer = EdgeCorrection::Buffer.contrasts(&points, &domain, r).unwrap();
        assert!(buffer.n_focal() < 200);
        assert!(buffer.len() <= periodic.len());
        assert!(buffer.weights().iter().all(|&w| w == 1.0 || w == 2.0));
        let total: f64 = buffer.weights().iter().sum();
        let interior_pairs = buffer.weights().iter().filter(|&&w| w == 2.0).count();
        assert_relative_eq!(total, (buffer.len() + interior_pairs) as f64);
    }
}
