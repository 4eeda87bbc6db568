use crate::error::GeometryError;

use serde::{Deserialize, Serialize};

/// Axis-aligned hyper-rectangle observation window
///
/// Each dimension is given by its `(lower, upper)` limits, `lower < upper` is guaranteed by the
/// constructor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct Domain {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Domain {
    /// Construct [Domain] from per-dimension `(lower, upper)` limits
    pub fn new(limits: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, GeometryError> {
        let (lower, upper): (Vec<_>, Vec<_>) = limits.into_iter().unzip();
        if lower.is_empty() {
            return Err(GeometryError::ZeroDimensional);
        }
        for (dim, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(GeometryError::InvalidDomain {
                    dim,
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(Self { lower, upper })
    }

    /// Unit hyper-cube `[0, 1]^dim`
    pub fn unit(dim: usize) -> Result<Self, GeometryError> {
        Self::new(std::iter::repeat_n((0.0, 1.0), dim))
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn extent(&self, dim: usize) -> f64 {
        self.upper[dim] - self.lower[dim]
    }

    pub fn extents(&self) -> Vec<f64> {
        (0..self.dim()).map(|i| self.extent(i)).collect()
    }

    pub fn volume(&self) -> f64 {
        (0..self.dim()).map(|i| self.extent(i)).product()
    }

    pub fn min_extent(&self) -> f64 {
        (0..self.dim())
            .map(|i| self.extent(i))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn contains(&self, point: &[f64]) -> bool {
        point
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(&x, (&lo, &hi))| lo <= x && x <= hi)
    }

    /// Smallest distance from `point` to any face of the domain
    pub fn distance_to_boundary(&self, point: &[f64]) -> f64 {
        point
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .map(|(&x, (&lo, &hi))| f64::min(x - lo, hi - x))
            .fold(f64::INFINITY, f64::min)
    }

    /// Map a coordinate onto the domain by toroidal wrap-around
    pub fn wrap(&self, dim: usize, x: f64) -> f64 {
        self.lower[dim] + (x - self.lower[dim]).rem_euclid(self.extent(dim))
    }

    /// Domain grown by `width` on every side, `width` must be non-negative
    pub fn expanded(&self, width: f64) -> Self {
        debug_assert!(width >= 0.0);
        Self {
            lower: self.lower.iter().map(|&lo| lo - width).collect(),
            upper: self.upper.iter().map(|&hi| hi + width).collect(),
        }
    }
}

impl TryFrom<Vec<(f64, f64)>> for Domain {
    type Error = GeometryError;

    fn try_from(limits: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        Self::new(limits)
    }
}

impl From<Domain> for Vec<(f64, f64)> {
    fn from(domain: Domain) -> Self {
        domain.lower.into_iter().zip(domain.upper).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn inverted_limits() {
        assert_eq!(
            Domain::new([(0.0, 1.0), (2.0, 1.0)]),
            Err(GeometryError::InvalidDomain {
                dim: 1,
                lower: 2.0,
                upper: 1.0
            })
        );
        assert!(Domain::new([(0.0, 0.0)]).is_err());
        assert!(Domain::new([(0.0, f64::INFINITY)]).is_err());
        assert_eq!(
            Domain::new(std::iter::empty()),
            Err(GeometryError::ZeroDimensional)
        );
    }

    #[test]
    fn volume_and_extents() {
        let domain = Domain::new([(0.0, 2.0), (-1.0, 0.5)]).unwrap();
        assert_eq!(domain.dim(), 2);
        assert_relative_eq!(domain.volume(), 3.0);
        assert_relative_eq!(domain.min_extent(), 1.5);
        assert_relative_eq!(domain.distance_to_boundary(&[0.5, 0.0]), 0.5);
    }

    #[test]
    fn wrap() {
        let domain = Domain::new([(1.0, 3.0)]).unwrap();
        assert_relative_eq!(domain.wrap(0, 3.5), 1.5);
        assert_relative_eq!(domain.wrap(0, 0.25), 2.25);
        assert_relative_eq!(domain.wrap(0, 2.0), 2.0);
    }

    #[test]
    fn serde_round_trip() {
        let domain = Domain::new([(0.0, 1.0), (0.0, 2.0)]).unwrap();
        let json = serde_json::to_string(&domain).unwrap();
        assert_eq!(serde_json::from_str::<Domain>(&json).unwrap(), domain);
        assert!(serde_json::from_str::<Domain>("[[1.0, 0.0]]").is_err());
    }
}
