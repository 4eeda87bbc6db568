use crate::data::domain::Domain;
use crate::error::GeometryError;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Ordered set of `D`-dimensional points stored as an `n × D` matrix
#[derive(Clone, Debug, PartialEq)]
pub struct PointSet {
    coords: Array2<f64>,
}

impl PointSet {
    /// Construct [PointSet] from an `n × D` coordinate matrix
    ///
    /// `D` must be positive and all coordinates finite.
    pub fn new(coords: Array2<f64>) -> Result<Self, GeometryError> {
        if coords.ncols() == 0 {
            return Err(GeometryError::ZeroDimensional);
        }
        if let Some(index) = coords
            .axis_iter(Axis(0))
            .position(|row| row.iter().any(|x| !x.is_finite()))
        {
            return Err(GeometryError::NonFiniteCoordinate { index });
        }
        Ok(Self { coords })
    }

    /// One-dimensional point set
    pub fn from_1d(x: &[f64]) -> Result<Self, GeometryError> {
        Self::new(Array2::from_shape_fn((x.len(), 1), |(i, _)| x[i]))
    }

    /// Point set from a row-major flat vector of coordinates
    pub fn from_flat(dim: usize, flat: Vec<f64>) -> Result<Self, GeometryError> {
        if dim == 0 {
            return Err(GeometryError::ZeroDimensional);
        }
        let n = flat.len() / dim;
        if n * dim != flat.len() {
            return Err(GeometryError::DimensionMismatch {
                actual: flat.len() % dim,
                expected: dim,
            });
        }
        let coords = Array2::from_shape_vec((n, dim), flat).map_err(|_| {
            GeometryError::DimensionMismatch {
                actual: 0,
                expected: dim,
            }
        })?;
        Self::new(coords)
    }

    pub fn empty(dim: usize) -> Result<Self, GeometryError> {
        Self::new(Array2::zeros((0, dim)))
    }

    pub fn len(&self) -> usize {
        self.coords.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dim(&self) -> usize {
        self.coords.ncols()
    }

    pub fn point(&self, i: usize) -> ArrayView1<'_, f64> {
        self.coords.row(i)
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.coords.view()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.coords
    }

    /// Check that the dimensionality matches the domain
    pub fn check_dim(&self, domain: &Domain) -> Result<(), GeometryError> {
        if self.dim() == domain.dim() {
            Ok(())
        } else {
            Err(GeometryError::DimensionMismatch {
                actual: self.dim(),
                expected: domain.dim(),
            })
        }
    }

    /// Check that every point lies inside the domain
    pub fn check_inside(&self, domain: &Domain) -> Result<(), GeometryError> {
        self.check_dim(domain)?;
        match self
            .coords
            .axis_iter(Axis(0))
            .position(|row| !domain.contains(&row.to_vec()))
        {
            Some(index) => Err(GeometryError::PointOutsideDomain { index }),
            None => Ok(()),
        }
    }
}
