//! Pairwise distances, buffer survival and ball volumes
//!
//! Pairs are always enumerated as unordered `(i, j)` with `i < j` in row-major order, use
//! [pair_index] to find a pair in the output of [periodic_distances] or
//! [euclidean_distances].

use crate::data::{Domain, PointSet};
use crate::error::GeometryError;
use crate::quadrature::integrate;

use itertools::Itertools;
use ndarray::Array2;
use std::f64::consts::PI;

/// Position of the unordered pair `(i, j)`, `i < j < n`, in the pair enumeration
pub fn pair_index(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j && j < n);
    i * (2 * n - i - 1) / 2 + (j - i - 1)
}

/// Check that `r` is a usable truncation radius for `domain`
///
/// Valid radii are finite, positive and not larger than half of the smallest domain extent.
pub fn check_radius(domain: &Domain, r: f64) -> Result<(), GeometryError> {
    let max = 0.5 * domain.min_extent();
    if r.is_finite() && r > 0.0 && r <= max {
        Ok(())
    } else {
        Err(GeometryError::InvalidRadius { radius: r, max })
    }
}

/// Minimum distance between `a` and `b` under toroidal wrap-around of a box with `extents`
pub fn periodic_distance(a: &[f64], b: &[f64], extents: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .zip(extents)
        .map(|((&x, &y), &e)| {
            let dx = (x - y).abs() % e;
            let dx = dx.min(e - dx);
            dx * dx
        })
        .sum::<f64>()
        .sqrt()
}

/// Plain Euclidean distance between `a` and `b`
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn rows(points: &PointSet) -> Vec<Vec<f64>> {
    points.view().outer_iter().map(|row| row.to_vec()).collect()
}

/// Periodic-boundary distances of every unordered pair of points
pub fn periodic_distances(points: &PointSet, domain: &Domain) -> Result<Vec<f64>, GeometryError> {
    points.check_dim(domain)?;
    let extents = domain.extents();
    let rows = rows(points);
    Ok(rows
        .iter()
        .tuple_combinations()
        .map(|(a, b)| periodic_distance(a, b, &extents))
        .collect())
}

/// Plain Euclidean distances of every unordered pair of points
pub fn euclidean_distances(points: &PointSet) -> Vec<f64> {
    let rows = rows(points);
    rows.iter()
        .tuple_combinations()
        .map(|(a, b)| euclidean_distance(a, b))
        .collect()
}

/// Which points lie at least `r` away from every face of the domain
pub fn buffer_interior(
    points: &PointSet,
    domain: &Domain,
    r: f64,
) -> Result<Vec<bool>, GeometryError> {
    points.check_dim(domain)?;
    check_radius(domain, r)?;
    Ok(points
        .view()
        .outer_iter()
        .map(|row| domain.distance_to_boundary(&row.to_vec()) >= r)
        .collect())
}

/// Pairs that survive buffer truncation at distance `r`
///
/// `mask[[i, j]]` is true if `i != j` and at least one of the points `i`, `j` is an interior
/// point (see [buffer_interior]). The mask is symmetric and loses entries as `r` grows.
pub fn buffer_survival_mask(
    points: &PointSet,
    domain: &Domain,
    r: f64,
) -> Result<Array2<bool>, GeometryError> {
    let interior = buffer_interior(points, domain, r)?;
    let n = interior.len();
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        i != j && (interior[i] || interior[j])
    }))
}

/// Volume of a `dim`-dimensional ball of radius `r`
pub fn ball_volume(dim: usize, r: f64) -> f64 {
    let half = 0.5 * dim as f64;
    PI.powf(half) / libm::tgamma(half + 1.0) * r.powi(dim as i32)
}

/// Surface area of a `dim`-dimensional sphere of radius `r`, equals 2 for `dim == 1`
pub fn sphere_surface(dim: usize, r: f64) -> f64 {
    dim as f64 * ball_volume(dim, 1.0) * r.powi(dim as i32 - 1)
}

/// Volume of the intersection of two `dim`-dimensional balls of radius `tau` with centres `r`
/// apart
pub fn ball_overlap_volume(dim: usize, tau: f64, r: f64) -> f64 {
    if r >= 2.0 * tau {
        return 0.0;
    }
    let r = r.max(0.0);
    match dim {
        1 => 2.0 * tau - r,
        2 => {
            2.0 * tau * tau * f64::acos(r / (2.0 * tau))
                - 0.5 * r * f64::sqrt(4.0 * tau * tau - r * r)
        }
        3 => PI / 12.0 * (4.0 * tau + r) * (2.0 * tau - r).powi(2),
        _ => {
            // two equal caps, each a stack of (dim - 1)-balls
            2.0 * integrate(
                |x| ball_volume(dim - 1, f64::sqrt((tau * tau - x * x).max(0.0))),
                0.5 * r,
                tau,
            )
        }
    }
}
