use crate::family::{ChildDist, DispersionTrait, ProcessFamily};
use crate::params::{Bounds, Param};

/// Default parameter bounds of a composed model fitted with truncation distance `r`
///
/// Densities and the number of children are only bounded to be positive, dispersion and
/// deletion radii must not exceed `r`, the binomial probability lies in `[0, 1]` and the
/// two-plane dive cycle is not shorter than the surface time.
pub fn default_bounds(family: &ProcessFamily, r: f64) -> Bounds {
    match family {
        ProcessFamily::NeymanScott(ns) => {
            let mut bounds = Bounds::new()
                .with(Param::D, 0.0, f64::INFINITY)
                .with(ns.dispersion().param(), 0.0, r);
            match ns.child() {
                ChildDist::Poisson(_) => {
                    bounds.insert(Param::Lambda, 0.0, f64::INFINITY);
                }
                ChildDist::Binomial(_) => {
                    bounds.insert(Param::P, 0.0, 1.0);
                }
                ChildDist::TwoPlane(children) => {
                    if children.info.dive_cycle().is_none() {
                        bounds.insert(Param::Kappa, children.info.surface_time(), f64::INFINITY);
                    }
                }
            }
            bounds
        }
        ProcessFamily::Void(_) => Bounds::new()
            .with(Param::Dc, 0.0, f64::INFINITY)
            .with(Param::Dp, 0.0, f64::INFINITY)
            .with(Param::Tau, 0.0, r),
    }
}
