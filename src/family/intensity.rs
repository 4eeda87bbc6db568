use crate::error::IntensityError;
use crate::family::dispersion::{Dispersion, DispersionTrait};
use crate::geometry::{ball_overlap_volume, ball_volume, sphere_surface};
use crate::quadrature::integrate;

/// Palm intensity of a process with fixed parameters, a function of distance only
#[derive(Clone, Debug, PartialEq)]
pub enum PalmIntensity {
    Cluster(ClusterIntensity),
    Void(VoidIntensity),
}

impl PalmIntensity {
    fn check_distance(r: f64) -> Result<(), IntensityError> {
        if r >= 0.0 && r.is_finite() {
            Ok(())
        } else {
            Err(IntensityError::Domain(format!(
                "distance must be non-negative and finite, got {r}"
            )))
        }
    }

    /// Palm intensity at distance `r`
    pub fn eval(&self, r: f64) -> Result<f64, IntensityError> {
        let (sibling, nonsibling) = self.split(r)?;
        Ok(sibling + nonsibling)
    }

    /// Sibling and non-sibling parts of the Palm intensity at distance `r`
    ///
    /// Void processes have no siblings, all the intensity is the non-sibling part.
    pub fn split(&self, r: f64) -> Result<(f64, f64), IntensityError> {
        Self::check_distance(r)?;
        Ok(match self {
            Self::Cluster(c) => (c.sibling(r), c.child_density),
            Self::Void(v) => (0.0, v.eval(r)),
        })
    }

    /// Integral of the Palm intensity over the ball of radius `r`
    pub fn integral(&self, r: f64) -> Result<f64, IntensityError> {
        Self::check_distance(r)?;
        Ok(match self {
            Self::Cluster(c) => c.integral(r),
            Self::Void(v) => v.integral(r),
        })
    }
}

/// `λ(r) = Dc + E[N(N - 1)] / E[N] · f(r)`, with `f` the sibling offset density
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterIntensity {
    pub child_density: f64,
    pub siblings_per_child: f64,
    pub dispersion: Dispersion,
    pub scale: f64,
    pub dim: usize,
}

impl ClusterIntensity {
    fn sibling(&self, r: f64) -> f64 {
        self.siblings_per_child * self.dispersion.sibling_density(r, self.scale, self.dim)
    }

    fn integral(&self, r: f64) -> f64 {
        self.child_density * ball_volume(self.dim, r)
            + self.siblings_per_child * self.dispersion.sibling_cdf(r, self.scale, self.dim)
    }
}

/// `λ(r) = Dc exp(-Dp (V(τ) - O(τ, r)))`
///
/// `V` is the ball volume and `O` the overlap of two balls with centres `r` apart. This is the
/// second-order product density `Dc² exp(-Dp (2V(τ) - O(τ, r)))` divided by the intensity
/// `Dc exp(-Dp V(τ))` of the thinned process.
#[derive(Clone, Debug, PartialEq)]
pub struct VoidIntensity {
    pub baseline_density: f64,
    pub parent_density: f64,
    pub tau: f64,
    pub dim: usize,
}

impl VoidIntensity {
    fn eval(&self, r: f64) -> f64 {
        let exposed = ball_volume(self.dim, self.tau) - ball_overlap_volume(self.dim, self.tau, r);
        self.baseline_density * f64::exp(-self.parent_density * exposed)
    }

    /// Intensity of the thinned process, the large-distance limit of [VoidIntensity::eval]
    pub fn density(&self) -> f64 {
        self.baseline_density * f64::exp(-self.parent_density * ball_volume(self.dim, self.tau))
    }

    fn integral(&self, r: f64) -> f64 {
        let correlated = r.min(2.0 * self.tau);
        let near = integrate(|x| sphere_surface(self.dim, x) * self.eval(x), 0.0, correlated);
        near + self.density() * (ball_volume(self.dim, r) - ball_volume(self.dim, correlated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn thomas(dim: usize) -> PalmIntensity {
        PalmIntensity::Cluster(ClusterIntensity {
            child_density: 50.0,
            siblings_per_child: 5.0,
            dispersion: Dispersion::gaussian(),
            scale: 0.025,
            dim,
        })
    }

    fn void(dim: usize) -> PalmIntensity {
        PalmIntensity::Void(VoidIntensity {
            baseline_density: 50.0,
            parent_density: 5.0,
            tau: 0.05,
            dim,
        })
    }

    #[test]
    fn negative_distance_is_domain_error() {
        for intensity in [thomas(1), void(2)] {
            assert!(matches!(
                intensity.eval(-0.1),
                Err(IntensityError::Domain(_))
            ));
            assert!(matches!(
                intensity.eval(f64::NAN),
                Err(IntensityError::Domain(_))
            ));
        }
    }

    #[test]
    fn non_negative_and_finite() {
        for dim in 1..=3 {
            for intensity in [thomas(dim), void(dim)] {
                for i in 0..=100 {
                    let value = intensity.eval(i as f64 * 0.005).unwrap();
                    assert!(value.is_finite() && value >= 0.0);
                }
            }
        }
    }

    #[test]
    fn cluster_tends_to_child_density() {
        let intensity = thomas(1);
        assert_relative_eq!(intensity.eval(1.0).unwrap(), 50.0, max_relative = 1e-12);
        let (sibling, nonsibling) = intensity.split(0.01).unwrap();
        assert!(sibling > 0.0);
        assert_eq!(nonsibling, 50.0);
    }

    #[test]
    fn void_limits() {
        let intensity = void(2);
        assert_relative_eq!(intensity.eval(0.0).unwrap(), 50.0, max_relative = 1e-12);
        let PalmIntensity::Void(v) = &intensity else {
            unreachable!()
        };
        assert_relative_eq!(intensity.eval(0.2).unwrap(), v.density(), max_relative = 1e-12);
        assert!(v.density() < 50.0);
    }

    #[test]
    fn integral_matches_quadrature() {
        for dim in 1..=3 {
            for intensity in [thomas(dim), void(dim)] {
                for r in [0.01, 0.05, 0.3] {
                    let numeric = integrate(
                        |x| sphere_surface(dim, x) * intensity.eval(x).unwrap(),
                        0.0,
                        r,
                    );
                    assert_relative_eq!(
                        intensity.integral(r).unwrap(),
                        numeric,
                        max_relative = 1e-6
                    );
                }
            }
        }
    }
}
