use crate::error::{IntensityError, PalmError};
use crate::geometry::{ball_overlap_volume, ball_volume, sphere_surface};
use crate::params::{Param, Params};
use crate::quadrature::integrate;

use enum_dispatch::enum_dispatch;
use rand::{Rng, RngCore};
use rand_distr::{Normal, StandardNormal};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::Debug;
use std::str::FromStr;

/// Isotropic multivariate-normal density at distance `r` from the mean
///
/// The density of `N(0, sd² I)` in `dim` dimensions factorises into `dim` univariate normal
/// densities, `dim - 1` of them evaluated at zero.
pub fn mvn_isotropic_density(r: f64, sd: f64, dim: usize) -> f64 {
    let norm = (sd * (2.0 * PI).sqrt()).recip();
    norm.powi(dim as i32) * f64::exp(-0.5 * r * r / (sd * sd))
}

/// Offset of a child relative to its parent
#[enum_dispatch]
pub trait DispersionTrait: Clone + Debug {
    /// Name of the scale parameter
    fn param(&self) -> Param;

    /// Density of a single child offset at distance `r`
    fn offset_density(&self, r: f64, scale: f64, dim: usize) -> f64;

    /// Density of the offset between two siblings at distance `r`
    fn sibling_density(&self, r: f64, scale: f64, dim: usize) -> f64;

    /// Probability that two siblings are not further than `r` apart
    fn sibling_cdf(&self, r: f64, scale: f64, dim: usize) -> f64;

    /// Buffer width which contains practically all children of a parent
    fn reach(&self, scale: f64) -> f64;

    /// Draw one child offset
    fn sample_offset(&self, rng: &mut dyn RngCore, scale: f64, dim: usize) -> Vec<f64>;

    /// Scale parameter value, checked to be positive
    fn scale(&self, params: &Params) -> Result<f64, IntensityError> {
        params.positive(self.param())
    }
}

/// Dispersion kernel of a Neyman-Scott process
#[enum_dispatch(DispersionTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum Dispersion {
    Gaussian(GaussianDispersion),
    Uniform(UniformDispersion),
}

impl Dispersion {
    /// Thomas-process offsets: isotropic normal with standard deviation `sigma`
    pub fn gaussian() -> Self {
        GaussianDispersion {}.into()
    }

    /// Matérn-process offsets: uniform in a ball of radius `tau`
    pub fn uniform() -> Self {
        UniformDispersion {}.into()
    }

    pub fn is_gaussian(&self) -> bool {
        matches!(self, Self::Gaussian(_))
    }
}

impl FromStr for Dispersion {
    type Err = PalmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gaussian" | "thomas" => Ok(Self::gaussian()),
            "uniform" | "matern" => Ok(Self::uniform()),
            _ => Err(PalmError::configuration(format!(
                "unrecognised dispersion {s:?}, expected one of \"gaussian\" or \"uniform\""
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct GaussianDispersion {}

impl DispersionTrait for GaussianDispersion {
    fn param(&self) -> Param {
        Param::Sigma
    }

    fn offset_density(&self, r: f64, sigma: f64, dim: usize) -> f64 {
        mvn_isotropic_density(r, sigma, dim)
    }

    fn sibling_density(&self, r: f64, sigma: f64, dim: usize) -> f64 {
        // difference of two independent offsets
        mvn_isotropic_density(r, sigma * std::f64::consts::SQRT_2, dim)
    }

    fn sibling_cdf(&self, r: f64, sigma: f64, dim: usize) -> f64 {
        if r <= 0.0 {
            return 0.0;
        }
        let sd = sigma * std::f64::consts::SQRT_2;
        let u = r / sd;
        match dim {
            1 => 1.0 - libm::erfc(u / std::f64::consts::SQRT_2),
            2 => -f64::exp_m1(-0.5 * u * u),
            3 => {
                1.0 - libm::erfc(u / std::f64::consts::SQRT_2)
                    - f64::sqrt(2.0 / PI) * u * f64::exp(-0.5 * u * u)
            }
            _ => {
                let upper = r.min(12.0 * sd);
                integrate(
                    |x| sphere_surface(dim, x) * mvn_isotropic_density(x, sd, dim),
                    0.0,
                    upper,
                )
                .min(1.0)
            }
        }
    }

    fn reach(&self, sigma: f64) -> f64 {
        4.0 * sigma
    }

    fn sample_offset(&self, rng: &mut dyn RngCore, sigma: f64, dim: usize) -> Vec<f64> {
        (0..dim)
            .map(|_| sigma * rng.sample::<f64, _>(StandardNormal))
            .collect()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct UniformDispersion {}

impl DispersionTrait for UniformDispersion {
    fn param(&self) -> Param {
        Param::Tau
    }

    fn offset_density(&self, r: f64, tau: f64, dim: usize) -> f64 {
        if r <= tau {
            ball_volume(dim, tau).recip()
        } else {
            0.0
        }
    }

    fn sibling_density(&self, r: f64, tau: f64, dim: usize) -> f64 {
        ball_overlap_volume(dim, tau, r) / ball_volume(dim, tau).powi(2)
    }

    fn sibling_cdf(&self, r: f64, tau: f64, dim: usize) -> f64 {
        if r >= 2.0 * tau {
            return 1.0;
        }
        integrate(
            |x| sphere_surface(dim, x) * self.sibling_density(x, tau, dim),
            0.0,
            r,
        )
        .min(1.0)
    }

    fn reach(&self, tau: f64) -> f64 {
        tau
    }

    fn sample_offset(&self, rng: &mut dyn RngCore, tau: f64, dim: usize) -> Vec<f64> {
        let direction: Vec<f64> = (0..dim)
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();
        let norm = direction.iter().map(|x| x * x).sum::<f64>().sqrt();
        let radius = tau * rng.random::<f64>().powf((dim as f64).recip());
        if norm > 0.0 {
            direction.into_iter().map(|x| x / norm * radius).collect()
        } else {
            vec![0.0; dim]
        }
    }
}

/// Normal distribution with zero mean, used by the two-plane sightings
pub(crate) fn centred_normal(sd: f64) -> Result<Normal<f64>, IntensityError> {
    Normal::new(0.0, sd).map_err(|e| IntensityError::Domain(e.to_string()))
}
