use crate::error::{IntensityError, PalmError};
use crate::family::twoplane::TwoPlaneInfo;
use crate::params::{Param, Params};

use enum_dispatch::enum_dispatch;
use rand::RngCore;
use rand_distr::{Binomial, Distribution, Poisson};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::str::FromStr;

/// First two factorial moments of the number of children of a parent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChildMoments {
    /// `E[N]`
    pub mean: f64,
    /// `E[N(N - 1)]`
    pub factorial2: f64,
}

impl ChildMoments {
    /// Expected number of siblings of a typical child, `E[N(N - 1)] / E[N]`
    pub fn siblings_per_child(&self) -> Result<f64, IntensityError> {
        if self.mean > 0.0 {
            Ok(self.factorial2 / self.mean)
        } else {
            Err(IntensityError::Domain(format!(
                "expected number of children is {}, but it must be positive",
                self.mean
            )))
        }
    }
}

/// Distribution of the number of children of a parent
#[enum_dispatch]
pub trait ChildDistTrait: Clone + Debug {
    /// Parameters of the distribution
    fn param_names(&self) -> Vec<Param>;

    /// `E[N]` and `E[N(N - 1)]`
    ///
    /// `params` holds all the model parameters, the two-plane survey needs the dispersion scale.
    fn moments(&self, params: &Params) -> Result<ChildMoments, IntensityError>;

    /// Number of parents per unit volume of the observed domain
    fn parent_intensity(&self, params: &Params) -> Result<f64, IntensityError> {
        params.positive(Param::D)
    }

    /// Draw the number of children of one parent
    fn sample(&self, rng: &mut dyn RngCore, params: &Params) -> Result<usize, IntensityError>;
}

/// Child-count distribution of a Neyman-Scott process
///
/// Mode strings are `"pois"`, `"binom<n>"` (e.g. `"binom5"`) and `"twoplane"`. The two-plane
/// distribution needs survey constants, see [ChildDist::from_mode].
#[enum_dispatch(ChildDistTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum ChildDist {
    Poisson(PoissonChildren),
    Binomial(BinomialChildren),
    TwoPlane(TwoPlaneChildren),
}

impl ChildDist {
    pub fn poisson() -> Self {
        PoissonChildren {}.into()
    }

    pub fn binomial(trials: u32) -> Result<Self, PalmError> {
        if trials == 0 {
            return Err(PalmError::configuration(
                "binomial child distribution needs at least one trial",
            ));
        }
        Ok(BinomialChildren { trials }.into())
    }

    pub fn two_plane(info: TwoPlaneInfo) -> Result<Self, PalmError> {
        info.validate()?;
        Ok(TwoPlaneChildren { info }.into())
    }

    /// Parse a mode string, `info` is required by and only accepted for `"twoplane"`
    pub fn from_mode(mode: &str, info: Option<TwoPlaneInfo>) -> Result<Self, PalmError> {
        match (mode.parse::<ChildDistMode>()?, info) {
            (ChildDistMode::TwoPlane, Some(info)) => Self::two_plane(info),
            (ChildDistMode::TwoPlane, None) => Err(PalmError::configuration(
                "two-plane child distribution requires survey information",
            )),
            (_, Some(_)) => Err(PalmError::configuration(format!(
                "survey information is only used by the two-plane distribution, not by {mode:?}"
            ))),
            (ChildDistMode::Poisson, None) => Ok(Self::poisson()),
            (ChildDistMode::Binomial(trials), None) => Self::binomial(trials),
        }
    }

    pub fn two_plane_info(&self) -> Option<&TwoPlaneInfo> {
        match self {
            Self::TwoPlane(children) => Some(&children.info),
            _ => None,
        }
    }
}

/// Parsed child distribution mode string
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildDistMode {
    Poisson,
    Binomial(u32),
    TwoPlane,
}

impl FromStr for ChildDistMode {
    type Err = PalmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pois" | "poisson" => Ok(Self::Poisson),
            "twoplane" => Ok(Self::TwoPlane),
            _ => match s.strip_prefix("binom").map(str::parse::<u32>) {
                Some(Ok(trials)) => Ok(Self::Binomial(trials)),
                _ => Err(PalmError::configuration(format!(
                    "unrecognised child distribution {s:?}, \
                     expected \"pois\", \"binom<n>\" or \"twoplane\""
                ))),
            },
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct PoissonChildren {}

impl ChildDistTrait for PoissonChildren {
    fn param_names(&self) -> Vec<Param> {
        vec![Param::Lambda]
    }

    fn moments(&self, params: &Params) -> Result<ChildMoments, IntensityError> {
        let lambda = params.positive(Param::Lambda)?;
        Ok(ChildMoments {
            mean: lambda,
            factorial2: lambda * lambda,
        })
    }

    fn sample(&self, rng: &mut dyn RngCore, params: &Params) -> Result<usize, IntensityError> {
        let lambda = params.positive(Param::Lambda)?;
        poisson_count(rng, lambda)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct BinomialChildren {
    pub trials: u32,
}

impl BinomialChildren {
    fn p(&self, params: &Params) -> Result<f64, IntensityError> {
        let p = params.require(Param::P)?;
        if (0.0..=1.0).contains(&p) {
            Ok(p)
        } else {
            Err(IntensityError::Domain(format!(
                "binomial probability p = {p} is outside of [0, 1]"
            )))
        }
    }
}

impl ChildDistTrait for BinomialChildren {
    fn param_names(&self) -> Vec<Param> {
        vec![Param::P]
    }

    fn moments(&self, params: &Params) -> Result<ChildMoments, IntensityError> {
        let p = self.p(params)?;
        let n = self.trials as f64;
        Ok(ChildMoments {
            mean: n * p,
            factorial2: n * (n - 1.0) * p * p,
        })
    }

    fn sample(&self, rng: &mut dyn RngCore, params: &Params) -> Result<usize, IntensityError> {
        let p = self.p(params)?;
        let binomial = Binomial::new(self.trials as u64, p)
            .map_err(|e| IntensityError::Domain(e.to_string()))?;
        Ok(binomial.sample(rng) as usize)
    }
}

/// Sightings of an animal by a two-plane survey, see [TwoPlaneInfo]
///
/// `D` is the animal density per unit area, `sigma` of the Gaussian dispersion is the animal
/// movement between the sightings.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct TwoPlaneChildren {
    pub info: TwoPlaneInfo,
}

impl ChildDistTrait for TwoPlaneChildren {
    fn param_names(&self) -> Vec<Param> {
        match self.info.dive_cycle() {
            Some(_) => vec![],
            None => vec![Param::Kappa],
        }
    }

    fn moments(&self, params: &Params) -> Result<ChildMoments, IntensityError> {
        let kappa = self.info.kappa(params)?;
        let sigma = params.positive(Param::Sigma)?;
        let (mean, factorial2) = self.info.moments(kappa, sigma);
        Ok(ChildMoments { mean, factorial2 })
    }

    fn parent_intensity(&self, params: &Params) -> Result<f64, IntensityError> {
        Ok(params.positive(Param::D)? * 2.0 * self.info.survey_halfwidth())
    }

    fn sample(&self, rng: &mut dyn RngCore, params: &Params) -> Result<usize, IntensityError> {
        let kappa = self.info.kappa(params)?;
        let sigma = params.positive(Param::Sigma)?;
        self.info.sample_sightings(rng, kappa, sigma)
    }
}

/// Poisson draw which allows zero mean
pub(crate) fn poisson_count(rng: &mut dyn RngCore, mean: f64) -> Result<usize, IntensityError> {
    if mean == 0.0 {
        return Ok(0);
    }
    let poisson = Poisson::new(mean).map_err(|e| IntensityError::Domain(e.to_string()))?;
    Ok(poisson.sample(rng) as usize)
}
