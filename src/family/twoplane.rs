//! Two-plane line-transect survey
//!
//! Two observers fly along the same transect `lag` time units apart. An animal at across-transect
//! position `y ~ U(-b, b)` alternates between surfaced and diving states as a two-state Markov
//! chain with mean surface time `S` and mean dive-cycle duration `kappa`. Each observer detects
//! the animal if it is surfaced and its observed position `y + e`, `e ~ N(0, sigma^2)`, lies
//! within the detection half-width `w`. Every animal is a parent with zero, one or two children:
//! its sightings.

use crate::error::{IntensityError, PalmError};
use crate::family::dispersion::centred_normal;
use crate::params::{Param, Params};
use crate::quadrature::integrate;

use ordered_float::NotNan;
use rand::{Rng, RngCore};
use rand_distr::Distribution;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;

/// Survey constants of the two-plane child distribution
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct TwoPlaneInfo {
    detection_halfwidth: NotNan<f64>,
    survey_halfwidth: NotNan<f64>,
    lag: NotNan<f64>,
    surface_time: NotNan<f64>,
    dive_cycle: Option<NotNan<f64>>,
}

fn not_nan(name: &str, value: f64) -> Result<NotNan<f64>, PalmError> {
    NotNan::new(value)
        .map_err(|_| PalmError::configuration(format!("two-plane {name} must not be NaN")))
}

impl TwoPlaneInfo {
    /// Create a new [TwoPlaneInfo]
    ///
    /// # Arguments
    /// - `detection_halfwidth`: `w`, half-width of the strip seen by the observers
    /// - `survey_halfwidth`: `b`, half-width of the strip where animals are counted, `b >= w`
    /// - `lag`: `l`, time between the passes of the two observers
    /// - `surface_time`: `S`, mean time an animal stays surfaced
    /// - `dive_cycle`: `kappa`, mean surface plus dive duration; `None` makes it a fitted
    ///   parameter
    pub fn new(
        detection_halfwidth: f64,
        survey_halfwidth: f64,
        lag: f64,
        surface_time: f64,
        dive_cycle: Option<f64>,
    ) -> Result<Self, PalmError> {
        let info = Self {
            detection_halfwidth: not_nan("detection half-width", detection_halfwidth)?,
            survey_halfwidth: not_nan("survey half-width", survey_halfwidth)?,
            lag: not_nan("lag", lag)?,
            surface_time: not_nan("surface time", surface_time)?,
            dive_cycle: dive_cycle
                .map(|kappa| not_nan("dive cycle", kappa))
                .transpose()?,
        };
        info.validate()?;
        Ok(info)
    }

    /// Check the survey constants, also needed for deserialized values
    pub fn validate(&self) -> Result<(), PalmError> {
        let positive = [
            ("detection half-width", self.detection_halfwidth()),
            ("survey half-width", self.survey_halfwidth()),
            ("lag", self.lag()),
            ("surface time", self.surface_time()),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PalmError::configuration(format!(
                    "two-plane {name} must be positive and finite, got {value}"
                )));
            }
        }
        if self.survey_halfwidth() < self.detection_halfwidth() {
            return Err(PalmError::configuration(format!(
                "two-plane survey half-width {} must not be smaller than detection half-width {}",
                self.survey_halfwidth(),
                self.detection_halfwidth()
            )));
        }
        if let Some(kappa) = self.dive_cycle() {
            if !kappa.is_finite() || kappa < self.surface_time() {
                return Err(PalmError::configuration(format!(
                    "dive cycle {kappa} must be finite and not shorter than surface time {}",
                    self.surface_time()
                )));
            }
        }
        Ok(())
    }

    pub fn detection_halfwidth(&self) -> f64 {
        self.detection_halfwidth.into_inner()
    }

    pub fn survey_halfwidth(&self) -> f64 {
        self.survey_halfwidth.into_inner()
    }

    pub fn lag(&self) -> f64 {
        self.lag.into_inner()
    }

    pub fn surface_time(&self) -> f64 {
        self.surface_time.into_inner()
    }

    pub fn dive_cycle(&self) -> Option<f64> {
        self.dive_cycle.map(NotNan::into_inner)
    }

    /// Dive-cycle duration, either fixed by the survey or taken from `params`
    pub fn kappa(&self, params: &Params) -> Result<f64, IntensityError> {
        let kappa = match self.dive_cycle() {
            Some(kappa) => kappa,
            None => params.positive(Param::Kappa)?,
        };
        if kappa < self.surface_time() {
            return Err(IntensityError::InvalidParameter {
                name: Param::Kappa,
                value: kappa,
                reason: "dive cycle must not be shorter than the surface time",
            });
        }
        Ok(kappa)
    }

    /// Surfacing probabilities of the Markov chain for dive cycle `kappa`
    pub fn surfacing(&self, kappa: f64) -> Surfacing {
        let s = self.surface_time();
        let surfaced = s / kappa;
        let rate = s.recip() + (kappa - s).recip();
        let decay = f64::exp(-rate * self.lag());
        Surfacing {
            surfaced,
            stay_surfaced: surfaced + (1.0 - surfaced) * decay,
            resurfaced: surfaced * (1.0 - decay),
        }
    }

    /// Averages of the one-pass detection probability and of its square over the survey strip
    pub fn detection(&self, sigma: f64) -> Detection {
        let (w, b) = (self.detection_halfwidth(), self.survey_halfwidth());
        let g = |y: f64| detection_probability(y, w, sigma);
        // g is even in y
        Detection {
            single: integrate(g, 0.0, b) / b,
            double: integrate(|y| g(y).powi(2), 0.0, b) / b,
        }
    }

    /// `E[N]` and `E[N(N - 1)]` of the number of sightings of one animal
    pub fn moments(&self, kappa: f64, sigma: f64) -> (f64, f64) {
        let surfacing = self.surfacing(kappa);
        let detection = self.detection(sigma);
        (
            2.0 * surfacing.surfaced * detection.single,
            2.0 * surfacing.surfaced * surfacing.stay_surfaced * detection.double,
        )
    }

    /// Number of sightings of one simulated animal
    pub fn sample_sightings(
        &self,
        rng: &mut dyn RngCore,
        kappa: f64,
        sigma: f64,
    ) -> Result<usize, IntensityError> {
        let surfacing = self.surfacing(kappa);
        let normal = centred_normal(sigma)?;
        let (w, b) = (self.detection_halfwidth(), self.survey_halfwidth());
        let y = rng.random_range(-b..=b);
        let first = rng.random::<f64>() < surfacing.surfaced;
        let second_probability = if first {
            surfacing.stay_surfaced
        } else {
            surfacing.resurfaced
        };
        let second = rng.random::<f64>() < second_probability;
        let count = [first, second]
            .into_iter()
            .filter(|&surfaced| surfaced && (y + normal.sample(rng)).abs() <= w)
            .count();
        Ok(count)
    }
}

/// Surfacing probabilities of the dive Markov chain
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surfacing {
    /// Stationary probability to be surfaced
    pub surfaced: f64,
    /// Probability to be surfaced after the lag given surfaced now
    pub stay_surfaced: f64,
    /// Probability to be surfaced after the lag given diving now
    pub resurfaced: f64,
}

/// Strip-averaged detection probabilities
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub single: f64,
    pub double: f64,
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * libm::erfc(-x / SQRT_2)
}

/// Probability that a surfaced animal at across-transect position `y` is seen within `w`
pub fn detection_probability(y: f64, w: f64, sigma: f64) -> f64 {
    normal_cdf((w - y) / sigma) - normal_cdf((-w - y) / sigma)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn info() -> TwoPlaneInfo {
        TwoPlaneInfo::new(0.5, 1.0, 10.0, 20.0, None).unwrap()
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(TwoPlaneInfo::new(1.0, 0.5, 10.0, 20.0, None).is_err());
        assert!(TwoPlaneInfo::new(0.5, 1.0, 0.0, 20.0, None).is_err());
        assert!(TwoPlaneInfo::new(0.5, 1.0, 10.0, 20.0, Some(10.0)).is_err());
        assert!(TwoPlaneInfo::new(f64::NAN, 1.0, 10.0, 20.0, None).is_err());
    }

    #[test]
    fn kappa_shorter_than_surface_time() {
        let params = Params::new().with(Param::Kappa, 15.0);
        assert!(matches!(
            info().kappa(&params),
            Err(IntensityError::InvalidParameter {
                name: Param::Kappa,
                ..
            })
        ));
    }

    #[test]
    fn markov_chain_limits() {
        let info = info();
        let s = info.surfacing(80.0);
        assert_relative_eq!(s.surfaced, 0.25);
        assert!(s.stay_surfaced > s.surfaced && s.stay_surfaced < 1.0);
        // stationarity: P(surfaced later) = P(surfaced now)
        assert_relative_eq!(
            s.surfaced * s.stay_surfaced + (1.0 - s.surfaced) * s.resurfaced,
            s.surfaced,
            max_relative = 1e-12
        );
        let always = info.surfacing(20.0);
        assert_relative_eq!(always.surfaced, 1.0);
        assert_relative_eq!(always.stay_surfaced, 1.0);
    }

    #[test]
    fn perfect_detection_in_narrow_movement_limit() {
        // with tiny sigma the detection probability is the fraction of the strip seen
        let info = TwoPlaneInfo::new(0.5, 1.0, 10.0, 20.0, Some(20.0)).unwrap();
        let d = info.detection(1e-6);
        assert_relative_eq!(d.single, 0.5, max_relative = 1e-4);
        assert_relative_eq!(d.double, 0.5, max_relative = 1e-4);
        let (mean, factorial2) = info.moments(20.0, 1e-6);
        assert_relative_eq!(mean, 1.0, max_relative = 1e-4);
        assert_relative_eq!(factorial2, 1.0, max_relative = 1e-4);
    }

    #[test]
    fn sampled_sightings_match_moments() {
        let info = info();
        let (kappa, sigma) = (60.0, 0.2);
        let (mean, factorial2) = info.moments(kappa, sigma);
        let mut rng = StdRng::seed_from_u64(0);
        let n = 200_000;
        let counts: Vec<_> = (0..n)
            .map(|_| info.sample_sightings(&mut rng, kappa, sigma).unwrap() as f64)
            .collect();
        let sample_mean = counts.iter().sum::<f64>() / n as f64;
        let sample_factorial2 = counts.iter().map(|c| c * (c - 1.0)).sum::<f64>() / n as f64;
        assert_relative_eq!(sample_mean, mean, max_relative = 0.02);
        assert_relative_eq!(sample_factorial2, factorial2, max_relative = 0.05);
    }
}
