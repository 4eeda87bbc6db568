//! Process families and their building blocks
//!
//! A [ProcessFamily] is a closed-form Palm intensity composed from a child-count distribution,
//! a dispersion kernel and optional sibling information (Neyman-Scott processes), or a void
//! process. Families are pure functions of distance and parameters, so the same values are used
//! by fitting and by simulation.

pub mod child_dist;
pub use child_dist::{ChildDist, ChildDistTrait, ChildMoments};

pub mod dispersion;
pub use dispersion::{Dispersion, DispersionTrait, mvn_isotropic_density};

mod intensity;
pub use intensity::{ClusterIntensity, PalmIntensity, VoidIntensity};

pub mod sibling;
pub use sibling::{SiblingGroundTruth, SiblingInfo, SiblingLabel};

pub mod twoplane;
pub use twoplane::TwoPlaneInfo;

use crate::error::{IntensityError, PalmError};
use crate::geometry::ball_volume;
use crate::params::{Param, Params};

use enum_dispatch::enum_dispatch;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Summary of an observed pattern used to guess starting values
///
/// Clustering is measured at the close range `close_r`, a fixed fraction of the truncation
/// distance, where the sibling excess is not diluted by distant pairs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatternSummary {
    /// Number of points per unit volume
    pub density: f64,
    /// Average number of other points within `close_r` of a focal point
    pub close_neighbours: f64,
    pub close_r: f64,
    /// Truncation distance
    pub r: f64,
    pub dim: usize,
}

impl PatternSummary {
    /// Fraction of the truncation distance used as the close range and as the starting scale
    pub const CLOSE_FRACTION: f64 = 0.1;

    /// Close neighbours in excess of a homogeneous Poisson process with the same density
    pub fn close_excess(&self) -> f64 {
        self.close_neighbours - self.density * ball_volume(self.dim, self.close_r)
    }
}

#[enum_dispatch]
pub trait ProcessFamilyTrait: Clone + Debug {
    /// Names of all the parameters of the composed model
    fn param_names(&self) -> Vec<Param>;

    /// Palm intensity for the given parameters in a `dim`-dimensional domain
    fn intensity(&self, params: &Params, dim: usize) -> Result<PalmIntensity, IntensityError>;

    /// Palm intensity at distance `r`
    fn palm_intensity(&self, r: f64, params: &Params, dim: usize) -> Result<f64, IntensityError> {
        self.intensity(params, dim)?.eval(r)
    }

    /// Check that the family can describe a `dim`-dimensional pattern
    fn check_dim(&self, dim: usize) -> Result<(), PalmError>;

    /// Heuristic starting values of every parameter
    fn start_values(&self, summary: &PatternSummary) -> Params;

    /// Parameter the density of observed points is proportional to
    fn density_param(&self) -> Param;

    /// Expected number of observed points per unit volume
    fn observed_density(&self, params: &Params, dim: usize) -> Result<f64, IntensityError>;

    /// Quantities which are functions of the parameters
    fn derived(&self, params: &Params, dim: usize) -> Result<Params, IntensityError>;

    fn sibling_info(&self) -> Option<&SiblingInfo>;
}

/// Point-process model: Neyman-Scott cluster process or void process
#[enum_dispatch(ProcessFamilyTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub enum ProcessFamily {
    NeymanScott(NeymanScott),
    Void(VoidProcess),
}

impl ProcessFamily {
    pub fn neyman_scott(child: ChildDist, dispersion: Dispersion) -> Result<Self, PalmError> {
        Ok(NeymanScott::new(child, dispersion, None)?.into())
    }

    pub fn void() -> Self {
        VoidProcess {}.into()
    }

    /// Compose a family from mode strings
    ///
    /// `family` is `"ns"` or `"void"`; `child` and `dispersion` are the
    /// [ChildDist::from_mode] and [Dispersion] mode strings and are required for `"ns"` only,
    /// as are `two_plane` and `siblings`.
    pub fn from_modes(
        family: &str,
        child: Option<&str>,
        dispersion: Option<&str>,
        two_plane: Option<TwoPlaneInfo>,
        siblings: Option<SiblingInfo>,
    ) -> Result<Self, PalmError> {
        match family {
            "ns" => {
                let child = ChildDist::from_mode(child.unwrap_or("pois"), two_plane)?;
                let dispersion = dispersion.unwrap_or("gaussian").parse()?;
                Ok(NeymanScott::new(child, dispersion, siblings)?.into())
            }
            "void" => {
                if child.is_some() || dispersion.is_some() || two_plane.is_some() {
                    return Err(PalmError::configuration(
                        "void process has no child distribution or dispersion",
                    ));
                }
                if siblings.is_some() {
                    return Err(PalmError::configuration(
                        "sibling information is only supported by Neyman-Scott processes",
                    ));
                }
                Ok(Self::void())
            }
            _ => Err(PalmError::configuration(format!(
                "unrecognised process family {family:?}, expected \"ns\" or \"void\""
            ))),
        }
    }

    /// The same family with other sibling information, used for resampled patterns
    pub fn with_siblings(&self, siblings: Option<SiblingInfo>) -> Result<Self, PalmError> {
        match (self, siblings) {
            (Self::NeymanScott(ns), siblings) => Ok(NeymanScott::new(
                ns.child.clone(),
                ns.dispersion.clone(),
                siblings,
            )?
            .into()),
            (Self::Void(_), None) => Ok(self.clone()),
            (Self::Void(_), Some(_)) => Err(PalmError::configuration(
                "sibling information is only supported by Neyman-Scott processes",
            )),
        }
    }
}

/// Neyman-Scott process: Poisson parents, each with a random number of dispersed children
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct NeymanScott {
    child: ChildDist,
    dispersion: Dispersion,
    siblings: Option<SiblingInfo>,
}

impl NeymanScott {
    pub fn new(
        child: ChildDist,
        dispersion: Dispersion,
        siblings: Option<SiblingInfo>,
    ) -> Result<Self, PalmError> {
        if let ChildDist::TwoPlane(children) = &child {
            children.info.validate()?;
            if !dispersion.is_gaussian() {
                return Err(PalmError::configuration(
                    "two-plane child distribution requires Gaussian dispersion",
                ));
            }
        }
        Ok(Self {
            child,
            dispersion,
            siblings,
        })
    }

    pub fn child(&self) -> &ChildDist {
        &self.child
    }

    pub fn dispersion(&self) -> &Dispersion {
        &self.dispersion
    }

    /// Expected number of children and parent intensity
    fn child_density(&self, params: &Params) -> Result<(ChildMoments, f64), IntensityError> {
        let moments = self.child.moments(params)?;
        let parents = self.child.parent_intensity(params)?;
        Ok((moments, parents * moments.mean))
    }
}

impl ProcessFamilyTrait for NeymanScott {
    fn param_names(&self) -> Vec<Param> {
        let mut names = vec![Param::D];
        names.extend(self.child.param_names());
        names.push(self.dispersion.param());
        names
    }

    fn intensity(&self, params: &Params, dim: usize) -> Result<PalmIntensity, IntensityError> {
        let scale = self.dispersion.scale(params)?;
        let (moments, child_density) = self.child_density(params)?;
        Ok(PalmIntensity::Cluster(ClusterIntensity {
            child_density,
            siblings_per_child: moments.siblings_per_child()?,
            dispersion: self.dispersion.clone(),
            scale,
            dim,
        }))
    }

    fn check_dim(&self, dim: usize) -> Result<(), PalmError> {
        if matches!(self.child, ChildDist::TwoPlane(_)) && dim != 1 {
            return Err(PalmError::configuration(format!(
                "two-plane surveys are one-dimensional, got a {dim}-dimensional domain"
            )));
        }
        Ok(())
    }

    fn start_values(&self, summary: &PatternSummary) -> Params {
        let scale = summary.close_r;
        // siblings within the close range are a sibling_cdf share of all the siblings
        let share = self.dispersion.sibling_cdf(summary.close_r, scale, summary.dim);
        let siblings = if share > 0.0 {
            summary.close_excess() / share
        } else {
            summary.close_excess()
        };
        let siblings = siblings.max(0.5);
        let mut params = Params::new()
            .with(self.dispersion.param(), scale)
            .with(Param::D, 1.0);
        match &self.child {
            ChildDist::Poisson(_) => {
                params.insert(Param::Lambda, siblings);
            }
            ChildDist::Binomial(binomial) => {
                let p = if binomial.trials > 1 {
                    (siblings / (binomial.trials - 1) as f64).clamp(0.05, 0.95)
                } else {
                    0.5
                };
                params.insert(Param::P, p);
            }
            ChildDist::TwoPlane(children) => {
                if children.info.dive_cycle().is_none() {
                    params.insert(Param::Kappa, 2.0 * children.info.surface_time());
                }
            }
        }
        // with D = 1 the child density is the number of points per parent density unit
        if let Ok((_, per_parent)) = self.child_density(&params) {
            if per_parent > 0.0 {
                params.insert(Param::D, summary.density / per_parent);
            }
        }
        params
    }

    fn density_param(&self) -> Param {
        Param::D
    }

    fn observed_density(&self, params: &Params, _dim: usize) -> Result<f64, IntensityError> {
        Ok(self.child_density(params)?.1)
    }

    fn derived(&self, params: &Params, dim: usize) -> Result<Params, IntensityError> {
        Ok(Params::new().with(Param::Dc, self.observed_density(params, dim)?))
    }

    fn sibling_info(&self) -> Option<&SiblingInfo> {
        self.siblings.as_ref()
    }
}

/// Void process: a Poisson baseline thinned around Poisson deletion centres
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct VoidProcess {}

impl VoidProcess {
    pub(crate) fn intensity_of(
        params: &Params,
        dim: usize,
    ) -> Result<VoidIntensity, IntensityError> {
        Ok(VoidIntensity {
            baseline_density: params.positive(Param::Dc)?,
            parent_density: params.positive(Param::Dp)?,
            tau: params.positive(Param::Tau)?,
            dim,
        })
    }
}

impl ProcessFamilyTrait for VoidProcess {
    fn param_names(&self) -> Vec<Param> {
        vec![Param::Dc, Param::Dp, Param::Tau]
    }

    fn intensity(&self, params: &Params, dim: usize) -> Result<PalmIntensity, IntensityError> {
        Ok(PalmIntensity::Void(Self::intensity_of(params, dim)?))
    }

    fn check_dim(&self, _dim: usize) -> Result<(), PalmError> {
        Ok(())
    }

    fn start_values(&self, summary: &PatternSummary) -> Params {
        let tau = summary.close_r;
        // deletion removes a fraction 1 - exp(-1/2) of the baseline
        let dp = 0.5 / ball_volume(summary.dim, tau);
        Params::new()
            .with(Param::Dc, summary.density * f64::exp(0.5))
            .with(Param::Dp, dp)
            .with(Param::Tau, tau)
    }

    fn density_param(&self) -> Param {
        Param::Dc
    }

    fn observed_density(&self, params: &Params, dim: usize) -> Result<f64, IntensityError> {
        Ok(Self::intensity_of(params, dim)?.density())
    }

    fn derived(&self, params: &Params, dim: usize) -> Result<Params, IntensityError> {
        Ok(Params::new().with(Param::D, self.observed_density(params, dim)?))
    }

    fn sibling_info(&self) -> Option<&SiblingInfo> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    fn thomas_params() -> Params {
        Params::new()
            .with(Param::D, 10.0)
            .with(Param::Lambda, 5.0)
            .with(Param::Sigma, 0.025)
    }

    #[test]
    fn param_names() {
        let thomas =
            ProcessFamily::from_modes("ns", Some("pois"), Some("thomas"), None, None).unwrap();
        assert_eq!(
            thomas.param_names(),
            vec![Param::D, Param::Lambda, Param::Sigma]
        );
        let matern =
            ProcessFamily::from_modes("ns", Some("binom5"), Some("matern"), None, None).unwrap();
        assert_eq!(matern.param_names(), vec![Param::D, Param::P, Param::Tau]);
        assert_eq!(
            ProcessFamily::void().param_names(),
            vec![Param::Dc, Param::Dp, Param::Tau]
        );
    }

    #[test]
    fn bad_modes() {
        for (family, child, disp) in [
            ("ns", Some("pois"), Some("cauchy")),
            ("ns", Some("geom"), Some("gaussian")),
            ("lgcp", None, None),
            ("void", Some("pois"), None),
        ] {
            assert!(matches!(
                ProcessFamily::from_modes(family, child, disp, None, None),
                Err(PalmError::Configuration(_))
            ));
        }
    }

    #[test]
    fn two_plane_requires_gaussian_and_one_dimension() {
        let info = TwoPlaneInfo::new(0.5, 1.0, 10.0, 20.0, Some(60.0)).unwrap();
        assert!(matches!(
            ProcessFamily::from_modes(
                "ns",
                Some("twoplane"),
                Some("uniform"),
                Some(info.clone()),
                None,
            ),
            Err(PalmError::Configuration(_))
        ));
        let family =
            ProcessFamily::from_modes("ns", Some("twoplane"), None, Some(info), None).unwrap();
        assert_eq!(family.param_names(), vec![Param::D, Param::Sigma]);
        assert!(family.check_dim(1).is_ok());
        assert!(family.check_dim(2).is_err());
    }

    #[test]
    fn thomas_palm_intensity() {
        let family =
            ProcessFamily::neyman_scott(ChildDist::poisson(), Dispersion::gaussian()).unwrap();
        let params = thomas_params();
        let sd = 0.025 * std::f64::consts::SQRT_2;
        for r in [0.0, 0.01, 0.05] {
            let expected = 50.0 + 5.0 * mvn_isotropic_density(r, sd, 1);
            assert_relative_eq!(
                family.palm_intensity(r, &params, 1).unwrap(),
                expected,
                max_relative = 1e-12
            );
        }
        assert_relative_eq!(
            family.derived(&params, 1).unwrap().require(Param::Dc).unwrap(),
            50.0
        );
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let family =
            ProcessFamily::neyman_scott(ChildDist::poisson(), Dispersion::gaussian()).unwrap();
        let params = thomas_params().with(Param::Sigma, -1.0);
        assert!(matches!(
            family.palm_intensity(0.1, &params, 1),
            Err(IntensityError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn start_values_reproduce_density() {
        let summary = PatternSummary {
            density: 100.0,
            close_neighbours: 13.0,
            close_r: 0.05,
            r: 0.5,
            dim: 1,
        };
        for child in [ChildDist::poisson(), ChildDist::binomial(10).unwrap()] {
            let family = ProcessFamily::neyman_scott(child, Dispersion::uniform()).unwrap();
            let start = family.start_values(&summary);
            start.check_exact(&family.param_names(), "start").unwrap();
            let dc = family.derived(&start, 1).unwrap().require(Param::Dc).unwrap();
            assert_relative_eq!(dc, 100.0, max_relative = 1e-12);
        }
        let void = ProcessFamily::void();
        let start = void.start_values(&summary);
        assert_relative_eq!(start.require(Param::Tau).unwrap(), 0.05);
        let d = void.derived(&start, 1).unwrap().require(Param::D).unwrap();
        assert_relative_eq!(d, 100.0, max_relative = 1e-12);
    }

    #[test]
    fn observed_density_is_proportional_to_density_param() {
        let void_params = Params::new()
            .with(Param::Dc, 100.0)
            .with(Param::Dp, 3.0)
            .with(Param::Tau, 0.05);
        let thomas =
            ProcessFamily::neyman_scott(ChildDist::poisson(), Dispersion::gaussian()).unwrap();
        let cases = [
            (thomas.clone(), thomas_params()),
            (ProcessFamily::void(), void_params),
        ];
        for (family, params) in cases {
            let p = family.density_param();
            let density = family.observed_density(&params, 2).unwrap();
            let mut doubled = params.clone();
            doubled.insert(p, 2.0 * params.require(p).unwrap());
            assert_relative_eq!(
                family.observed_density(&doubled, 2).unwrap(),
                2.0 * density,
                max_relative = 1e-12
            );
        }
        assert_relative_eq!(thomas.observed_density(&thomas_params(), 1).unwrap(), 50.0);
    }

    #[test]
    fn start_values_correct_for_close_range_share() {
        let summary = PatternSummary {
            density: 50.0,
            close_neighbours: 9.0,
            close_r: 0.05,
            r: 0.5,
            dim: 1,
        };
        let thomas =
            ProcessFamily::neyman_scott(ChildDist::poisson(), Dispersion::gaussian()).unwrap();
        let start = thomas.start_values(&summary);
        assert_relative_eq!(start.require(Param::Sigma).unwrap(), 0.05);
        let share = Dispersion::gaussian().sibling_cdf(0.05, 0.05, 1);
        assert_relative_eq!(
            start.require(Param::Lambda).unwrap(),
            4.0 / share,
            max_relative = 1e-12
        );
        // no clustering falls back to a small positive number of siblings
        let poisson_like = PatternSummary {
            close_neighbours: 4.0,
            ..summary
        };
        assert_relative_eq!(
            thomas.start_values(&poisson_like).require(Param::Lambda).unwrap(),
            0.5
        );
    }

    palm_intensity_test!(
        thomas_intensity_shape,
        ProcessFamily::neyman_scott(ChildDist::poisson(), Dispersion::gaussian()).unwrap(),
        thomas_params(),
        2,
    );

    palm_intensity_test!(
        matern_intensity_shape,
        ProcessFamily::neyman_scott(ChildDist::binomial(4).unwrap(), Dispersion::uniform())
            .unwrap(),
        Params::new()
            .with(Param::D, 20.0)
            .with(Param::P, 0.6)
            .with(Param::Tau, 0.05),
        3,
        0.2,
    );

    palm_intensity_test!(
        void_intensity_shape,
        ProcessFamily::void(),
        Params::new()
            .with(Param::Dc, 50.0)
            .with(Param::Dp, 5.0)
            .with(Param::Tau, 0.05),
        2,
    );

    palm_intensity_test!(
        two_plane_intensity_shape,
        ProcessFamily::from_modes(
            "ns",
            Some("twoplane"),
            None,
            Some(TwoPlaneInfo::new(0.5, 1.0, 10.0, 20.0, None).unwrap()),
            None,
        )
        .unwrap(),
        Params::new()
            .with(Param::D, 2.0)
            .with(Param::Kappa, 60.0)
            .with(Param::Sigma, 0.3),
        1,
        3.0,
    );
}
