use crate::error::{IntensityError, PalmError};

use itertools::Itertools;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of a model parameter
///
/// The set of parameters a model uses is decided by its [ProcessFamily](crate::ProcessFamily)
/// composition, see [ProcessFamilyTrait::param_names](crate::ProcessFamilyTrait::param_names).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Param {
    /// Parent density
    #[serde(rename = "D")]
    D,
    /// Expected number of children per parent (Poisson)
    #[serde(rename = "lambda")]
    Lambda,
    /// Success probability of the binomial child count
    #[serde(rename = "p")]
    P,
    /// Mean dive-cycle duration of the two-plane survey
    #[serde(rename = "kappa")]
    Kappa,
    /// Standard deviation of the Gaussian dispersion
    #[serde(rename = "sigma")]
    Sigma,
    /// Radius of the uniform dispersion or of the void deletion
    #[serde(rename = "tau")]
    Tau,
    /// Density of the void-process baseline points
    #[serde(rename = "Dc")]
    Dc,
    /// Density of the void-process deletion centres
    #[serde(rename = "Dp")]
    Dp,
}

impl Param {
    pub const ALL: [Param; 8] = [
        Param::D,
        Param::Lambda,
        Param::P,
        Param::Kappa,
        Param::Sigma,
        Param::Tau,
        Param::Dc,
        Param::Dp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Param::D => "D",
            Param::Lambda => "lambda",
            Param::P => "p",
            Param::Kappa => "kappa",
            Param::Sigma => "sigma",
            Param::Tau => "tau",
            Param::Dc => "Dc",
            Param::Dp => "Dp",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Param {
    type Err = PalmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| PalmError::configuration(format!("unknown parameter name {s:?}")))
    }
}

/// Parameter vector: values keyed by [Param]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Params(BTreeMap<Param, f64>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `(name, value)` pairs, unknown names are rejected
    pub fn from_named<'a>(
        pairs: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, PalmError> {
        pairs
            .into_iter()
            .map(|(name, value)| Ok((name.parse::<Param>()?, value)))
            .collect::<Result<Self, PalmError>>()
    }

    pub fn with(mut self, param: Param, value: f64) -> Self {
        self.0.insert(param, value);
        self
    }

    pub fn insert(&mut self, param: Param, value: f64) -> Option<f64> {
        self.0.insert(param, value)
    }

    pub fn get(&self, param: Param) -> Option<f64> {
        self.0.get(&param).copied()
    }

    pub fn require(&self, param: Param) -> Result<f64, IntensityError> {
        self.get(param).ok_or(IntensityError::MissingParameter(param))
    }

    /// Required value which must be finite and strictly positive
    pub fn positive(&self, param: Param) -> Result<f64, IntensityError> {
        let value = self.require(param)?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(IntensityError::InvalidParameter {
                name: param,
                value,
                reason: "must be positive and finite",
            })
        }
    }

    /// Required value which must be finite and non-negative
    pub fn non_negative(&self, param: Param) -> Result<f64, IntensityError> {
        let value = self.require(param)?;
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(IntensityError::InvalidParameter {
                name: param,
                value,
                reason: "must be non-negative and finite",
            })
        }
    }

    pub fn contains(&self, param: Param) -> bool {
        self.0.contains_key(&param)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = Param> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Param, f64)> + '_ {
        self.0.iter().map(|(&p, &v)| (p, v))
    }

    /// Overwrite own values with the values of `other`
    pub fn extend(&mut self, other: &Params) {
        self.0.extend(other.iter());
    }

    /// Check that every name is one of `allowed`
    pub fn check_names(&self, allowed: &[Param], what: &str) -> Result<(), PalmError> {
        match self.names().find(|p| !allowed.contains(p)) {
            Some(p) => Err(PalmError::configuration(format!(
                "{what} contains parameter {p} not used by the model, expected a subset of [{}]",
                allowed.iter().join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// Check that the names are exactly `required`
    pub fn check_exact(&self, required: &[Param], what: &str) -> Result<(), PalmError> {
        self.check_names(required, what)?;
        match required.iter().find(|p| !self.contains(**p)) {
            Some(p) => Err(PalmError::configuration(format!(
                "{what} lacks required parameter {p}"
            ))),
            None => Ok(()),
        }
    }

    /// Values of `names` in the given order
    pub fn values_of(&self, names: &[Param]) -> Result<Vec<f64>, IntensityError> {
        names.iter().map(|&p| self.require(p)).collect()
    }
}

impl FromIterator<(Param, f64)> for Params {
    fn from_iter<I: IntoIterator<Item = (Param, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.iter().map(|(p, v)| format!("{p} = {v}")).join(", ")
        )
    }
}

/// Lower and upper bounds keyed by [Param]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Bounds(BTreeMap<Param, (f64, f64)>);

impl Bounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, param: Param, lower: f64, upper: f64) -> Self {
        self.0.insert(param, (lower, upper));
        self
    }

    pub fn insert(&mut self, param: Param, lower: f64, upper: f64) -> Option<(f64, f64)> {
        self.0.insert(param, (lower, upper))
    }

    pub fn get(&self, param: Param) -> Option<(f64, f64)> {
        self.0.get(&param).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Param, (f64, f64))> + '_ {
        self.0.iter().map(|(&p, &b)| (p, b))
    }

    /// Overwrite own bounds with the bounds of `other`
    pub fn extend(&mut self, other: &Bounds) {
        self.0.extend(other.iter());
    }

    pub fn check_names(&self, allowed: &[Param], what: &str) -> Result<(), PalmError> {
        match self.0.keys().find(|p| !allowed.contains(p)) {
            Some(p) => Err(PalmError::configuration(format!(
                "{what} contains parameter {p} which is not used by the model"
            ))),
            None => Ok(()),
        }
    }
}

impl FromIterator<(Param, (f64, f64))> for Bounds {
    fn from_iter<I: IntoIterator<Item = (Param, (f64, f64))>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_names_round_trip() {
        for p in Param::ALL {
            assert_eq!(p.name().parse::<Param>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_name_is_configuration_error() {
        let err = Params::from_named([("D", 1.0), ("mu", 2.0)]).unwrap_err();
        assert!(matches!(err, PalmError::Configuration(_)));
    }

    #[test]
    fn check_exact() {
        let params = Params::new().with(Param::D, 1.0).with(Param::Sigma, 0.1);
        assert!(params.check_exact(&[Param::D, Param::Sigma], "params").is_ok());
        assert!(
            params
                .check_exact(&[Param::D, Param::Sigma, Param::Lambda], "params")
                .is_err()
        );
        assert!(params.check_exact(&[Param::D], "params").is_err());
    }

    #[test]
    fn positive_rejects_zero() {
        let params = Params::new().with(Param::Sigma, 0.0);
        assert!(matches!(
            params.positive(Param::Sigma),
            Err(IntensityError::InvalidParameter { .. })
        ));
        assert_eq!(
            params.positive(Param::Tau),
            Err(IntensityError::MissingParameter(Param::Tau))
        );
    }

    #[test]
    fn display() {
        let params = Params::new().with(Param::Lambda, 5.0).with(Param::D, 10.0);
        assert_eq!(params.to_string(), "D = 10, lambda = 5");
    }
}
