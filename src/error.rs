use crate::params::{Param, Params};

/// Error returned from the geometry routines and [crate::Domain] / [crate::PointSet]
/// constructors
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("domain must have at least one dimension")]
    ZeroDimensional,

    #[error("invalid limits in dimension {dim}: {lower} must be finite and less than {upper}")]
    InvalidDomain { dim: usize, lower: f64, upper: f64 },

    #[error("points have {actual} coordinates, but the domain has {expected} dimensions")]
    DimensionMismatch { actual: usize, expected: usize },

    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    #[error("point {index} lies outside of the domain")]
    PointOutsideDomain { index: usize },

    #[error("truncation radius {radius} must be positive and not exceed {max}")]
    InvalidRadius { radius: f64, max: f64 },
}

/// Error returned when a Palm intensity or one of its building blocks is evaluated
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum IntensityError {
    #[error("parameter {0} is required but missing")]
    MissingParameter(Param),

    #[error("parameter {name} = {value} is invalid: {reason}")]
    InvalidParameter {
        name: Param,
        value: f64,
        reason: &'static str,
    },

    #[error("formula evaluated outside of its domain: {0}")]
    Domain(String),
}

/// Top-level error of fitting, simulation and bootstrap operations
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum PalmError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Intensity(#[from] IntensityError),

    #[error("no point pairs survive truncation at distance {r}, Palm likelihood is undefined")]
    EmptyPairSet { r: f64 },

    #[error("optimization failed at [{params}]: {reason}")]
    Optimization { params: Params, reason: String },
}

impl PalmError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
