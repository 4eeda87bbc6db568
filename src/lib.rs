#![doc = include_str!("../README.md")]

#[cfg(test)]
#[macro_use]
mod tests;

mod api;
pub use api::{bootstrap, fit_process, simulate_process};

pub mod config;
pub use config::default_bounds;

mod data;
pub use data::{Domain, PointSet};

pub mod edge;
pub use edge::{Contrasts, EdgeCorrection};

mod error;
pub use error::{GeometryError, IntensityError, PalmError};

pub mod family;
pub use family::{
    ChildDist, ChildDistTrait, Dispersion, DispersionTrait, PalmIntensity, ProcessFamily,
    ProcessFamilyTrait, SiblingGroundTruth, SiblingInfo, SiblingLabel, TwoPlaneInfo,
};

pub mod fit;
pub use fit::{
    BootstrapResult, CobylaFit, FitAlgorithm, FitAlgorithmTrait, FitOptions, FittedModel, PalmFit,
};

pub mod geometry;

mod params;
pub use params::{Bounds, Param, Params};

mod quadrature;

pub mod simulate;
pub use simulate::{Simulation, SimulationEdges};

mod sorted_array;

pub use ndarray;
