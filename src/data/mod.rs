mod domain;
pub use domain::Domain;

mod point_set;
pub use point_set::PointSet;
