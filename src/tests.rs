pub use crate::data::{Domain, PointSet};
pub use crate::family::{ProcessFamily, ProcessFamilyTrait};
pub use crate::params::{Param, Params};

pub use approx::assert_relative_eq;
pub use rand::prelude::*;

/// Check that the Palm intensity of a family is a proper function of distance
///
/// The intensity must be finite and non-negative, its sibling and non-sibling parts must add up,
/// and its ball integral must start at zero and grow with the radius.
#[macro_export]
macro_rules! palm_intensity_test {
    ($name: ident, $family: expr_2021, $params: expr_2021, $dim: expr_2021 $(,)?) => {
        palm_intensity_test!($name, $family, $params, $dim, 0.5);
    };
    (
        $name: ident,
        $family: expr_2021,
        $params: expr_2021,
        $dim: expr_2021,
        $r_max: expr_2021 $(,)?
    ) => {
        #[test]
        fn $name() {
            let family: ProcessFamily = $family;
            let params: Params = $params;
            palm_intensity_tests(&family, &params, $dim, $r_max);
        }
    };
}

pub fn palm_intensity_tests(family: &ProcessFamily, params: &Params, dim: usize, r_max: f64) {
    const N: usize = 64;

    let intensity = family.intensity(params, dim).unwrap();
    assert_eq!(intensity.integral(0.0).unwrap(), 0.0);
    assert!(intensity.eval(-1.0).is_err());

    let mut previous = 0.0;
    for i in 1..=N {
        let r = r_max * (i as f64) / (N as f64);
        let value = intensity.eval(r).unwrap();
        assert!(
            value.is_finite() && value >= 0.0,
            "intensity at {r} is {value}"
        );
        let (sibling, nonsibling) = intensity.split(r).unwrap();
        assert_relative_eq!(sibling + nonsibling, value, max_relative = 1e-12);
        assert_relative_eq!(
            family.palm_intensity(r, params, dim).unwrap(),
            value,
            max_relative = 1e-12
        );

        let integral = intensity.integral(r).unwrap();
        assert!(
            integral.is_finite() && integral >= previous,
            "integral over radius {r} is {integral}, less than {previous}"
        );
        previous = integral;
    }
}

/// Uniformly distributed points in `domain`
pub fn random_points(rng: &mut impl Rng, domain: &Domain, n: usize) -> PointSet {
    let flat = (0..n)
        .flat_map(|_| {
            domain
                .lower()
                .iter()
                .zip(domain.upper())
                .map(|(&lower, &upper)| rng.random_range(lower..upper))
                .collect::<Vec<_>>()
        })
        .collect();
    PointSet::from_flat(domain.dim(), flat).unwrap()
}
