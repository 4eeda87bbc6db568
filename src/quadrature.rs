//! Adaptive Simpson quadrature used for the radial integrals of Palm intensities

const INITIAL_PANELS: usize = 16;
const MAX_DEPTH: u32 = 30;
const RELATIVE_TOLERANCE: f64 = 1e-10;

#[inline]
fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn adaptive<F>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    eps: f64,
    depth: u32,
) -> f64
where
    F: Fn(f64) -> f64,
{
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;
    // absolute budget of the sub-interval or a relative one, whichever is looser
    let tolerance = eps.max(RELATIVE_TOLERANCE * (left + right).abs());
    if depth == 0 || delta.abs() <= 15.0 * tolerance {
        left + right + delta / 15.0
    } else {
        adaptive(f, a, m, fa, flm, fm, left, 0.5 * eps, depth - 1)
            + adaptive(f, m, b, fm, frm, fb, right, 0.5 * eps, depth - 1)
    }
}

/// Integrate `f` over `[a, b]`
///
/// The interval is split into a fixed number of panels first, so narrow peaks are not missed by
/// the first Simpson estimate. Returns zero for empty or reversed intervals.
pub fn integrate<F>(f: F, a: f64, b: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    if !(b > a) {
        return 0.0;
    }
    let h = (b - a) / INITIAL_PANELS as f64;
    let panels: Vec<_> = (0..INITIAL_PANELS)
        .map(|i| {
            let lo = a + h * i as f64;
            let hi = if i + 1 == INITIAL_PANELS { b } else { lo + h };
            let (flo, fmid, fhi) = (f(lo), f(0.5 * (lo + hi)), f(hi));
            (lo, hi, flo, fmid, fhi, simpson(lo, hi, flo, fmid, fhi))
        })
        .collect();
    let coarse: f64 = panels.iter().map(|p| p.5.abs()).sum();
    let eps = RELATIVE_TOLERANCE * coarse.max(f64::MIN_POSITIVE) / INITIAL_PANELS as f64;
    panels
        .into_iter()
        .map(|(lo, hi, flo, fmid, fhi, whole)| {
            adaptive(&f, lo, hi, flo, fmid, fhi, whole, eps, MAX_DEPTH)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn polynomial() {
        assert_relative_eq!(integrate(|x| x * x, 0.0, 3.0), 9.0, max_relative = 1e-12);
    }

    #[test]
    fn narrow_gaussian() {
        let sigma = 1e-3;
        let value = integrate(
            |x: f64| (-0.5 * (x - 0.3) * (x - 0.3) / (sigma * sigma)).exp(),
            0.0,
            1.0,
        );
        assert_relative_eq!(value, sigma * (2.0 * PI).sqrt(), max_relative = 1e-8);
    }

    #[test]
    fn empty_interval() {
        assert_eq!(integrate(|x| x, 1.0, 1.0), 0.0);
        assert_eq!(integrate(|x| x, 2.0, 1.0), 0.0);
    }
}
