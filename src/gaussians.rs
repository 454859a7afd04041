//! Standard normal density and cumulative distribution on plain floats.
//!
//! These back [`Number::normal_pdf`](crate::Number::normal_pdf) and
//! [`Number::normal_cdf`](crate::Number::normal_cdf).

use crate::float::Float;

/// φ(x): standard normal density.
pub fn normal_pdf<F: Float>(x: F) -> F {
    let half = F::from(0.5).unwrap();
    (-half * x * x).exp() / F::TAU().sqrt()
}

/// Φ(x): standard normal cumulative distribution.
///
/// Abramowitz & Stegun 26.2.17 polynomial, |error| < 7.5e-8.
pub fn normal_cdf<F: Float>(x: F) -> F {
    if x < F::zero() {
        return F::one() - normal_cdf(-x);
    }
    let c = |v: f64| F::from(v).unwrap();
    let t = F::one() / (F::one() + c(0.231_641_9) * x);
    let poly = t
        * (c(0.319_381_530)
            + t * (c(-0.356_563_782)
                + t * (c(1.781_477_937) + t * (c(-1.821_255_978) + t * c(1.330_274_429)))));
    F::one() - normal_pdf(x) * poly
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pdf_at_zero() {
        // 1 / sqrt(2π)
        assert_relative_eq!(normal_pdf(0.0_f64), 0.398_942_280_401_432_7, max_relative = 1e-14);
    }

    #[test]
    fn cdf_reference_points() {
        assert_relative_eq!(normal_cdf(0.0_f64), 0.5, epsilon = 1e-7);
        assert_relative_eq!(normal_cdf(1.96_f64), 0.975_002_1, epsilon = 1e-6);
        assert_relative_eq!(normal_cdf(-0.5_f64), 0.308_537_5, epsilon = 1e-6);
    }

    #[test]
    fn cdf_symmetry() {
        for &x in &[0.1_f64, 0.7, 1.3, 2.9] {
            assert_relative_eq!(normal_cdf(x) + normal_cdf(-x), 1.0, epsilon = 1e-7);
        }
    }
}
