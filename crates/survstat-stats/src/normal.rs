//! Standard normal tail probabilities.
//!
//! The complementary error function uses a Chebyshev-fitted rational
//! approximation with fractional error below `1.2e-7` over the whole real
//! line. The bound is relative, so very small tail probabilities keep enough
//! precision to take their logarithm.

/// Complementary error function `erfc(x) = 1 - erf(x)`.
///
/// ```
/// # use survstat_stats::normal::erfc;
/// assert!((erfc(0.0) - 1.0).abs() < 1e-6);
/// assert!((erfc(-30.0) - 2.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * (-z * z + poly).exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

/// Two-sided p-value for a standard normal test statistic: `P(|Z| >= |z|)`.
///
/// ```
/// # use survstat_stats::normal::two_sided_p_value;
/// let p = two_sided_p_value(1.959_964);
/// assert!((p - 0.05).abs() < 1e-6);
/// ```
#[must_use]
pub fn two_sided_p_value(z: f64) -> f64 {
    erfc(z.abs() / std::f64::consts::SQRT_2).min(1.0)
}
