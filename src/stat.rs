//! Significance arithmetic: Wilson intervals and a closed-form chi-squared test.
//!
//! Everything here is deliberately closed-form and dependency-free. The normal
//! CDF is the Abramowitz & Stegun 7.1.26 polynomial, and the chi-squared
//! p-value sits on top of it; expect agreement with a real statistics library
//! to ~2–3 significant digits. That is adequate for gating a ship/hold
//! recommendation at `p < 0.05`, and not adequate for reporting precise
//! p-values to stakeholders.

/// Wilson score interval for a Bernoulli proportion.
///
/// Returns `(lower, upper, half_width)`, with bounds clamped into `[0,1]`.
/// Zero trials yield the maximally uncertain `(0.0, 1.0, 0.5)`. A non-finite
/// or non-positive `z` is replaced by `1.96` (95% confidence).
pub fn wilson_bounds(successes: u64, trials: u64, z: f64) -> (f64, f64, f64) {
    if trials == 0 {
        return (0.0, 1.0, 0.5);
    }
    let n = trials as f64;
    let k = successes.min(trials) as f64;
    let p_hat = k / n;
    let z = if z.is_finite() && z > 0.0 { z } else { 1.96 };
    let z2 = z * z;

    // Wilson interval:
    // center = (p + z^2/(2n)) / (1 + z^2/n)
    // radius = z * sqrt(p(1-p)/n + z^2/(4n^2)) / (1 + z^2/n)
    let denom = 1.0 + z2 / n;
    let center = (p_hat + z2 / (2.0 * n)) / denom;
    let rad = (z * ((p_hat * (1.0 - p_hat) / n) + (z2 / (4.0 * n * n))).sqrt()) / denom;
    let lo = (center - rad).clamp(0.0, 1.0);
    let hi = (center + rad).clamp(0.0, 1.0);
    (lo, hi, (hi - lo) / 2.0)
}

/// Pearson chi-squared statistic for a 2×2 conversion contingency table.
///
/// Rows are the two variants; columns are converted / not converted.
/// `conversions` above `total` are clamped. Returns `0.0` whenever any
/// expected cell count is zero (degenerate margins), so the caller's p-value
/// degrades to "no evidence" instead of dividing by zero.
pub fn chi_squared_2x2(conv_a: u64, total_a: u64, conv_b: u64, total_b: u64) -> f64 {
    let a = conv_a.min(total_a) as f64;
    let b = (total_a - conv_a.min(total_a)) as f64;
    let c = conv_b.min(total_b) as f64;
    let d = (total_b - conv_b.min(total_b)) as f64;
    let n = a + b + c + d;
    if n <= 0.0 {
        return 0.0;
    }

    let observed = [[a, b], [c, d]];
    let row = [a + b, c + d];
    let col = [a + c, b + d];

    let mut chi2 = 0.0;
    for (i, obs_row) in observed.iter().enumerate() {
        for (j, &o) in obs_row.iter().enumerate() {
            let e = row[i] * col[j] / n;
            if e == 0.0 {
                return 0.0;
            }
            let diff = o - e;
            chi2 += diff * diff / e;
        }
    }
    chi2
}

/// Standard normal CDF via the Abramowitz & Stegun 7.1.26 erf polynomial.
///
/// Absolute error is on the order of 1e-7; good enough for the approximate
/// p-values this crate reports, nothing more.
pub fn normal_cdf(x: f64) -> f64 {
    if !x.is_finite() {
        return if x > 0.0 { 1.0 } else { 0.0 };
    }
    // erf via A&S 7.1.26.
    let z = x / std::f64::consts::SQRT_2;
    let sign = if z < 0.0 { -1.0 } else { 1.0 };
    let z = z.abs();

    const P: f64 = 0.327_591_1;
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;

    let t = 1.0 / (1.0 + P * z);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    let erf = 1.0 - poly * (-z * z).exp();

    (0.5 * (1.0 + sign * erf)).clamp(0.0, 1.0)
}

/// Approximate upper-tail p-value for a chi-squared statistic.
///
/// - `df == 1`: exact reduction `P[X ≥ x] = 2 * (1 − Φ(√x))`.
/// - `df > 1`: Wilson–Hilferty cube-root normal approximation.
///
/// Non-finite or non-positive statistics (and `df == 0`) return `1.0` — no
/// evidence, never an error.
pub fn chi_squared_p_value(x: f64, df: u32) -> f64 {
    if !x.is_finite() || x <= 0.0 || df == 0 {
        return 1.0;
    }
    let p = if df == 1 {
        2.0 * (1.0 - normal_cdf(x.sqrt()))
    } else {
        let k = df as f64;
        let mu = 1.0 - 2.0 / (9.0 * k);
        let sigma = (2.0 / (9.0 * k)).sqrt();
        let z = ((x / k).cbrt() - mu) / sigma;
        1.0 - normal_cdf(z)
    };
    p.clamp(0.0, 1.0)
}
