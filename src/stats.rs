//! Special functions, correlation p-values and the fixed-effects
//! meta-analysis used for link effect sizes.

use std::f64::consts::{PI, SQRT_2};

const R_LIMIT: f64 = 1.0 - 1e-12;

/// Complementary error function, Abramowitz & Stegun 7.1.26 (absolute
/// error below 1.5e-7).
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * z);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let tail = poly * (-z * z).exp();
    if x < 0.0 { 2.0 - tail } else { tail }
}

/// Natural log of the gamma function, Lanczos approximation (g = 7).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 8] = [
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut ag = 0.99999999999980993_f64;
        for (i, &c) in COEFFS.iter().enumerate() {
            ag += c / (x + i as f64 + 1.0);
        }
        let t = x + 7.5;
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + ag.ln()
    }
}

/// Regularized incomplete beta `I_x(a, b)` by Lentz's continued fraction.
/// `NaN` outside `0 <= x <= 1`.
pub fn betai(a: f64, b: f64, x: f64) -> f64 {
    if !(0.0..=1.0).contains(&x) {
        return f64::NAN;
    }
    if x == 0.0 || x == 1.0 {
        return x;
    }
    if x > (a + 1.0) / (a + b + 2.0) {
        return 1.0 - betai(b, a, 1.0 - x);
    }

    let ln_prefactor =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let prefactor = ln_prefactor.exp();

    let tiny = 1e-30_f64;
    let eps = 1e-12_f64;

    let mut c = 1.0_f64;
    let mut d = 1.0 - (a + b) * x / (a + 1.0);
    if d.abs() < tiny {
        d = tiny;
    }
    d = d.recip();
    let mut h = d;

    for m in 1..=300 {
        let m = m as f64;

        let num_even = m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m));
        d = 1.0 + num_even * d;
        if d.abs() < tiny {
            d = tiny;
        }
        d = d.recip();
        c = 1.0 + num_even / c;
        if c.abs() < tiny {
            c = tiny;
        }
        h *= d * c;

        let num_odd = -((a + m) * (a + b + m) * x) / ((a + 2.0 * m) * (a + 2.0 * m + 1.0));
        d = 1.0 + num_odd * d;
        if d.abs() < tiny {
            d = tiny;
        }
        d = d.recip();
        c = 1.0 + num_odd / c;
        if c.abs() < tiny {
            c = tiny;
        }
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < eps {
            break;
        }
    }

    prefactor * h / a
}

/// Two-sided p-value of Student's t with `df` degrees of freedom.
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return if t.is_nan() { f64::NAN } else { 0.0 };
    }
    if df <= 0.0 {
        return f64::NAN;
    }
    betai(0.5 * df, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
}

/// Two-sided p-value for a Pearson correlation `r` over `n` paired points.
pub fn correlation_pvalue(r: f64, n: usize) -> f64 {
    if r.is_nan() || n < 3 {
        return f64::NAN;
    }
    let r = r.clamp(-1.0, 1.0);
    if r.abs() >= 1.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    student_t_two_sided(t, df)
}

/// Fisher z-transform, with `r` pulled just inside (-1, 1).
pub fn fisher_z(r: f64) -> f64 {
    r.clamp(-R_LIMIT, R_LIMIT).atanh()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaAnalysis {
    /// Combined effect, back-transformed to the correlation scale.
    pub effect: f64,
    pub p_value: f64,
    pub n_studies: usize,
}

/// Inverse-variance fixed-effects combination of `(correlation, sample size)`
/// pairs in Fisher-z space. Studies with undefined correlations or at most
/// three samples carry no weight; `None` when nothing is left.
pub fn fixed_effects(measurements: &[(f64, usize)]) -> Option<MetaAnalysis> {
    let mut sum_w = 0f64;
    let mut sum_wz = 0f64;
    let mut n_studies = 0usize;
    for &(r, n) in measurements {
        if r.is_nan() || n <= 3 {
            continue;
        }
        let w = (n - 3) as f64;
        sum_w += w;
        sum_wz += w * fisher_z(r);
        n_studies += 1;
    }
    if n_studies == 0 || sum_w <= 0.0 {
        return None;
    }
    let z_effect = sum_wz / sum_w;
    let std_error = 1.0 / sum_w.sqrt();
    let p_value = erfc((z_effect / std_error).abs() / SQRT_2).clamp(0.0, 1.0);
    Some(MetaAnalysis {
        effect: z_effect.tanh(),
        p_value,
        n_studies,
    })
}

/// 1-based ranks with ties sharing their average rank.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0f64; values.len()];
    let mut i = 0usize;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && values[order[j]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = rank;
        }
        i = j;
    }
    ranks
}

#[cfg(test)]
#[path = "../tests/src_inline/stats.rs"]
mod tests;
