use std::collections::HashMap;

use crate::model::ids::VectorId;
use crate::model::vector::ExpressionVector;
use crate::simd;

pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Relative tolerance below which a vector counts as constant.
const VARIANCE_EPS: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub value: f64,
    pub n_samples: usize,
}

impl Correlation {
    pub fn undefined(n_samples: usize) -> Self {
        Self {
            value: f64::NAN,
            n_samples,
        }
    }

    pub fn is_defined(&self) -> bool {
        !self.value.is_nan()
    }
}

#[derive(Debug, Clone, Copy)]
struct RowStats {
    mean: f64,
    ss_sqrt: f64,
}

/// Per-run correlation state: the minimum sample size and the cached
/// mean / root sum of squares of every complete vector seen so far.
#[derive(Debug)]
pub struct CorrelationContext {
    min_samples: usize,
    stats: HashMap<VectorId, RowStats>,
    fast_path: usize,
    slow_path: usize,
}

impl CorrelationContext {
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples,
            stats: HashMap::new(),
            fast_path: 0,
            slow_path: 0,
        }
    }

    pub fn cached_vectors(&self) -> usize {
        self.stats.len()
    }

    /// `(fast, slow)` evaluation counts.
    pub fn path_counts(&self) -> (usize, usize) {
        (self.fast_path, self.slow_path)
    }

    pub fn correlate(&mut self, a: &ExpressionVector, b: &ExpressionVector) -> Correlation {
        if a.len() != b.len() || a.id == b.id {
            return Correlation::undefined(0);
        }
        if a.has_missing() || b.has_missing() {
            self.slow_path += 1;
            return pearson(a.values(), b.values(), self.min_samples);
        }

        let n = a.len();
        if n < self.min_samples {
            return Correlation::undefined(n);
        }
        self.fast_path += 1;
        let sa = self.row_stats(a);
        let sb = self.row_stats(b);
        if is_constant(sa.mean, sa.ss_sqrt, n) || is_constant(sb.mean, sb.ss_sqrt, n) {
            return Correlation::undefined(n);
        }
        let sxy = simd::centered_cross(a.values(), b.values(), sa.mean, sb.mean);
        Correlation {
            value: (sxy / (sa.ss_sqrt * sb.ss_sqrt)).clamp(-1.0, 1.0),
            n_samples: n,
        }
    }

    fn row_stats(&mut self, v: &ExpressionVector) -> RowStats {
        *self.stats.entry(v.id).or_insert_with(|| {
            let mean = simd::mean_f64(v.values());
            let ss = simd::centered_sum_squares(v.values(), mean);
            RowStats {
                mean,
                ss_sqrt: ss.sqrt(),
            }
        })
    }
}

/// Pearson correlation over the positions where both inputs are present.
pub fn pearson(x: &[f64], y: &[f64], min_samples: usize) -> Correlation {
    if x.len() != y.len() {
        return Correlation::undefined(0);
    }
    let mut px = Vec::with_capacity(x.len());
    let mut py = Vec::with_capacity(y.len());
    for (&a, &b) in x.iter().zip(y) {
        if a.is_nan() || b.is_nan() {
            continue;
        }
        px.push(a);
        py.push(b);
    }
    let n = px.len();
    if n < min_samples || n < 2 {
        return Correlation::undefined(n);
    }

    let mx = simd::mean_f64(&px);
    let my = simd::mean_f64(&py);
    let sx = simd::centered_sum_squares(&px, mx).sqrt();
    let sy = simd::centered_sum_squares(&py, my).sqrt();
    if is_constant(mx, sx, n) || is_constant(my, sy, n) {
        return Correlation::undefined(n);
    }
    let sxy = simd::centered_cross(&px, &py, mx, my);
    Correlation {
        value: (sxy / (sx * sy)).clamp(-1.0, 1.0),
        n_samples: n,
    }
}

/// The tolerance scales with the vector's own magnitude only, so rescaling
/// an input never changes the outcome. All-zero vectors have `ss_sqrt == 0`.
fn is_constant(mean: f64, ss_sqrt: f64, n: usize) -> bool {
    let scale = mean.abs() * (n as f64).sqrt();
    !ss_sqrt.is_finite() || ss_sqrt <= VARIANCE_EPS * scale
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_correlation.rs"]
mod tests;
