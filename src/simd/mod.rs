//! f64 reduction kernels used by the correlation engine.
//!
//! Vector backends only load and combine lanes; every backend adds the
//! per-element terms into a single accumulator in index order, so results are
//! bit-identical to the scalar path.

#[inline]
pub fn sum_f64(values: &[f64]) -> f64 {
    backend::sum_f64(values)
}

#[inline]
pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    sum_f64(values) / values.len() as f64
}

/// Sum of squared deviations from `mean`.
#[inline]
pub fn centered_sum_squares(values: &[f64], mean: f64) -> f64 {
    backend::centered_sum_squares(values, mean)
}

/// Sum of `(x - mx) * (y - my)` over the common prefix of `x` and `y`.
#[inline]
pub fn centered_cross(x: &[f64], y: &[f64], mx: f64, my: f64) -> f64 {
    let n = x.len().min(y.len());
    backend::centered_cross(&x[..n], &y[..n], mx, my)
}

#[inline]
pub fn backend_name() -> &'static str {
    backend::backend_name()
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
mod backend {
    pub use crate::simd::avx2::*;
}

#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
mod backend {
    pub use crate::simd::neon::*;
}

#[cfg(not(any(
    all(target_arch = "x86_64", target_feature = "avx2"),
    all(target_arch = "aarch64", target_feature = "neon"),
)))]
mod backend {
    pub use crate::simd::scalar::*;
}

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub mod avx2;
#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
pub mod neon;
pub mod scalar;

#[cfg(test)]
#[path = "../../tests/src_inline/simd/mod.rs"]
mod tests;
