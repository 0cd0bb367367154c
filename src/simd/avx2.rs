#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

pub fn sum_f64(values: &[f64]) -> f64 {
    // Deterministic order: load 4 lanes, accumulate each lane in order.
    let mut sum = 0f64;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        while i + 4 <= n {
            let v = _mm256_loadu_pd(values.as_ptr().add(i));
            let mut lanes = [0f64; 4];
            _mm256_storeu_pd(lanes.as_mut_ptr(), v);
            for lane in &lanes {
                sum += *lane;
            }
            i += 4;
        }
    }
    while i < n {
        sum += values[i];
        i += 1;
    }
    sum
}

pub fn centered_sum_squares(values: &[f64], mean: f64) -> f64 {
    let mut ss = 0f64;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        let m = _mm256_set1_pd(mean);
        while i + 4 <= n {
            let v = _mm256_loadu_pd(values.as_ptr().add(i));
            let d = _mm256_sub_pd(v, m);
            let sq = _mm256_mul_pd(d, d);
            let mut lanes = [0f64; 4];
            _mm256_storeu_pd(lanes.as_mut_ptr(), sq);
            for lane in &lanes {
                ss += *lane;
            }
            i += 4;
        }
    }
    while i < n {
        let d = values[i] - mean;
        ss += d * d;
        i += 1;
    }
    ss
}

pub fn centered_cross(x: &[f64], y: &[f64], mx: f64, my: f64) -> f64 {
    let mut sxy = 0f64;
    let mut i = 0usize;
    let n = x.len().min(y.len());
    unsafe {
        let vmx = _mm256_set1_pd(mx);
        let vmy = _mm256_set1_pd(my);
        while i + 4 <= n {
            let a = _mm256_sub_pd(_mm256_loadu_pd(x.as_ptr().add(i)), vmx);
            let b = _mm256_sub_pd(_mm256_loadu_pd(y.as_ptr().add(i)), vmy);
            let prod = _mm256_mul_pd(a, b);
            let mut lanes = [0f64; 4];
            _mm256_storeu_pd(lanes.as_mut_ptr(), prod);
            for lane in &lanes {
                sxy += *lane;
            }
            i += 4;
        }
    }
    while i < n {
        sxy += (x[i] - mx) * (y[i] - my);
        i += 1;
    }
    sxy
}

pub fn backend_name() -> &'static str {
    "avx2"
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/avx2.rs"]
mod tests;
