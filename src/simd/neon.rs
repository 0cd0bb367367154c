#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

pub fn sum_f64(values: &[f64]) -> f64 {
    let mut sum = 0f64;
    let mut i = 0usize;
    let n = values.len();
    unsafe {
        while i + 2 <= n {
            let v = vld1q_f64(values.as_ptr().add(i));
            let mut lanes = [0f64; 2];
            vst1q_f64(lanes.as_mut_ptr(), v);
            for lane in &lanes {
                sum += *lane;
            }
            i += 2;
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
        let m = vdupq_n_f64(mean);
        while i + 2 <= n {
            let d = vsubq_f64(vld1q_f64(values.as_ptr().add(i)), m);
            let sq = vmulq_f64(d, d);
            let mut lanes = [0f64; 2];
            vst1q_f64(lanes.as_mut_ptr(), sq);
            for lane in &lanes {
                ss += *lane;
            }
            i += 2;
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
        let vmx = vdupq_n_f64(mx);
        let vmy = vdupq_n_f64(my);
        while i + 2 <= n {
            let a = vsubq_f64(vld1q_f64(x.as_ptr().add(i)), vmx);
            let b = vsubq_f64(vld1q_f64(y.as_ptr().add(i)), vmy);
            let prod = vmulq_f64(a, b);
            let mut lanes = [0f64; 2];
            vst1q_f64(lanes.as_mut_ptr(), prod);
            for lane in &lanes {
                sxy += *lane;
            }
            i += 2;
        }
    }
    while i < n {
        sxy += (x[i] - mx) * (y[i] - my);
        i += 1;
    }
    sxy
}

pub fn backend_name() -> &'static str {
    "neon"
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/neon.rs"]
mod tests;
