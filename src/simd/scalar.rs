pub fn sum_f64(values: &[f64]) -> f64 {
    let mut sum = 0f64;
    for &v in values {
        sum += v;
    }
    sum
}

pub fn centered_sum_squares(values: &[f64], mean: f64) -> f64 {
    let mut ss = 0f64;
    for &v in values {
        let d = v - mean;
        ss += d * d;
    }
    ss
}

pub fn centered_cross(x: &[f64], y: &[f64], mx: f64, my: f64) -> f64 {
    let mut sxy = 0f64;
    for (&a, &b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
    }
    sxy
}

pub fn backend_name() -> &'static str {
    "scalar"
}

#[cfg(test)]
#[path = "../../tests/src_inline/simd/scalar.rs"]
mod tests;
