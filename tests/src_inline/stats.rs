use super::*;

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() < tol
}

#[test]
fn test_erfc_known_values() {
    assert!(close(erfc(0.0), 1.0, 1e-7));
    assert!(close(erfc(1.0), 0.157_299_21, 1e-6));
    assert!(close(erfc(-1.0), 1.842_700_79, 1e-6));
    assert!(close(erfc(2.0), 0.004_677_73, 1e-6));
    assert!(erfc(f64::NAN).is_nan());
}

#[test]
fn test_ln_gamma_factorials() {
    assert!(close(ln_gamma(1.0), 0.0, 1e-10));
    assert!(close(ln_gamma(5.0), 24f64.ln(), 1e-10));
    assert!(close(ln_gamma(0.5), PI.sqrt().ln(), 1e-10));
}

#[test]
fn test_betai_uniform_is_identity() {
    for x in [0.0, 0.1, 0.5, 0.9, 1.0] {
        assert!(close(betai(1.0, 1.0, x), x, 1e-9));
    }
    assert!(betai(1.0, 1.0, 1.5).is_nan());
}

#[test]
fn test_correlation_pvalue() {
    assert!(close(correlation_pvalue(0.0, 10), 1.0, 1e-9));
    let p = correlation_pvalue(0.9, 10);
    assert!(p > 1e-4 && p < 1e-3, "p = {p}");
    assert_eq!(correlation_pvalue(1.0, 10), 0.0);
    assert!(correlation_pvalue(0.5, 2).is_nan());
    assert!(correlation_pvalue(f64::NAN, 10).is_nan());
}

#[test]
fn test_correlation_pvalue_symmetric_in_sign() {
    let a = correlation_pvalue(0.6, 12);
    let b = correlation_pvalue(-0.6, 12);
    assert!(close(a, b, 1e-12));
}

#[test]
fn test_fixed_effects_single_study_keeps_effect() {
    let meta = fixed_effects(&[(0.7, 20)]).unwrap();
    assert!(close(meta.effect, 0.7, 1e-12));
    assert_eq!(meta.n_studies, 1);
    assert!(meta.p_value < 0.01);
}

#[test]
fn test_fixed_effects_skips_small_studies() {
    assert!(fixed_effects(&[(0.9, 3), (f64::NAN, 30)]).is_none());
    let meta = fixed_effects(&[(0.9, 3), (0.5, 13), (0.5, 23)]).unwrap();
    assert_eq!(meta.n_studies, 2);
    assert!(close(meta.effect, 0.5, 1e-12));
}

#[test]
fn test_fixed_effects_weights_by_sample_size() {
    let meta = fixed_effects(&[(0.2, 103), (0.8, 13)]).unwrap();
    assert!(meta.effect > 0.2 && meta.effect < 0.5);
}

#[test]
fn test_fisher_z_saturates() {
    assert!(fisher_z(1.0).is_finite());
    assert!(fisher_z(-1.0).is_finite());
    assert_eq!(fisher_z(0.0), 0.0);
}

#[test]
fn test_average_ranks_with_ties() {
    let ranks = average_ranks(&[3.0, 1.0, 3.0, 2.0]);
    assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
    assert!(average_ranks(&[]).is_empty());
}
