pub mod json;
pub mod text;

use serde::Serialize;

use crate::model::blat::MappingStats;
use crate::model::thresholds::{LinkAnalysisConfig, ProbeMapperConfig};

#[derive(Debug, Clone, Serialize)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
    pub simd_backend: String,
}

impl ToolMeta {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            simd_backend: crate::simd::backend_name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixEffect {
    pub gene: String,
    pub effect: Option<f64>,
}

/// Contents of `summary.json` for a link analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct LinkSummary {
    pub tool: ToolMeta,
    pub name: String,
    pub description: String,
    pub dry_run: bool,
    pub n_experiments: usize,
    pub n_genes: usize,
    pub n_vectors: usize,
    pub n_correlations: usize,
    pub n_defined_correlations: usize,
    pub n_gene_pairs: usize,
    pub links_stored: usize,
    pub positive_links: usize,
    pub negative_links: usize,
    pub config: LinkAnalysisConfig,
    pub matrix_effects: Vec<MatrixEffect>,
}

/// Contents of `blat_summary.json`.
#[derive(Debug, Clone, Serialize)]
pub struct BlatSummary {
    pub tool: ToolMeta,
    pub config: ProbeMapperConfig,
    pub stats: MappingStats,
}

/// At most four decimals with trailing zeros trimmed; `NaN` prints empty.
pub fn format_decimal4(v: f64) -> String {
    if v.is_nan() {
        return String::new();
    }
    let mut s = format!("{v:.4}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

/// Six decimals, falling back to scientific notation for tiny magnitudes.
pub fn format_f64_6(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v != 0.0 && v.abs() < 1e-4 {
        format!("{v:.4e}")
    } else {
        format!("{v:.6}")
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
