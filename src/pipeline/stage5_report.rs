use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::model::ids::{ExperimentId, GeneId};
use crate::model::thresholds::{LinkAnalysisConfig, ProbeMapperConfig};
use crate::model::vector::Experiment;
use crate::pipeline::stage2_aggregate::{CorrelationMatrix, Stage2Output};
use crate::pipeline::stage3_links::{PairSummary, Stage3Output};
use crate::pipeline::stage4_blat::Stage4Output;
use crate::report::json::{render_blat_summary_json, render_summary_json};
use crate::report::text::{
    render_associations_tsv, render_correlation_matrix, render_node_degree_tsv, render_pairs_tsv,
};
use crate::report::{BlatSummary, LinkSummary, MatrixEffect, ToolMeta};

pub const NODE_DEGREE_FILE: &str = "node_degree.tsv";
pub const PAIRS_FILE: &str = "pairs.tsv";
pub const MATRIX_FILE: &str = "matrix.tsv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const ASSOCIATIONS_FILE: &str = "associations.tsv";
pub const BLAT_SUMMARY_FILE: &str = "blat_summary.json";

pub struct LinkReportInput<'a> {
    pub name: &'a str,
    pub experiments: &'a [Experiment],
    pub n_vectors: usize,
    pub targets: &'a BTreeSet<GeneId>,
    pub symbols: &'a BTreeMap<GeneId, String>,
    pub config: &'a LinkAnalysisConfig,
    pub stage2: &'a Stage2Output,
    /// Absent in a dry run.
    pub stage3: Option<&'a Stage3Output>,
    pub pairs: Option<&'a [PairSummary]>,
    pub matrix: Option<&'a CorrelationMatrix>,
    pub matrix_effects: &'a BTreeMap<GeneId, f64>,
}

pub fn build_link_summary(input: &LinkReportInput<'_>) -> LinkSummary {
    let n_experiments = input.stage2.ordering.len();
    let (description, links_stored, positive_links, negative_links) = match input.stage3 {
        Some(s3) => (
            s3.record.description.clone(),
            s3.links_stored,
            s3.positive_links,
            s3.negative_links,
        ),
        None => (
            format!(
                "Dry run over {n_experiments} experiments; stringency={}",
                input.config.stringency
            ),
            0,
            0,
            0,
        ),
    };
    let matrix_effects = input
        .matrix_effects
        .iter()
        .map(|(gene, effect)| MatrixEffect {
            gene: input
                .symbols
                .get(gene)
                .cloned()
                .unwrap_or_else(|| gene.to_string()),
            effect: (!effect.is_nan()).then_some(*effect),
        })
        .collect();

    LinkSummary {
        tool: ToolMeta::current(),
        name: input.name.to_string(),
        description,
        dry_run: input.stage3.is_none(),
        n_experiments,
        n_genes: input.targets.len(),
        n_vectors: input.n_vectors,
        n_correlations: input.stage2.n_correlations,
        n_defined_correlations: input.stage2.n_defined,
        n_gene_pairs: input.stage2.evidence.len(),
        links_stored,
        positive_links,
        negative_links,
        config: input.config.clone(),
        matrix_effects,
    }
}

/// Writes the per-run outputs that the link store does not own.
pub fn write_link_reports(input: &LinkReportInput<'_>, out_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;

    if let Some(s3) = input.stage3 {
        write_text(
            &out_dir.join(NODE_DEGREE_FILE),
            &render_node_degree_tsv(&s3.node_degrees),
        )?;
    }
    if let Some(pairs) = input.pairs {
        write_text(&out_dir.join(PAIRS_FILE), &render_pairs_tsv(pairs))?;
    }
    if let Some(matrix) = input.matrix {
        let names: BTreeMap<ExperimentId, String> = input
            .experiments
            .iter()
            .map(|e| (e.id, e.short_name.clone()))
            .collect();
        write_text(
            &out_dir.join(MATRIX_FILE),
            &render_correlation_matrix(matrix, &names, input.symbols),
        )?;
    }

    let summary = build_link_summary(input);
    write_text(&out_dir.join(SUMMARY_FILE), &render_summary_json(&summary)?)?;
    info!(dir = %out_dir.display(), "link reports written");
    Ok(())
}

pub fn write_blat_reports(
    output: &Stage4Output,
    config: &ProbeMapperConfig,
    out_dir: &Path,
) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;
    write_text(
        &out_dir.join(ASSOCIATIONS_FILE),
        &render_associations_tsv(&output.by_query, &output.best),
    )?;
    let summary = BlatSummary {
        tool: ToolMeta::current(),
        config: config.clone(),
        stats: output.stats.clone(),
    };
    write_text(
        &out_dir.join(BLAT_SUMMARY_FILE),
        &render_blat_summary_json(&summary)?,
    )?;
    info!(dir = %out_dir.display(), "BLAT reports written");
    Ok(())
}

fn write_text(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(contents.as_bytes())?;
    w.flush()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_report.rs"]
mod tests;
