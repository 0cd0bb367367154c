use std::collections::BTreeMap;
use std::fmt::Write;

use crate::model::blat::BlatAssociation;
use crate::model::ids::{ExperimentId, GeneId};
use crate::model::link::{CoexpressionLink, NodeDegree};
use crate::pipeline::stage2_aggregate::CorrelationMatrix;
use crate::pipeline::stage3_links::PairSummary;
use crate::report::{format_decimal4, format_f64_6};

pub const LINKS_HEADER: &str = "analysis\tfirst_gene\tsecond_gene\tsign\teffect\tp_value\tnum_datasets\ttested\tsupporting\tspecificity";

pub const NODE_DEGREE_HEADER: &str = "gene\tsymbol\tnum_links\trank_num_links";

pub const PAIRS_HEADER: &str = "target\tcandidate\tpositive\tnegative\ttested";

pub const ASSOCIATIONS_HEADER: &str = "query\tgene_product\tgene\tsymbol\tchromosome\tt_start\tt_end\tstrand\tblat_score\tidentity\toverlap\tscore\tspecificity\ttied_hits\tbest";

pub fn link_row(link: &CoexpressionLink) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        link.analysis,
        link.first_gene,
        link.second_gene,
        link.sign.as_str(),
        format_f64_6(link.effect),
        format_f64_6(link.p_value),
        link.num_datasets,
        link.tested.to_bit_string(),
        link.supporting.to_bit_string(),
        link.specificity.to_bit_string()
    )
}

pub fn render_node_degree_tsv(degrees: &[NodeDegree]) -> String {
    let mut out = String::new();
    out.push_str(NODE_DEGREE_HEADER);
    out.push('\n');
    for d in degrees {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            d.gene,
            d.symbol,
            d.num_links,
            format_f64_6(d.rank_num_links)
        );
    }
    out
}

pub fn render_pairs_tsv(pairs: &[PairSummary]) -> String {
    let mut out = String::new();
    out.push_str(PAIRS_HEADER);
    out.push('\n');
    for p in pairs {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            p.target,
            p.candidate,
            p.positive,
            p.negative,
            p.tested.to_bit_string()
        );
    }
    out
}

/// Tab-delimited matrix: one column per candidate, labelled
/// `QUERY_CANDIDATE`, one row per experiment labelled with its short name.
pub fn render_correlation_matrix(
    matrix: &CorrelationMatrix,
    experiment_names: &BTreeMap<ExperimentId, String>,
    symbols: &BTreeMap<GeneId, String>,
) -> String {
    let label = |g: &GeneId| symbols.get(g).cloned().unwrap_or_else(|| g.to_string());
    let query = label(&matrix.query);

    let mut out = String::from("Experiments");
    for c in &matrix.columns {
        let _ = write!(out, "\t{}_{}", query, label(c));
    }
    out.push('\n');

    for (ee, values) in &matrix.rows {
        match experiment_names.get(ee) {
            Some(name) => out.push_str(name),
            None => {
                let _ = write!(out, "{ee}");
            }
        }
        for v in values {
            out.push('\t');
            out.push_str(&format_decimal4(*v));
        }
        out.push('\n');
    }
    out
}

/// All scored associations, grouped by query; the best association of
/// each query is flagged.
pub fn render_associations_tsv(
    by_query: &BTreeMap<String, Vec<BlatAssociation>>,
    best: &BTreeMap<String, BlatAssociation>,
) -> String {
    let mut out = String::new();
    out.push_str(ASSOCIATIONS_HEADER);
    out.push('\n');
    for (query, associations) in by_query {
        let top = best.get(query);
        for a in associations {
            let is_best = top.is_some_and(|t| t == a);
            let r = &a.result;
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                query,
                a.gene_product,
                a.gene,
                a.gene_symbol,
                r.target_chromosome,
                r.t_start,
                r.t_end,
                r.strand,
                format_decimal4(r.score()),
                format_decimal4(r.identity()),
                a.overlap,
                a.score,
                format_decimal4(a.specificity),
                a.tied_hits,
                is_best
            );
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/text.rs"]
mod tests;
