use serde::Serialize;

use crate::model::ids::GeneId;

/// One BLAT (PSL-style) alignment of a query sequence against the genome.
#[derive(Debug, Clone, PartialEq)]
pub struct BlatResult {
    pub query: String,
    pub query_length: u32,
    pub matches: u32,
    pub mismatches: u32,
    pub rep_matches: u32,
    pub q_gap_count: u32,
    pub t_gap_count: u32,
    pub q_start: u32,
    pub q_end: u32,
    pub target_chromosome: String,
    pub t_start: u64,
    pub t_end: u64,
    pub strand: char,
    pub repeat_fraction: Option<f64>,
}

impl BlatResult {
    /// Alignment quality in [0, 1], relative to the full query length.
    pub fn score(&self) -> f64 {
        if self.query_length == 0 {
            return 0.0;
        }
        let good = self.matches as f64 + self.rep_matches as f64;
        let bad = self.mismatches as f64 + self.q_gap_count as f64 + self.t_gap_count as f64;
        ((good - bad) / self.query_length as f64).clamp(0.0, 1.0)
    }

    /// Identity in [0, 1] derived from the UCSC milli-bad measure (mRNA mode).
    pub fn identity(&self) -> f64 {
        let q_ali = self.q_end.saturating_sub(self.q_start) as i64;
        let t_ali = self.t_end.saturating_sub(self.t_start) as i64;
        if q_ali.min(t_ali) <= 0 {
            return 0.0;
        }
        let size_dif = (q_ali - t_ali).max(0);
        let total = self.matches as i64 + self.rep_matches as i64 + self.mismatches as i64;
        if total == 0 {
            return 0.0;
        }
        let size_penalty = (3.0 * (1.0 + size_dif as f64).ln()).round() as i64;
        let milli_bad =
            (1000 * (self.mismatches as i64 + self.q_gap_count as i64 + size_penalty)) / total;
        (1.0 - milli_bad as f64 / 1000.0).clamp(0.0, 1.0)
    }

    pub fn alignment_key(&self) -> (&str, u64, u64, char) {
        (self.target_chromosome.as_str(), self.t_start, self.t_end, self.strand)
    }

    pub fn on_canonical_chromosome(&self) -> bool {
        is_canonical_chromosome(&self.target_chromosome)
    }
}

/// Assembled autosomes, X, Y and mitochondrial sequence. Alternate
/// haplotypes, unplaced and random contigs are not canonical.
pub fn is_canonical_chromosome(name: &str) -> bool {
    let trimmed = name.trim();
    let core = trimmed
        .strip_prefix("chr")
        .or_else(|| trimmed.strip_prefix("Chr"))
        .or_else(|| trimmed.strip_prefix("CHR"))
        .unwrap_or(trimmed);
    if core.is_empty() || core.contains('_') {
        return false;
    }
    if core.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    matches!(
        core.to_ascii_uppercase().as_str(),
        "X" | "Y" | "M" | "MT" | "W" | "Z"
    )
}

/// Gene product overlapped by an alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneProductHit {
    pub gene_product: String,
    pub gene: GeneId,
    pub gene_symbol: String,
    pub overlap: u32,
}

/// One input row: an alignment and, when it lands in a transcript, the gene
/// product it overlaps. Alignments overlapping several products appear once
/// per product.
#[derive(Debug, Clone, PartialEq)]
pub struct BlatHit {
    pub result: BlatResult,
    pub product: Option<GeneProductHit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlatAssociation {
    pub result: BlatResult,
    pub gene_product: String,
    pub gene: GeneId,
    pub gene_symbol: String,
    pub overlap: u32,
    pub score: u32,
    pub specificity: f64,
    pub tied_hits: usize,
}

impl BlatAssociation {
    pub fn new(
        result: BlatResult,
        gene_product: String,
        gene: GeneId,
        gene_symbol: String,
        overlap: u32,
    ) -> Self {
        Self {
            result,
            gene_product,
            gene,
            gene_symbol,
            overlap,
            score: 0,
            specificity: 1.0,
            tied_hits: 0,
        }
    }

    pub fn from_hit(result: BlatResult, product: GeneProductHit) -> Self {
        Self::new(
            result,
            product.gene_product,
            product.gene,
            product.gene_symbol,
            product.overlap,
        )
    }

    pub fn query(&self) -> &str {
        &self.result.query
    }

    pub fn overlap_fraction(&self) -> f64 {
        if self.result.query_length == 0 {
            return 0.0;
        }
        (self.overlap as f64 / self.result.query_length as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingStats {
    pub sequences: usize,
    pub mapped: usize,
    pub alignments: usize,
    pub alignments_below_threshold: usize,
    pub trimmed_non_canonical: usize,
    pub skipped_repeats: usize,
    pub skipped_non_specific: usize,
    pub no_mapping: usize,
    pub associations: usize,
    pub ties: usize,
}
