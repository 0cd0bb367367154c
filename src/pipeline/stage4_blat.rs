use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::blat::{BlatAssociation, BlatHit, BlatResult, MappingStats};
use crate::model::ids::GeneId;
use crate::model::thresholds::ProbeMapperConfig;

const MAX_WARNINGS: usize = 10;

#[derive(Debug, Error)]
pub enum BlatError {
    #[error("associations from different query sequences scored together: {first} and {other}")]
    MixedQueries { first: String, other: String },
}

/// Association score: `round(1000 * alignment quality * overlap fraction)`.
pub fn association_score(association: &BlatAssociation) -> u32 {
    let raw = 1000.0 * association.result.score() * association.overlap_fraction();
    raw.round().clamp(0.0, 1000.0) as u32
}

/// Scores the associations of one query sequence in place: keeps the best
/// hit per gene product, fills in each gene's specificity, and returns the
/// overall best association. Equal scores keep the earliest hit and record
/// how many others tied with it.
pub fn score_results(
    associations: &mut Vec<BlatAssociation>,
) -> Result<Option<BlatAssociation>, BlatError> {
    let Some(first) = associations.first() else {
        return Ok(None);
    };
    let query = first.query().to_string();
    if let Some(other) = associations.iter().find(|a| a.query() != query) {
        return Err(BlatError::MixedQueries {
            first: query,
            other: other.query().to_string(),
        });
    }

    for a in associations.iter_mut() {
        a.score = association_score(a);
        a.specificity = 1.0;
        a.tied_hits = 0;
    }

    let mut kept: Vec<BlatAssociation> = Vec::with_capacity(associations.len());
    let mut slot: HashMap<String, usize> = HashMap::new();
    for a in associations.drain(..) {
        match slot.get(&a.gene_product) {
            Some(&i) => {
                if a.score > kept[i].score {
                    kept[i] = a;
                } else if a.score == kept[i].score {
                    kept[i].tied_hits += 1;
                }
            }
            None => {
                slot.insert(a.gene_product.clone(), kept.len());
                kept.push(a);
            }
        }
    }
    for a in kept.iter().filter(|a| a.tied_hits > 0) {
        debug!(
            query = %query,
            gene_product = %a.gene_product,
            ties = a.tied_hits,
            "equal top scores for gene product, kept first hit"
        );
    }

    let mut best_per_gene: BTreeMap<GeneId, u32> = BTreeMap::new();
    for a in &kept {
        let best = best_per_gene.entry(a.gene).or_insert(0);
        *best = (*best).max(a.score);
    }
    let n_genes = best_per_gene.len();
    let total: u64 = best_per_gene.values().map(|s| *s as u64).sum();
    for a in kept.iter_mut() {
        a.specificity = if n_genes <= 1 {
            1.0
        } else if total == 0 {
            1.0 / n_genes as f64
        } else {
            best_per_gene[&a.gene] as f64 / total as f64
        };
    }

    let best = best_association(&kept).cloned();
    *associations = kept;
    Ok(best)
}

/// Highest score; the earliest association wins a tie.
pub fn best_association(associations: &[BlatAssociation]) -> Option<&BlatAssociation> {
    let mut best: Option<&BlatAssociation> = None;
    for a in associations {
        if best.is_none_or(|b| a.score > b.score) {
            best = Some(a);
        }
    }
    best
}

#[derive(Debug)]
pub struct Stage4Output {
    pub by_query: BTreeMap<String, Vec<BlatAssociation>>,
    pub best: BTreeMap<String, BlatAssociation>,
    pub stats: MappingStats,
}

struct WarningLog {
    emitted: usize,
}

impl WarningLog {
    fn emit(&mut self, message: &str, query: &str) {
        if self.emitted < MAX_WARNINGS {
            warn!(query, "{message}");
            if self.emitted + 1 == MAX_WARNINGS {
                warn!("further non-mappings will not be logged");
            }
        }
        self.emitted += 1;
    }
}

pub fn run_stage4(hits: Vec<BlatHit>, config: &ProbeMapperConfig) -> Result<Stage4Output, BlatError> {
    let mut per_query: BTreeMap<String, Vec<BlatHit>> = BTreeMap::new();
    for hit in hits {
        per_query.entry(hit.result.query.clone()).or_default().push(hit);
    }

    let mut stats = MappingStats {
        sequences: per_query.len(),
        ..MappingStats::default()
    };
    let mut warnings = WarningLog { emitted: 0 };
    let mut by_query = BTreeMap::new();
    let mut best = BTreeMap::new();

    for (query, rows) in per_query {
        let alignments = distinct_alignments(&rows);
        stats.alignments += alignments.len();

        let kept = trim_non_canonical(&alignments, config);
        stats.trimmed_non_canonical += alignments.len() - kept.len();
        let n_hits = kept.len();

        let repeat_fraction = rows.iter().find_map(|r| r.result.repeat_fraction);
        if let Some(fraction) = repeat_fraction {
            if fraction > config.maximum_repeat_fraction
                && n_hits >= config.non_specific_site_count_threshold
            {
                stats.skipped_repeats += 1;
                warnings.emit(
                    &format!("skipped due to repeat content ({fraction:.3}, {n_hits} hits)"),
                    &query,
                );
                continue;
            }
        }
        if n_hits >= config.non_repeat_non_specific_site_count_threshold {
            stats.skipped_non_specific += 1;
            warnings.emit(&format!("skipped due to non-specificity ({n_hits} hits)"), &query);
            continue;
        }

        let mut passing: Vec<&BlatResult> = Vec::with_capacity(n_hits);
        let mut below = 0usize;
        for r in kept {
            if r.score() < config.blat_score_threshold || r.identity() < config.identity_threshold {
                debug!(
                    query = %query,
                    score = r.score(),
                    identity = r.identity(),
                    "alignment below threshold"
                );
                below += 1;
            } else {
                passing.push(r);
            }
        }
        stats.alignments_below_threshold += below;

        let keep: Vec<bool> = rows
            .iter()
            .map(|row| {
                passing
                    .iter()
                    .any(|p| p.alignment_key() == row.result.alignment_key())
            })
            .collect();
        let mut associations: Vec<BlatAssociation> = rows
            .into_iter()
            .zip(keep)
            .filter(|(_, keep)| *keep)
            .filter_map(|(row, _)| {
                row.product
                    .map(|product| BlatAssociation::from_hit(row.result, product))
            })
            .collect();

        if !associations.is_empty() {
            score_results(&mut associations)?;
            if config.minimum_exon_overlap_fraction > 0.0 {
                associations
                    .retain(|a| a.overlap_fraction() >= config.minimum_exon_overlap_fraction);
            }
        }

        if associations.is_empty() {
            stats.no_mapping += 1;
            warnings.emit(
                &format!(
                    "no mappings; {n_hits} alignments checked, {below} below score or identity threshold"
                ),
                &query,
            );
            continue;
        }

        stats.mapped += 1;
        stats.associations += associations.len();
        stats.ties += associations.iter().map(|a| a.tied_hits).sum::<usize>();
        if let Some(top) = best_association(&associations) {
            best.insert(query.clone(), top.clone());
        }
        by_query.insert(query, associations);
    }

    info!(
        sequences = stats.sequences,
        mapped = stats.mapped,
        associations = stats.associations,
        skipped_repeats = stats.skipped_repeats,
        skipped_non_specific = stats.skipped_non_specific,
        no_mapping = stats.no_mapping,
        "BLAT associations scored"
    );

    Ok(Stage4Output {
        by_query,
        best,
        stats,
    })
}

fn distinct_alignments(rows: &[BlatHit]) -> Vec<&BlatResult> {
    let mut out: Vec<&BlatResult> = Vec::new();
    for row in rows {
        if !out
            .iter()
            .any(|r| r.alignment_key() == row.result.alignment_key())
        {
            out.push(&row.result);
        }
    }
    out
}

/// Drops alignments on non-canonical chromosomes, but only when a sequence
/// has several hits and some (not all) of them are canonical.
fn trim_non_canonical<'a>(
    alignments: &[&'a BlatResult],
    config: &ProbeMapperConfig,
) -> Vec<&'a BlatResult> {
    if !config.trim_non_canonical_chromosome_hits || alignments.len() <= 1 {
        return alignments.to_vec();
    }
    let canonical: Vec<&BlatResult> = alignments
        .iter()
        .copied()
        .filter(|r| r.on_canonical_chromosome())
        .collect();
    if !canonical.is_empty() && canonical.len() < alignments.len() {
        canonical
    } else {
        alignments.to_vec()
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_blat.rs"]
mod tests;
