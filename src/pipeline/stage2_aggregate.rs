use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::model::bitvec::ExperimentOrdering;
use crate::model::evidence::{ExperimentMeasurement, GenePairEvidence};
use crate::model::ids::{ExperimentId, GeneId};
use crate::model::thresholds::LinkAnalysisConfig;
use crate::model::vector::{Experiment, ExpressionVector, ProbeGeneMap};
use crate::pipeline::stage1_correlation::CorrelationContext;
use crate::stats;

pub struct AggregationInput<'a> {
    pub experiments: &'a [Experiment],
    pub vectors: &'a [ExpressionVector],
    pub probe_genes: &'a ProbeGeneMap,
    pub targets: &'a BTreeSet<GeneId>,
    pub candidates: &'a BTreeSet<GeneId>,
    pub config: &'a LinkAnalysisConfig,
}

#[derive(Debug)]
pub struct Stage2Output {
    pub ordering: ExperimentOrdering,
    pub evidence: BTreeMap<(GeneId, GeneId), GenePairEvidence>,
    pub sample_sizes: BTreeMap<ExperimentId, usize>,
    pub n_correlations: usize,
    pub n_defined: usize,
}

impl Stage2Output {
    pub fn pair(&self, target: GeneId, candidate: GeneId) -> Option<&GenePairEvidence> {
        self.evidence.get(&(target, candidate))
    }

    pub fn median(&self, target: GeneId, candidate: GeneId, ee: ExperimentId) -> f64 {
        self.pair(target, candidate)
            .and_then(|ev| ev.measurements.get(&ee))
            .map_or(f64::NAN, |m| m.correlation)
    }
}

type GeneBuckets<'a> = BTreeMap<GeneId, Vec<&'a ExpressionVector>>;

pub fn run_stage2(input: &AggregationInput<'_>) -> Stage2Output {
    let ordering = ExperimentOrdering::new(input.experiments.iter().map(|e| e.id));
    let mut ctx = CorrelationContext::new(input.config.min_samples);

    let wanted: BTreeSet<GeneId> = input.targets.union(input.candidates).copied().collect();
    let buckets = bucket_vectors(input.vectors, input.probe_genes, &wanted);

    let mut sample_sizes = BTreeMap::new();
    for v in input.vectors {
        sample_sizes.entry(v.experiment).or_insert_with(|| v.len());
    }

    let mut evidence: BTreeMap<(GeneId, GeneId), GenePairEvidence> = BTreeMap::new();
    let mut n_correlations = 0usize;
    let mut n_defined = 0usize;
    let mut combos: Vec<(f64, usize, &ExpressionVector, &ExpressionVector)> = Vec::new();

    for &ee in ordering.ids() {
        let Some(genes) = buckets.get(&ee) else {
            debug!(experiment = %ee, "no vectors for analyzed genes");
            continue;
        };
        let Some(pos) = ordering.position(ee) else {
            continue;
        };
        for &target in input.targets {
            let Some(target_vectors) = genes.get(&target) else {
                continue;
            };
            for &candidate in input.candidates {
                if candidate == target {
                    continue;
                }
                let Some(candidate_vectors) = genes.get(&candidate) else {
                    continue;
                };

                combos.clear();
                for &a in target_vectors {
                    for &b in candidate_vectors {
                        if a.id == b.id {
                            continue;
                        }
                        let c = ctx.correlate(a, b);
                        n_correlations += 1;
                        if c.is_defined() {
                            combos.push((c.value, c.n_samples, a, b));
                        }
                    }
                }
                if combos.is_empty() {
                    continue;
                }
                n_defined += combos.len();
                combos.sort_by(|x, y| x.0.total_cmp(&y.0));
                let (r, n, a, b) = combos[combos.len() / 2];

                let ev = evidence
                    .entry((target, candidate))
                    .or_insert_with(|| GenePairEvidence::new(target, candidate, &ordering));
                ev.tested.set(pos);
                if r >= input.config.positive_threshold {
                    ev.positive.set(pos);
                } else if r <= input.config.negative_threshold {
                    ev.negative.set(pos);
                }
                if !input.probe_genes.is_specific(&a.probe)
                    || !input.probe_genes.is_specific(&b.probe)
                {
                    ev.nonspecific.insert(ee);
                }
                ev.measurements.insert(
                    ee,
                    ExperimentMeasurement {
                        correlation: r,
                        n_samples: n,
                        target_vector: a.id,
                        candidate_vector: b.id,
                        target_probe: a.probe.clone(),
                        candidate_probe: b.probe.clone(),
                        n_combinations: combos.len(),
                    },
                );
            }
        }
    }

    let (fast, slow) = ctx.path_counts();
    info!(
        experiments = ordering.len(),
        pairs = evidence.len(),
        correlations = n_correlations,
        defined = n_defined,
        cached_vectors = ctx.cached_vectors(),
        fast_path = fast,
        slow_path = slow,
        "aggregated gene pair evidence"
    );

    Stage2Output {
        ordering,
        evidence,
        sample_sizes,
        n_correlations,
        n_defined,
    }
}

fn bucket_vectors<'a>(
    vectors: &'a [ExpressionVector],
    probe_genes: &ProbeGeneMap,
    wanted: &BTreeSet<GeneId>,
) -> BTreeMap<ExperimentId, GeneBuckets<'a>> {
    let mut buckets: BTreeMap<ExperimentId, GeneBuckets<'a>> = BTreeMap::new();
    for v in vectors {
        let Some(genes) = probe_genes.genes_for(&v.probe) else {
            continue;
        };
        for gene in genes {
            if wanted.contains(gene) {
                buckets
                    .entry(v.experiment)
                    .or_default()
                    .entry(*gene)
                    .or_default()
                    .push(v);
            }
        }
    }
    buckets
}

/// Mean absolute meta-analysed effect of each target against the candidates
/// measured in more than half of the experiments. `NaN` when no candidate
/// qualifies.
pub fn matrix_effect_sizes(
    output: &Stage2Output,
    targets: &BTreeSet<GeneId>,
    candidates: &BTreeSet<GeneId>,
) -> BTreeMap<GeneId, f64> {
    let n_experiments = output.sample_sizes.len();
    let mut out = BTreeMap::new();
    let mut measurements: Vec<(f64, usize)> = Vec::new();
    for &target in targets {
        let mut total = 0f64;
        let mut count = 0usize;
        for &candidate in candidates {
            if candidate == target {
                continue;
            }
            measurements.clear();
            for (ee, &size) in &output.sample_sizes {
                let r = output.median(target, candidate, *ee);
                if !r.is_nan() && size > 3 {
                    measurements.push((r, size));
                }
            }
            if measurements.len() > n_experiments / 2 {
                if let Some(meta) = stats::fixed_effects(&measurements) {
                    total += meta.effect.abs();
                    count += 1;
                }
            }
        }
        let value = if count == 0 {
            f64::NAN
        } else {
            total / count as f64
        };
        out.insert(target, value);
    }
    out
}

#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub query: GeneId,
    pub columns: Vec<GeneId>,
    pub rows: Vec<(ExperimentId, Vec<f64>)>,
}

/// Per-experiment medians of `query` against every other candidate.
/// Experiments whose defined fraction over all analyzed pairs falls below
/// `presence_fraction` are left out.
pub fn correlation_matrix(
    output: &Stage2Output,
    query: GeneId,
    targets: &BTreeSet<GeneId>,
    candidates: &BTreeSet<GeneId>,
    presence_fraction: f64,
) -> CorrelationMatrix {
    let columns: Vec<GeneId> = candidates.iter().copied().filter(|g| *g != query).collect();
    let mut rows = Vec::new();
    for &ee in output.ordering.ids() {
        let mut cells = 0usize;
        let mut present = 0usize;
        for &target in targets {
            for &candidate in candidates {
                if candidate == target {
                    continue;
                }
                cells += 1;
                if !output.median(target, candidate, ee).is_nan() {
                    present += 1;
                }
            }
        }
        let fraction = if cells == 0 {
            0.0
        } else {
            present as f64 / cells as f64
        };
        if fraction < presence_fraction {
            continue;
        }
        let values = columns
            .iter()
            .map(|c| output.median(query, *c, ee))
            .collect();
        rows.push((ee, values));
    }
    CorrelationMatrix {
        query,
        columns,
        rows,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_aggregate.rs"]
mod tests;
