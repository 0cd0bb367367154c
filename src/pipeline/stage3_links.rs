use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use crate::model::bitvec::{ExperimentBits, ExperimentOrdering};
use crate::model::evidence::{GenePairEvidence, LinkSign};
use crate::model::ids::{AnalysisId, GeneId};
use crate::model::link::{AnalysisRecord, CoexpressionLink, NodeDegree};
use crate::model::thresholds::LinkAnalysisConfig;
use crate::pipeline::stage2_aggregate::Stage2Output;
use crate::report::{json, text};
use crate::stats;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("link store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize analysis record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown analysis {0}")]
    UnknownAnalysis(AnalysisId),
    #[error("link store rejected batch {batch}: {reason}")]
    Rejected { batch: usize, reason: String },
}

/// Destination for one analysis run and its coexpression links.
pub trait LinkStore {
    fn create_analysis(&mut self, record: &AnalysisRecord) -> Result<AnalysisId, StoreError>;
    /// Stores one batch and returns the number of links written.
    fn create_links(&mut self, batch: &[CoexpressionLink]) -> Result<usize, StoreError>;
    fn enable_analysis(&mut self, id: AnalysisId, description: &str) -> Result<(), StoreError>;
    fn delete_analysis(&mut self, id: AnalysisId) -> Result<(), StoreError>;
}

pub const LINKS_FILE: &str = "links.tsv";
pub const ANALYSIS_FILE: &str = "analysis.json";

/// Writes `links.tsv` and `analysis.json` into an output directory.
pub struct TsvLinkStore {
    dir: PathBuf,
    record: Option<AnalysisRecord>,
    writer: Option<BufWriter<File>>,
}

impl TsvLinkStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            record: None,
            writer: None,
        }
    }

    fn links_path(&self) -> PathBuf {
        self.dir.join(LINKS_FILE)
    }

    fn analysis_path(&self) -> PathBuf {
        self.dir.join(ANALYSIS_FILE)
    }

    fn write_record(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        let path = self.analysis_path();
        let body = json::render_analysis_json(record)?;
        fs::write(&path, body).map_err(|source| StoreError::Io { path, source })
    }
}

impl TsvLinkStore {
    fn open_analysis(&mut self, record: &AnalysisRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        self.write_record(record)?;
        let path = self.links_path();
        let file = File::create(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", text::LINKS_HEADER)
            .and_then(|()| writer.flush())
            .map_err(|source| StoreError::Io { path, source })?;
        self.writer = Some(writer);
        self.record = Some(record.clone());
        Ok(())
    }
}

impl LinkStore for TsvLinkStore {
    fn create_analysis(&mut self, record: &AnalysisRecord) -> Result<AnalysisId, StoreError> {
        let id = AnalysisId(1);
        if let Err(err) = self.open_analysis(record) {
            if let Err(cleanup) = self.delete_analysis(id) {
                warn!(%cleanup, "could not remove partially created analysis");
            }
            return Err(err);
        }
        Ok(id)
    }

    fn create_links(&mut self, batch: &[CoexpressionLink]) -> Result<usize, StoreError> {
        let path = self.links_path();
        let Some(writer) = self.writer.as_mut() else {
            return Err(StoreError::UnknownAnalysis(
                batch.first().map_or(AnalysisId(0), |l| l.analysis),
            ));
        };
        for link in batch {
            writeln!(writer, "{}", text::link_row(link)).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        }
        writer
            .flush()
            .map_err(|source| StoreError::Io { path, source })?;
        Ok(batch.len())
    }

    fn enable_analysis(&mut self, id: AnalysisId, description: &str) -> Result<(), StoreError> {
        let path = self.links_path();
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|source| StoreError::Io { path, source })?;
        }
        let mut record = self.record.take().ok_or(StoreError::UnknownAnalysis(id))?;
        record.description = description.to_string();
        record.enabled = true;
        self.write_record(&record)?;
        self.record = Some(record);
        Ok(())
    }

    fn delete_analysis(&mut self, _id: AnalysisId) -> Result<(), StoreError> {
        self.writer = None;
        self.record = None;
        for path in [self.links_path(), self.analysis_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
        Ok(())
    }
}

/// In-memory store. `fail_on_batch` makes the n-th `create_links` call
/// (1-based) fail; `fail_on_enable` rejects `enable_analysis`.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    pub analyses: BTreeMap<AnalysisId, AnalysisRecord>,
    pub links: Vec<CoexpressionLink>,
    pub batch_sizes: Vec<usize>,
    pub fail_on_batch: Option<usize>,
    pub fail_on_enable: bool,
    next_id: u64,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_batch(batch: usize) -> Self {
        Self {
            fail_on_batch: Some(batch),
            ..Self::default()
        }
    }
}

impl LinkStore for MemoryLinkStore {
    fn create_analysis(&mut self, record: &AnalysisRecord) -> Result<AnalysisId, StoreError> {
        self.next_id += 1;
        let id = AnalysisId(self.next_id);
        self.analyses.insert(id, record.clone());
        Ok(id)
    }

    fn create_links(&mut self, batch: &[CoexpressionLink]) -> Result<usize, StoreError> {
        let n = self.batch_sizes.len() + 1;
        if self.fail_on_batch == Some(n) {
            return Err(StoreError::Rejected {
                batch: n,
                reason: "injected failure".to_string(),
            });
        }
        self.batch_sizes.push(batch.len());
        self.links.extend_from_slice(batch);
        Ok(batch.len())
    }

    fn enable_analysis(&mut self, id: AnalysisId, description: &str) -> Result<(), StoreError> {
        if self.fail_on_enable {
            return Err(StoreError::Rejected {
                batch: self.batch_sizes.len(),
                reason: "enable rejected".to_string(),
            });
        }
        let record = self
            .analyses
            .get_mut(&id)
            .ok_or(StoreError::UnknownAnalysis(id))?;
        record.description = description.to_string();
        record.enabled = true;
        Ok(())
    }

    fn delete_analysis(&mut self, id: AnalysisId) -> Result<(), StoreError> {
        self.analyses
            .remove(&id)
            .ok_or(StoreError::UnknownAnalysis(id))?;
        self.links.retain(|l| l.analysis != id);
        Ok(())
    }
}

pub struct LinkInput<'a> {
    pub stage2: &'a Stage2Output,
    pub targets: &'a BTreeSet<GeneId>,
    pub symbols: &'a BTreeMap<GeneId, String>,
    pub name: &'a str,
    pub config: &'a LinkAnalysisConfig,
}

#[derive(Debug)]
pub struct Stage3Output {
    pub analysis: AnalysisId,
    pub record: AnalysisRecord,
    pub links_stored: usize,
    pub positive_links: usize,
    pub negative_links: usize,
    pub node_degrees: Vec<NodeDegree>,
}

#[derive(Debug, Default)]
struct PersistTotals {
    links: usize,
    positive: usize,
    negative: usize,
    per_gene: BTreeMap<GeneId, usize>,
}

pub fn run_stage3(
    input: &LinkInput<'_>,
    store: &mut dyn LinkStore,
) -> Result<Stage3Output, StoreError> {
    let stringency = input.config.stringency;
    let n_experiments = input.stage2.ordering.len();
    let mut record = AnalysisRecord {
        name: input.name.to_string(),
        description: format!(
            "Coexpression analysis of {n_experiments} experiments; stringency={stringency}"
        ),
        stringency,
        n_experiments,
        n_genes: input.targets.len(),
        enabled: false,
    };

    info!(
        name = input.name,
        genes = input.targets.len(),
        experiments = n_experiments,
        stringency,
        both_ways = input.config.store_both_ways,
        "starting gene link analysis"
    );
    let analysis = store.create_analysis(&record)?;

    let stored = persist_links(input, analysis, store).and_then(|totals| {
        let description = format!("{}; {} gene pairs stored.", record.description, totals.links);
        store.enable_analysis(analysis, &description)?;
        Ok((totals, description))
    });
    let (totals, description) = match stored {
        Ok(stored) => stored,
        Err(err) => {
            error!(%err, "link persistence failed, removing analysis");
            if let Err(cleanup) = store.delete_analysis(analysis) {
                warn!(%cleanup, "could not remove partially stored analysis");
            }
            return Err(err);
        }
    };

    record.description = description;
    record.enabled = true;
    info!(links = totals.links, "gene pairs stored");

    let node_degrees = node_degrees(input.targets, &totals.per_gene, input.symbols);
    Ok(Stage3Output {
        analysis,
        record,
        links_stored: totals.links,
        positive_links: totals.positive,
        negative_links: totals.negative,
        node_degrees,
    })
}

fn persist_links(
    input: &LinkInput<'_>,
    analysis: AnalysisId,
    store: &mut dyn LinkStore,
) -> Result<PersistTotals, StoreError> {
    let ordering = &input.stage2.ordering;
    let batch_size = input.config.batch_size.max(1);
    let mut totals = PersistTotals::default();
    let mut processed: BTreeSet<GeneId> = BTreeSet::new();
    let mut batch: Vec<CoexpressionLink> = Vec::with_capacity(batch_size);

    for (done, &target) in input.targets.iter().enumerate() {
        let mut used = 0usize;
        for (candidate, ev) in candidate_evidence(input.stage2, target) {
            if !input.targets.contains(&candidate) {
                debug!(%target, %candidate, "candidate not among analyzed genes");
                continue;
            }
            if candidate == target {
                continue;
            }
            if !input.config.store_both_ways && processed.contains(&candidate) {
                continue;
            }

            let specificity = ev.specificity_bits(ordering);
            for sign in [LinkSign::Negative, LinkSign::Positive] {
                if ev.support(sign) < input.config.stringency {
                    continue;
                }
                batch.push(build_link(analysis, ev, sign, &specificity, ordering));
                match sign {
                    LinkSign::Positive => totals.positive += 1,
                    LinkSign::Negative => totals.negative += 1,
                }
                if batch.len() == batch_size {
                    used += store.create_links(&batch)?;
                    debug!(size = batch.len(), "flushed link batch");
                    batch.clear();
                }
            }
        }
        if !batch.is_empty() {
            used += store.create_links(&batch)?;
            batch.clear();
        }
        if used > 0 {
            debug!(gene = %target, links = used, "links stored");
        }
        totals.links += used;
        totals.per_gene.insert(target, used);
        processed.insert(target);
        if (done + 1) % 500 == 0 {
            info!(
                processed = done + 1,
                total = input.targets.len(),
                links = totals.links,
                "gene link progress"
            );
        }
    }
    Ok(totals)
}

fn candidate_evidence(
    stage2: &Stage2Output,
    target: GeneId,
) -> impl Iterator<Item = (GeneId, &GenePairEvidence)> {
    stage2
        .evidence
        .range((target, GeneId(0))..=(target, GeneId(u64::MAX)))
        .map(|((_, candidate), ev)| (*candidate, ev))
}

fn build_link(
    analysis: AnalysisId,
    ev: &GenePairEvidence,
    sign: LinkSign,
    specificity: &ExperimentBits,
    ordering: &ExperimentOrdering,
) -> CoexpressionLink {
    let measurements = ev.supporting_measurements(sign, ordering);
    debug_assert!(ev.support_bits(sign).is_subset_of(&ev.tested));
    let (effect, p_value) = match stats::fixed_effects(&measurements) {
        Some(meta) => {
            trace!(
                first = %ev.target,
                second = %ev.candidate,
                studies = meta.n_studies,
                "combined link effect"
            );
            (meta.effect, meta.p_value)
        }
        None => {
            // every supporting experiment is too small to weight
            let effect = mean_correlation(&measurements);
            let pooled: usize = measurements.iter().map(|(_, n)| n).sum();
            (effect, stats::correlation_pvalue(effect, pooled))
        }
    };
    CoexpressionLink {
        analysis,
        first_gene: ev.target,
        second_gene: ev.candidate,
        sign,
        effect,
        p_value,
        num_datasets: ev.support(sign),
        tested: ev.tested.clone(),
        supporting: ev.support_bits(sign).clone(),
        specificity: specificity.clone(),
    }
}

fn mean_correlation(measurements: &[(f64, usize)]) -> f64 {
    if measurements.is_empty() {
        return f64::NAN;
    }
    measurements.iter().map(|(r, _)| r).sum::<f64>() / measurements.len() as f64
}

/// Link counts per gene with their rank normalized into (0, 1].
pub fn node_degrees(
    genes: &BTreeSet<GeneId>,
    links_per_gene: &BTreeMap<GeneId, usize>,
    symbols: &BTreeMap<GeneId, String>,
) -> Vec<NodeDegree> {
    let counts: Vec<f64> = genes
        .iter()
        .map(|g| links_per_gene.get(g).copied().unwrap_or(0) as f64)
        .collect();
    let ranks = stats::average_ranks(&counts);
    let n = genes.len() as f64;
    genes
        .iter()
        .zip(counts.iter().zip(ranks))
        .map(|(gene, (count, rank))| NodeDegree {
            gene: *gene,
            symbol: symbols.get(gene).cloned().unwrap_or_default(),
            num_links: *count as usize,
            rank_num_links: rank / n,
        })
        .collect()
}

/// One qualifying gene pair, written instead of links in a dry run.
#[derive(Debug, Clone)]
pub struct PairSummary {
    pub target: GeneId,
    pub candidate: GeneId,
    pub positive: usize,
    pub negative: usize,
    pub tested: ExperimentBits,
}

pub fn dry_run_pairs(
    stage2: &Stage2Output,
    targets: &BTreeSet<GeneId>,
    config: &LinkAnalysisConfig,
) -> Vec<PairSummary> {
    let mut out = Vec::new();
    let mut processed: BTreeSet<GeneId> = BTreeSet::new();
    for &target in targets {
        for (candidate, ev) in candidate_evidence(stage2, target) {
            if candidate == target || !targets.contains(&candidate) {
                continue;
            }
            if !config.store_both_ways && processed.contains(&candidate) {
                continue;
            }
            let positive = ev.positive_support();
            let negative = ev.negative_support();
            if positive < config.stringency && negative < config.stringency {
                continue;
            }
            out.push(PairSummary {
                target,
                candidate,
                positive,
                negative,
                tested: ev.tested.clone(),
            });
        }
        processed.insert(target);
    }
    info!(pairs = out.len(), "dry run gene pairs");
    out
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_links.rs"]
mod tests;
