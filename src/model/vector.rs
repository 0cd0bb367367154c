use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::{ExperimentId, GeneId, ProbeId, VectorId};

#[derive(Debug, Clone)]
pub struct Experiment {
    pub id: ExperimentId,
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gene {
    pub id: GeneId,
    pub symbol: String,
}

/// One probe's measurements across the bioassays of one experiment.
/// Missing values are stored as `NaN`.
#[derive(Debug, Clone)]
pub struct ExpressionVector {
    pub id: VectorId,
    pub probe: ProbeId,
    pub experiment: ExperimentId,
    data: Vec<f64>,
    n_missing: usize,
}

impl ExpressionVector {
    pub fn new(id: VectorId, probe: ProbeId, experiment: ExperimentId, data: Vec<f64>) -> Self {
        let n_missing = data.iter().filter(|v| v.is_nan()).count();
        Self {
            id,
            probe,
            experiment,
            data,
            n_missing,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_missing(&self) -> bool {
        self.n_missing > 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProbeGeneMap {
    probe_to_genes: BTreeMap<ProbeId, BTreeSet<GeneId>>,
    symbols: BTreeMap<GeneId, String>,
}

impl ProbeGeneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, probe: ProbeId, gene: GeneId, symbol: &str) {
        self.probe_to_genes.entry(probe).or_default().insert(gene);
        let entry = self.symbols.entry(gene).or_default();
        if entry.is_empty() {
            *entry = symbol.to_string();
        }
    }

    pub fn genes_for(&self, probe: &ProbeId) -> Option<&BTreeSet<GeneId>> {
        self.probe_to_genes.get(probe)
    }

    /// A probe is specific when it maps to exactly one gene.
    pub fn is_specific(&self, probe: &ProbeId) -> bool {
        self.probe_to_genes
            .get(probe)
            .is_some_and(|genes| genes.len() == 1)
    }

    pub fn genes(&self) -> Vec<Gene> {
        self.symbols
            .iter()
            .map(|(id, symbol)| Gene {
                id: *id,
                symbol: symbol.clone(),
            })
            .collect()
    }

    pub fn n_probes(&self) -> usize {
        self.probe_to_genes.len()
    }

    pub fn n_genes(&self) -> usize {
        self.symbols.len()
    }
}
