use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::bitvec::{ExperimentBits, ExperimentOrdering};
use crate::model::ids::{ExperimentId, GeneId, ProbeId, VectorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkSign {
    Positive,
    Negative,
}

impl LinkSign {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkSign::Positive => "positive",
            LinkSign::Negative => "negative",
        }
    }
}

/// The representative (median) probe pair for one gene pair in one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentMeasurement {
    pub correlation: f64,
    pub n_samples: usize,
    pub target_vector: VectorId,
    pub candidate_vector: VectorId,
    pub target_probe: ProbeId,
    pub candidate_probe: ProbeId,
    pub n_combinations: usize,
}

#[derive(Debug, Clone)]
pub struct GenePairEvidence {
    pub target: GeneId,
    pub candidate: GeneId,
    pub measurements: BTreeMap<ExperimentId, ExperimentMeasurement>,
    pub tested: ExperimentBits,
    pub positive: ExperimentBits,
    pub negative: ExperimentBits,
    pub nonspecific: BTreeSet<ExperimentId>,
}

impl GenePairEvidence {
    pub fn new(target: GeneId, candidate: GeneId, ordering: &ExperimentOrdering) -> Self {
        Self {
            target,
            candidate,
            measurements: BTreeMap::new(),
            tested: ordering.empty_bits(),
            positive: ordering.empty_bits(),
            negative: ordering.empty_bits(),
            nonspecific: BTreeSet::new(),
        }
    }

    pub fn positive_support(&self) -> usize {
        self.positive.count_ones()
    }

    pub fn negative_support(&self) -> usize {
        self.negative.count_ones()
    }

    pub fn support(&self, sign: LinkSign) -> usize {
        self.support_bits(sign).count_ones()
    }

    pub fn support_bits(&self, sign: LinkSign) -> &ExperimentBits {
        match sign {
            LinkSign::Positive => &self.positive,
            LinkSign::Negative => &self.negative,
        }
    }

    pub fn supporting_experiments(
        &self,
        sign: LinkSign,
        ordering: &ExperimentOrdering,
    ) -> Vec<ExperimentId> {
        ordering.decode(self.support_bits(sign))
    }

    /// `(correlation, paired sample count)` of each supporting experiment.
    pub fn supporting_measurements(
        &self,
        sign: LinkSign,
        ordering: &ExperimentOrdering,
    ) -> Vec<(f64, usize)> {
        self.supporting_experiments(sign, ordering)
            .into_iter()
            .filter_map(|ee| self.measurements.get(&ee))
            .map(|m| (m.correlation, m.n_samples))
            .collect()
    }

    /// Every experiment bit set except the experiments whose representative
    /// probes hybridize to more than one gene.
    pub fn specificity_bits(&self, ordering: &ExperimentOrdering) -> ExperimentBits {
        let specific = ordering
            .ids()
            .iter()
            .copied()
            .filter(|ee| !self.nonspecific.contains(ee));
        ordering.encode(specific).0
    }
}
