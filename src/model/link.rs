use serde::Serialize;

use crate::model::bitvec::ExperimentBits;
use crate::model::evidence::LinkSign;
use crate::model::ids::{AnalysisId, GeneId};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub name: String,
    pub description: String,
    pub stringency: usize,
    pub n_experiments: usize,
    pub n_genes: usize,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct CoexpressionLink {
    pub analysis: AnalysisId,
    pub first_gene: GeneId,
    pub second_gene: GeneId,
    pub sign: LinkSign,
    pub effect: f64,
    pub p_value: f64,
    pub num_datasets: usize,
    pub tested: ExperimentBits,
    pub supporting: ExperimentBits,
    pub specificity: ExperimentBits,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeDegree {
    pub gene: GeneId,
    pub symbol: String,
    pub num_links: usize,
    pub rank_num_links: f64,
}
