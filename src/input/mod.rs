use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

pub mod blat_hits;
pub mod experiments;
pub mod genes;
pub mod open;
pub mod probe_genes;
pub mod vectors;

use experiments::parse_experiments;
use genes::parse_genes;
use probe_genes::parse_probe_genes;
use vectors::parse_vectors;

use crate::model::vector::{Experiment, ExpressionVector, Gene, ProbeGeneMap};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing input: {0}")]
    MissingInput(String),
    #[error("{}:{line}: {message}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl InputError {
    pub fn parse(file: &Path, line: usize, message: impl Into<String>) -> Self {
        InputError::Parse {
            file: file.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

/// Everything a link analysis reads from disk.
#[derive(Debug, Clone)]
pub struct LinkInputBundle {
    pub experiments: Vec<Experiment>,
    pub vectors: Vec<ExpressionVector>,
    pub probe_genes: ProbeGeneMap,
    /// Restriction from `--genes`; `None` analyzes every mapped gene.
    pub genes: Option<Vec<Gene>>,
}

pub fn load_link_inputs(
    experiments_path: &Path,
    probe_genes_path: &Path,
    genes_path: Option<&Path>,
) -> Result<LinkInputBundle, InputError> {
    let entries = parse_experiments(experiments_path)?;
    if entries.is_empty() {
        return Err(InputError::InvalidInput(format!(
            "no experiments listed in {}",
            experiments_path.display()
        )));
    }

    let mut vectors = Vec::new();
    let mut next_id = 1u64;
    for entry in &entries {
        let loaded = parse_vectors(&entry.data_path, entry.experiment.id, &mut next_id)?;
        debug!(
            experiment = %entry.experiment.short_name,
            vectors = loaded.len(),
            "loaded expression vectors"
        );
        vectors.extend(loaded);
    }

    let probe_genes = parse_probe_genes(probe_genes_path)?;
    let genes = match genes_path {
        Some(path) => Some(parse_genes(path)?),
        None => None,
    };

    info!(
        experiments = entries.len(),
        vectors = vectors.len(),
        probes = probe_genes.n_probes(),
        genes = probe_genes.n_genes(),
        restricted = genes.as_ref().map_or(0, |g| g.len()),
        "inputs loaded"
    );

    Ok(LinkInputBundle {
        experiments: entries.into_iter().map(|e| e.experiment).collect(),
        vectors,
        probe_genes,
        genes,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tests.rs"]
mod tests;
