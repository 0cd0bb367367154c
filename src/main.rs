mod input;
mod logging;
mod model;
mod pipeline;
mod report;
mod simd;
mod stats;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::input::blat_hits::parse_blat_hits;
use crate::input::{InputError, LinkInputBundle, load_link_inputs};
use crate::model::ids::GeneId;
use crate::model::thresholds::{ConfigError, LinkAnalysisConfig, ProbeMapperConfig, load_json};
use crate::pipeline::stage2_aggregate::{
    AggregationInput, correlation_matrix, matrix_effect_sizes, run_stage2,
};
use crate::pipeline::stage3_links::{
    LinkInput, StoreError, TsvLinkStore, dry_run_pairs, run_stage3,
};
use crate::pipeline::stage4_blat::{BlatError, run_stage4};
use crate::pipeline::stage5_report::{LinkReportInput, write_blat_reports, write_link_reports};

#[derive(Debug, Parser)]
#[command(name = "gemma-coexpr")]
#[command(version)]
#[command(about = "Gene coexpression link analysis and BLAT probe-to-gene association scoring")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Correlate expression profiles across experiments and store gene links.
    Links(LinksArgs),
    /// Score BLAT alignments against the gene products they overlap.
    Blat(BlatArgs),
}

#[derive(Debug, Args)]
struct LinksArgs {
    #[arg(long, value_name = "FILE", help_heading = "Input")]
    experiments: PathBuf,

    #[arg(long = "probe-genes", value_name = "FILE", help_heading = "Input")]
    probe_genes: PathBuf,

    /// Restrict the analysis to these genes.
    #[arg(long, value_name = "FILE", help_heading = "Input")]
    genes: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help_heading = "Output")]
    out: PathBuf,

    #[arg(long, default_value = "coexpression", help_heading = "Output")]
    name: String,

    /// Also write the per-experiment correlation matrix for this gene.
    #[arg(long = "matrix-gene", value_name = "SYMBOL", help_heading = "Output")]
    matrix_gene: Option<String>,

    #[arg(long, value_name = "N", help_heading = "Analysis")]
    stringency: Option<usize>,

    #[arg(long, value_name = "FILE", help_heading = "Analysis")]
    config: Option<PathBuf>,

    /// Store each gene pair once instead of in both directions.
    #[arg(long = "single-direction", help_heading = "Analysis")]
    single_direction: bool,

    /// Report qualifying pairs in pairs.tsv without storing links.
    #[arg(long = "dry-run", help_heading = "Analysis")]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct BlatArgs {
    #[arg(long, value_name = "FILE")]
    hits: PathBuf,

    #[arg(long, value_name = "DIR")]
    out: PathBuf,

    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep hits on alternate haplotypes and unplaced contigs.
    #[arg(long = "keep-non-canonical")]
    keep_non_canonical: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Blat(#[from] BlatError),
    #[error("failed to write reports: {0}")]
    Report(#[from] std::io::Error),
    #[error("{0}")]
    Usage(String),
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        simd = simd::backend_name(),
        "gemma-coexpr starting"
    );
    if let Err(err) = run(cli.command) {
        error!("{err}");
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            error!("caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Links(args) => run_links(&args),
        Command::Blat(args) => run_blat(&args),
    }
}

fn run_links(args: &LinksArgs) -> Result<(), AppError> {
    let config = link_config(args)?;
    let bundle = load_link_inputs(&args.experiments, &args.probe_genes, args.genes.as_deref())?;
    let (genes, symbols) = analyzed_genes(&bundle);
    if genes.is_empty() {
        return Err(AppError::Usage("no genes to analyze".to_string()));
    }
    let matrix_gene = match &args.matrix_gene {
        Some(symbol) => Some(resolve_gene(symbol, &genes, &symbols)?),
        None => None,
    };

    let stage2 = run_stage2(&AggregationInput {
        experiments: &bundle.experiments,
        vectors: &bundle.vectors,
        probe_genes: &bundle.probe_genes,
        targets: &genes,
        candidates: &genes,
        config: &config,
    });

    let (matrix, matrix_effects) = match matrix_gene {
        Some(gene) => {
            let query: BTreeSet<GeneId> = [gene].into_iter().collect();
            (
                Some(correlation_matrix(
                    &stage2,
                    gene,
                    &genes,
                    &genes,
                    config.presence_fraction,
                )),
                matrix_effect_sizes(&stage2, &query, &genes),
            )
        }
        None => (None, BTreeMap::new()),
    };

    let (stage3, pairs) = if args.dry_run {
        (None, Some(dry_run_pairs(&stage2, &genes, &config)))
    } else {
        let mut store = TsvLinkStore::new(&args.out);
        let stage3 = run_stage3(
            &LinkInput {
                stage2: &stage2,
                targets: &genes,
                symbols: &symbols,
                name: &args.name,
                config: &config,
            },
            &mut store,
        )?;
        (Some(stage3), None)
    };

    write_link_reports(
        &LinkReportInput {
            name: &args.name,
            experiments: &bundle.experiments,
            n_vectors: bundle.vectors.len(),
            targets: &genes,
            symbols: &symbols,
            config: &config,
            stage2: &stage2,
            stage3: stage3.as_ref(),
            pairs: pairs.as_deref(),
            matrix: matrix.as_ref(),
            matrix_effects: &matrix_effects,
        },
        &args.out,
    )?;
    Ok(())
}

fn run_blat(args: &BlatArgs) -> Result<(), AppError> {
    let config = blat_config(args)?;
    let hits = parse_blat_hits(&args.hits)?;
    info!(rows = hits.len(), "BLAT hits loaded");
    let output = run_stage4(hits, &config)?;
    write_blat_reports(&output, &config, &args.out)?;
    Ok(())
}

/// Defaults, then the JSON file, then command-line flags.
fn link_config(args: &LinksArgs) -> Result<LinkAnalysisConfig, ConfigError> {
    let mut config = load_or_default::<LinkAnalysisConfig>(args.config.as_deref())?;
    if let Some(stringency) = args.stringency {
        config.stringency = stringency;
    }
    if args.single_direction {
        config.store_both_ways = false;
    }
    config.validate()?;
    Ok(config)
}

fn blat_config(args: &BlatArgs) -> Result<ProbeMapperConfig, ConfigError> {
    let mut config = load_or_default::<ProbeMapperConfig>(args.config.as_deref())?;
    if args.keep_non_canonical {
        config.trim_non_canonical_chromosome_hits = false;
    }
    config.validate()?;
    Ok(config)
}

fn load_or_default<T>(path: Option<&Path>) -> Result<T, ConfigError>
where
    T: Default + for<'de> serde::Deserialize<'de>,
{
    match path {
        Some(path) => load_json(path),
        None => Ok(T::default()),
    }
}

/// Genes to analyze and their display symbols. Symbols from `--genes`
/// win over the probe mapping; unmapped restricted genes are dropped.
fn analyzed_genes(bundle: &LinkInputBundle) -> (BTreeSet<GeneId>, BTreeMap<GeneId, String>) {
    let mut symbols: BTreeMap<GeneId, String> = bundle
        .probe_genes
        .genes()
        .into_iter()
        .map(|g| (g.id, g.symbol))
        .collect();
    let genes = match &bundle.genes {
        None => symbols.keys().copied().collect(),
        Some(restricted) => {
            let mut genes = BTreeSet::new();
            for g in restricted {
                if !symbols.contains_key(&g.id) {
                    warn!(gene = %g.id, "gene has no mapped probes, skipped");
                    continue;
                }
                if !g.symbol.is_empty() {
                    symbols.insert(g.id, g.symbol.clone());
                }
                genes.insert(g.id);
            }
            genes
        }
    };
    symbols.retain(|id, _| genes.contains(id));
    (genes, symbols)
}

fn resolve_gene(
    symbol: &str,
    genes: &BTreeSet<GeneId>,
    symbols: &BTreeMap<GeneId, String>,
) -> Result<GeneId, AppError> {
    let mut found = symbols
        .iter()
        .filter(|(id, s)| genes.contains(*id) && s.eq_ignore_ascii_case(symbol))
        .map(|(id, _)| *id);
    match (found.next(), found.next()) {
        (Some(id), None) => Ok(id),
        (Some(_), Some(_)) => Err(AppError::Usage(format!(
            "gene symbol {symbol} is ambiguous"
        ))),
        (None, _) => Err(AppError::Usage(format!(
            "gene {symbol} is not among the analyzed genes"
        ))),
    }
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;
