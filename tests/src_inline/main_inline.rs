use super::*;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::model::ids::ProbeId;
use crate::model::vector::{Gene, ProbeGeneMap};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("gemma_coexpr_main_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn links_args(extra: &[&str]) -> LinksArgs {
    let mut argv = vec![
        "gemma-coexpr",
        "links",
        "--experiments",
        "e.tsv",
        "--probe-genes",
        "p.tsv",
        "--out",
        "out",
    ];
    argv.extend_from_slice(extra);
    match Cli::try_parse_from(argv).unwrap().command {
        Command::Links(args) => args,
        other => panic!("unexpected command {other:?}"),
    }
}

fn bundle(genes: Option<Vec<Gene>>) -> LinkInputBundle {
    let mut map = ProbeGeneMap::new();
    map.insert(ProbeId::from("p1"), GeneId(1), "TP53");
    map.insert(ProbeId::from("p2"), GeneId(2), "MDM2");
    map.insert(ProbeId::from("p3"), GeneId(3), "");
    LinkInputBundle {
        experiments: Vec::new(),
        vectors: Vec::new(),
        probe_genes: map,
        genes,
    }
}

#[test]
fn test_links_defaults() {
    let args = links_args(&[]);
    assert_eq!(args.name, "coexpression");
    assert!(!args.dry_run);
    let config = link_config(&args).unwrap();
    assert_eq!(config, LinkAnalysisConfig::default());
}

#[test]
fn test_links_flags_override_config() {
    let dir = make_temp_dir();
    let path = dir.join("config.json");
    fs::write(&path, r#"{"stringency": 4, "batch_size": 10}"#).unwrap();
    let path_str = path.to_str().unwrap().to_string();

    let args = links_args(&["--config", &path_str]);
    let config = link_config(&args).unwrap();
    assert_eq!(config.stringency, 4);
    assert_eq!(config.batch_size, 10);

    let args = links_args(&["--config", &path_str, "--stringency", "3", "--single-direction"]);
    let config = link_config(&args).unwrap();
    assert_eq!(config.stringency, 3);
    assert_eq!(config.batch_size, 10);
    assert!(!config.store_both_ways);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_invalid_stringency_rejected() {
    let args = links_args(&["--stringency", "0"]);
    assert!(matches!(
        link_config(&args),
        Err(ConfigError::Invalid {
            key: "stringency",
            ..
        })
    ));
}

#[test]
fn test_blat_args_and_verbosity() {
    let cli = Cli::try_parse_from([
        "gemma-coexpr",
        "-vv",
        "blat",
        "--hits",
        "h.tsv",
        "--out",
        "out",
        "--keep-non-canonical",
    ])
    .unwrap();
    assert_eq!(cli.verbose, 2);
    let Command::Blat(args) = cli.command else {
        panic!("expected blat command");
    };
    let config = blat_config(&args).unwrap();
    assert!(!config.trim_non_canonical_chromosome_hits);
}

#[test]
fn test_missing_required_argument() {
    assert!(Cli::try_parse_from(["gemma-coexpr", "links", "--out", "x"]).is_err());
}

#[test]
fn test_analyzed_genes_all_mapped() {
    let (genes, symbols) = analyzed_genes(&bundle(None));
    assert_eq!(genes.len(), 3);
    assert_eq!(symbols[&GeneId(1)], "TP53");
}

#[test]
fn test_analyzed_genes_restricted() {
    let restricted = vec![
        Gene {
            id: GeneId(2),
            symbol: String::new(),
        },
        Gene {
            id: GeneId(3),
            symbol: "CDKN1A".to_string(),
        },
        Gene {
            id: GeneId(9),
            symbol: "NOPE".to_string(),
        },
    ];
    let (genes, symbols) = analyzed_genes(&bundle(Some(restricted)));
    assert_eq!(genes.into_iter().collect::<Vec<_>>(), vec![GeneId(2), GeneId(3)]);
    assert_eq!(symbols[&GeneId(2)], "MDM2");
    assert_eq!(symbols[&GeneId(3)], "CDKN1A");
    assert!(!symbols.contains_key(&GeneId(1)));
}

#[test]
fn test_resolve_gene_by_symbol() {
    let (genes, symbols) = analyzed_genes(&bundle(None));
    assert_eq!(resolve_gene("tp53", &genes, &symbols).unwrap(), GeneId(1));
    assert!(matches!(
        resolve_gene("BRCA1", &genes, &symbols),
        Err(AppError::Usage(_))
    ));
}
