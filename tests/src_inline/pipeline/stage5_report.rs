use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::model::bitvec::ExperimentOrdering;
use crate::model::blat::{BlatHit, BlatResult, GeneProductHit};
use crate::model::evidence::GenePairEvidence;
use crate::pipeline::stage3_links::{LinkInput, MemoryLinkStore, dry_run_pairs, run_stage3};
use crate::pipeline::stage4_blat::run_stage4;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!(
        "gemma_coexpr_stage5_{}_{}",
        std::process::id(),
        id
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn experiments() -> Vec<Experiment> {
    vec![
        Experiment {
            id: ExperimentId(1),
            short_name: "GSE1".to_string(),
        },
        Experiment {
            id: ExperimentId(2),
            short_name: "GSE2".to_string(),
        },
    ]
}

fn stage2() -> Stage2Output {
    let ordering = ExperimentOrdering::new([ExperimentId(1), ExperimentId(2)]);
    let mut evidence = BTreeMap::new();
    for (t, c) in [(1u64, 2u64), (2, 1)] {
        let mut ev = GenePairEvidence::new(GeneId(t), GeneId(c), &ordering);
        ev.tested.set(0);
        ev.tested.set(1);
        ev.positive.set(0);
        ev.positive.set(1);
        evidence.insert((GeneId(t), GeneId(c)), ev);
    }
    Stage2Output {
        sample_sizes: [(ExperimentId(1), 8), (ExperimentId(2), 8)].into_iter().collect(),
        ordering,
        evidence,
        n_correlations: 4,
        n_defined: 4,
    }
}

fn symbols() -> BTreeMap<GeneId, String> {
    [(GeneId(1), "A".to_string()), (GeneId(2), "B".to_string())]
        .into_iter()
        .collect()
}

#[test]
fn test_link_reports_written() {
    let dir = make_temp_dir();
    let s2 = stage2();
    let targets: BTreeSet<GeneId> = [GeneId(1), GeneId(2)].into_iter().collect();
    let symbols = symbols();
    let config = LinkAnalysisConfig::default();
    let mut store = MemoryLinkStore::new();
    let s3 = run_stage3(
        &LinkInput {
            stage2: &s2,
            targets: &targets,
            symbols: &symbols,
            name: "run",
            config: &config,
        },
        &mut store,
    )
    .unwrap();
    let matrix = CorrelationMatrix {
        query: GeneId(1),
        columns: vec![GeneId(2)],
        rows: vec![(ExperimentId(1), vec![0.75]), (ExperimentId(2), vec![f64::NAN])],
    };
    let effects: BTreeMap<GeneId, f64> = [(GeneId(1), 0.6), (GeneId(2), f64::NAN)]
        .into_iter()
        .collect();
    let exps = experiments();
    let input = LinkReportInput {
        name: "run",
        experiments: &exps,
        n_vectors: 4,
        targets: &targets,
        symbols: &symbols,
        config: &config,
        stage2: &s2,
        stage3: Some(&s3),
        pairs: None,
        matrix: Some(&matrix),
        matrix_effects: &effects,
    };
    write_link_reports(&input, &dir).unwrap();

    let degrees = fs::read_to_string(dir.join(NODE_DEGREE_FILE)).unwrap();
    assert_eq!(degrees.lines().count(), 3);
    assert!(degrees.lines().nth(1).unwrap().starts_with("1\tA\t1\t"));

    let matrix = fs::read_to_string(dir.join(MATRIX_FILE)).unwrap();
    assert_eq!(matrix, "Experiments\tA_B\nGSE1\t0.75\nGSE2\t\n");
    assert!(!dir.join(PAIRS_FILE).exists());

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join(SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary["links_stored"], 2);
    assert_eq!(summary["dry_run"], false);
    assert_eq!(summary["n_gene_pairs"], 2);
    assert_eq!(summary["matrix_effects"][0]["gene"], "A");
    assert!(summary["matrix_effects"][1]["effect"].is_null());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_dry_run_summary_and_pairs() {
    let dir = make_temp_dir();
    let s2 = stage2();
    let targets: BTreeSet<GeneId> = [GeneId(1), GeneId(2)].into_iter().collect();
    let symbols = symbols();
    let config = LinkAnalysisConfig::default();
    let pairs = dry_run_pairs(&s2, &targets, &config);
    let effects = BTreeMap::new();
    let exps = experiments();
    let input = LinkReportInput {
        name: "dry",
        experiments: &exps,
        n_vectors: 4,
        targets: &targets,
        symbols: &symbols,
        config: &config,
        stage2: &s2,
        stage3: None,
        pairs: Some(&pairs),
        matrix: None,
        matrix_effects: &effects,
    };
    let summary = build_link_summary(&input);
    assert!(summary.dry_run);
    assert_eq!(summary.links_stored, 0);
    assert!(summary.description.starts_with("Dry run over 2 experiments"));

    write_link_reports(&input, &dir).unwrap();
    let pairs = fs::read_to_string(dir.join(PAIRS_FILE)).unwrap();
    assert_eq!(pairs.lines().count(), 3);
    assert_eq!(pairs.lines().nth(1), Some("1\t2\t2\t0\t11"));
    assert!(!dir.join(NODE_DEGREE_FILE).exists());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_blat_reports_written() {
    let dir = make_temp_dir();
    let hit = BlatHit {
        result: BlatResult {
            query: "probe1".to_string(),
            query_length: 25,
            matches: 25,
            mismatches: 0,
            rep_matches: 0,
            q_gap_count: 0,
            t_gap_count: 0,
            q_start: 0,
            q_end: 25,
            target_chromosome: "chr1".to_string(),
            t_start: 10,
            t_end: 35,
            strand: '+',
            repeat_fraction: None,
        },
        product: Some(GeneProductHit {
            gene_product: "NM_1".to_string(),
            gene: GeneId(1),
            gene_symbol: "A".to_string(),
            overlap: 25,
        }),
    };
    let config = ProbeMapperConfig::default();
    let out = run_stage4(vec![hit], &config).unwrap();
    write_blat_reports(&out, &config, &dir).unwrap();

    let assoc = fs::read_to_string(dir.join(ASSOCIATIONS_FILE)).unwrap();
    assert_eq!(assoc.lines().count(), 2);
    assert!(assoc.lines().nth(1).unwrap().ends_with("\ttrue"));
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join(BLAT_SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary["stats"]["mapped"], 1);
    let _ = fs::remove_dir_all(&dir);
}
