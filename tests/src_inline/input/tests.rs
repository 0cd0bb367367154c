use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::blat_hits::parse_blat_hits;
use super::experiments::parse_experiments;
use super::genes::parse_genes;
use super::probe_genes::parse_probe_genes;
use super::vectors::{parse_value, parse_vectors};
use super::*;
use crate::model::ids::{ExperimentId, GeneId, ProbeId, VectorId};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("gemma_coexpr_input_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    let mut f = BufWriter::new(File::create(path).unwrap());
    f.write_all(contents.as_bytes()).unwrap();
}

fn write_gz(path: &Path, contents: &str) {
    let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

#[test]
fn test_missing_values() {
    assert!(parse_value("").unwrap().is_nan());
    assert!(parse_value("NaN").unwrap().is_nan());
    assert!(parse_value("NA").unwrap().is_nan());
    assert_eq!(parse_value(" 1.5 "), Some(1.5));
    assert_eq!(parse_value("abc"), None);
    assert_eq!(parse_value("inf"), None);
    assert_eq!(parse_value("-Infinity"), None);
}

#[test]
fn test_vectors_plain_and_gz() {
    let dir = make_temp_dir();
    let plain = dir.join("e1.tsv");
    let gz = dir.join("e2.tsv.gz");
    write_file(&plain, "probe\ts1\ts2\ts3\np1\t1\t2\t3\np2\t\tNA\t4.5\n");
    write_gz(&gz, "probe\ts1\ts2\np9\t0.5\t-1\n");

    let mut next_id = 1;
    let v1 = parse_vectors(&plain, ExperimentId(1), &mut next_id).unwrap();
    let v2 = parse_vectors(&gz, ExperimentId(2), &mut next_id).unwrap();
    assert_eq!(v1.len(), 2);
    assert_eq!(v1[0].id, VectorId(1));
    assert_eq!(v1[1].id, VectorId(2));
    assert!(v1[1].has_missing());
    assert_eq!(v1[1].values().iter().filter(|v| v.is_nan()).count(), 2);
    assert_eq!(v2[0].id, VectorId(3));
    assert_eq!(v2[0].probe, ProbeId::from("p9"));
    assert_eq!(v2[0].values(), &[0.5, -1.0]);
    assert_eq!(next_id, 4);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_vector_row_width_checked() {
    let dir = make_temp_dir();
    let path = dir.join("bad.tsv");
    write_file(&path, "probe\ts1\ts2\np1\t1\n");
    let mut next_id = 1;
    let err = parse_vectors(&path, ExperimentId(1), &mut next_id).unwrap_err();
    assert!(matches!(err, InputError::Parse { line: 2, .. }));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_infinite_value_rejected_with_line() {
    let dir = make_temp_dir();
    let path = dir.join("inf.tsv");
    write_file(&path, "probe\ts1\ts2\np1\t1\t2\np2\tinf\t3\n");
    let mut next_id = 1;
    let err = parse_vectors(&path, ExperimentId(1), &mut next_id).unwrap_err();
    assert!(matches!(err, InputError::Parse { line: 3, .. }));
    assert!(err.to_string().contains("inf"));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_duplicate_probe_rows_skipped() {
    let dir = make_temp_dir();
    let path = dir.join("dup.tsv");
    write_file(&path, "probe\ts1\np1\t1\np1\t2\n");
    let mut next_id = 1;
    let v = parse_vectors(&path, ExperimentId(1), &mut next_id).unwrap();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].values(), &[1.0]);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_experiments_resolve_relative_paths() {
    let dir = make_temp_dir();
    let path = dir.join("experiments.tsv");
    write_file(
        &path,
        "id\tshort_name\tpath\n20\tGSE20\tdata/e20.tsv\n10\tGSE10\t/abs/e10.tsv\n",
    );
    let entries = parse_experiments(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].experiment.id, ExperimentId(20));
    assert_eq!(entries[0].experiment.short_name, "GSE20");
    assert_eq!(entries[0].data_path, dir.join("data/e20.tsv"));
    assert_eq!(entries[1].data_path, PathBuf::from("/abs/e10.tsv"));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_duplicate_experiment_rejected() {
    let dir = make_temp_dir();
    let path = dir.join("experiments.tsv");
    write_file(&path, "1\tA\ta.tsv\n1\tB\tb.tsv\n");
    assert!(matches!(
        parse_experiments(&path),
        Err(InputError::InvalidInput(_))
    ));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_probe_genes_specificity() {
    let dir = make_temp_dir();
    let path = dir.join("probe_genes.tsv");
    write_file(
        &path,
        "probe\tgene\tsymbol\np1\t1\tTP53\np2\t2\tMDM2\np2\t3\tMDM4\n",
    );
    let map = parse_probe_genes(&path).unwrap();
    assert_eq!(map.n_probes(), 2);
    assert_eq!(map.n_genes(), 3);
    assert!(map.is_specific(&ProbeId::from("p1")));
    assert!(!map.is_specific(&ProbeId::from("p2")));
    assert!(
        map.genes()
            .iter()
            .any(|g| g.id == GeneId(3) && g.symbol == "MDM4")
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_genes_sorted_and_deduplicated() {
    let dir = make_temp_dir();
    let path = dir.join("genes.tsv");
    write_file(&path, "5\tE\n2\n5\tE\n");
    let genes = parse_genes(&path).unwrap();
    assert_eq!(genes.len(), 2);
    assert_eq!(genes[0].id, GeneId(2));
    assert_eq!(genes[0].symbol, "");
    assert_eq!(genes[1].symbol, "E");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_blat_hits_parsing() {
    let dir = make_temp_dir();
    let path = dir.join("hits.tsv.gz");
    write_gz(
        &path,
        "query\tqlen\tmatches\tmis\trep\tqgap\ttgap\tqs\tqe\tchrom\tts\tte\tstrand\tproduct\tgene\tsymbol\toverlap\trepeat\n\
         p1\t25\t24\t1\t0\t0\t0\t0\t25\tchr1\t100\t125\t+\tNM_1\t7\tTP53\t25\t0.1\n\
         p1\t25\t25\t0\t0\t0\t0\t0\t25\tchr2\t500\t525\t-\t\t\t\t0\n",
    );
    let hits = parse_blat_hits(&path).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].result.matches, 24);
    assert_eq!(hits[0].result.repeat_fraction, Some(0.1));
    let product = hits[0].product.as_ref().unwrap();
    assert_eq!(product.gene, GeneId(7));
    assert_eq!(product.gene_symbol, "TP53");
    assert!(hits[1].product.is_none());
    assert_eq!(hits[1].result.strand, '-');
    assert_eq!(hits[1].result.repeat_fraction, None);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_blat_hits_bad_strand() {
    let dir = make_temp_dir();
    let path = dir.join("hits.tsv");
    write_file(
        &path,
        "p1\t25\t25\t0\t0\t0\t0\t0\t25\tchr1\t100\t125\t*\tNM_1\t7\tTP53\t25\n",
    );
    let err = parse_blat_hits(&path).unwrap_err();
    assert!(matches!(err, InputError::Parse { line: 1, .. }));
    assert!(err.to_string().contains("strand"));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_load_link_inputs() {
    let dir = make_temp_dir();
    write_file(&dir.join("experiments.tsv"), "1\tGSE1\te1.tsv\n2\tGSE2\te2.tsv.gz\n");
    write_file(&dir.join("e1.tsv"), "probe\ta\tb\np1\t1\t2\np2\t3\t4\n");
    write_gz(&dir.join("e2.tsv.gz"), "probe\ta\np1\t5\n");
    write_file(&dir.join("probe_genes.tsv"), "p1\t1\tA\np2\t2\tB\n");
    let bundle =
        load_link_inputs(&dir.join("experiments.tsv"), &dir.join("probe_genes.tsv"), None).unwrap();
    assert_eq!(bundle.experiments.len(), 2);
    assert_eq!(bundle.vectors.len(), 3);
    assert_eq!(bundle.vectors[2].experiment, ExperimentId(2));
    assert!(bundle.genes.is_none());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_file_reported() {
    let dir = make_temp_dir();
    let err = load_link_inputs(&dir.join("nope.tsv"), &dir.join("nope2.tsv"), None).unwrap_err();
    assert!(matches!(err, InputError::MissingInput(_)));
    let _ = fs::remove_dir_all(&dir);
}
