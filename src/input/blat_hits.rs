use std::path::Path;
use std::str::FromStr;

use crate::input::InputError;
use crate::input::open::for_each_row;
use crate::model::blat::{BlatHit, BlatResult, GeneProductHit};
use crate::model::ids::GeneId;

const MIN_COLUMNS: usize = 17;

/// Reads BLAT hits, one row per (alignment, gene product):
///
/// `query, query_length, matches, mismatches, rep_matches, q_gap_count,
/// t_gap_count, q_start, q_end, chromosome, t_start, t_end, strand,
/// gene_product, gene_id, gene_symbol, overlap[, repeat_fraction]`
///
/// An empty gene product marks an alignment outside any transcript. A first
/// line starting with `query` is a header.
pub fn parse_blat_hits(path: &Path) -> Result<Vec<BlatHit>, InputError> {
    let mut hits = Vec::new();
    for_each_row(path, |line_no, cols| {
        if line_no == 1 && cols[0].trim().eq_ignore_ascii_case("query") {
            return Ok(());
        }
        if cols.len() < MIN_COLUMNS {
            return Err(InputError::parse(
                path,
                line_no,
                format!("expected at least {MIN_COLUMNS} columns, found {}", cols.len()),
            ));
        }
        let field = |i: usize, name: &str| -> Result<String, InputError> {
            let v = cols[i].trim();
            if v.is_empty() {
                Err(InputError::parse(path, line_no, format!("empty {name}")))
            } else {
                Ok(v.to_string())
            }
        };
        let number = |i: usize, name: &str| parse_num(cols[i], path, line_no, name);

        let strand = match field(12, "strand")?.as_str() {
            "+" => '+',
            "-" => '-',
            other => {
                return Err(InputError::parse(path, line_no, format!("bad strand {other:?}")));
            }
        };
        let repeat_fraction = match cols.get(17).map(|s| s.trim()) {
            None | Some("") => None,
            Some(raw) => Some(parse_num::<f64>(raw, path, line_no, "repeat_fraction")?),
        };
        let result = BlatResult {
            query: field(0, "query")?,
            query_length: number(1, "query_length")?,
            matches: number(2, "matches")?,
            mismatches: number(3, "mismatches")?,
            rep_matches: number(4, "rep_matches")?,
            q_gap_count: number(5, "q_gap_count")?,
            t_gap_count: number(6, "t_gap_count")?,
            q_start: number(7, "q_start")?,
            q_end: number(8, "q_end")?,
            target_chromosome: field(9, "chromosome")?,
            t_start: parse_num(cols[10], path, line_no, "t_start")?,
            t_end: parse_num(cols[11], path, line_no, "t_end")?,
            strand,
            repeat_fraction,
        };
        if result.q_end < result.q_start || result.t_end < result.t_start {
            return Err(InputError::parse(path, line_no, "alignment ends before it starts"));
        }

        let gene_product = cols[13].trim();
        let product = if gene_product.is_empty() {
            None
        } else {
            Some(GeneProductHit {
                gene_product: gene_product.to_string(),
                gene: GeneId(parse_num(cols[14], path, line_no, "gene_id")?),
                gene_symbol: cols[15].trim().to_string(),
                overlap: number(16, "overlap")?,
            })
        };
        hits.push(BlatHit { result, product });
        Ok(())
    })?;
    Ok(hits)
}

fn parse_num<T: FromStr>(
    raw: &str,
    path: &Path,
    line_no: usize,
    name: &str,
) -> Result<T, InputError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| InputError::parse(path, line_no, format!("bad {name} {raw:?}")))
}
