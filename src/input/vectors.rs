use std::collections::HashSet;
use std::path::Path;

use tracing::warn;

use crate::input::InputError;
use crate::input::open::for_each_row;
use crate::model::ids::{ExperimentId, ProbeId, VectorId};
use crate::model::vector::ExpressionVector;

/// Empty cells, `NaN` and `NA` are missing values. Infinities are rejected.
pub fn parse_value(raw: &str) -> Option<f64> {
    let v = raw.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("nan") || v.eq_ignore_ascii_case("na") {
        return Some(f64::NAN);
    }
    v.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Reads one experiment's data file: a `probe<TAB>sample…` header, then one
/// row per probe. Vector ids are assigned from `next_id` in file order.
pub fn parse_vectors(
    path: &Path,
    experiment: ExperimentId,
    next_id: &mut u64,
) -> Result<Vec<ExpressionVector>, InputError> {
    let mut n_samples: Option<usize> = None;
    let mut seen: HashSet<String> = HashSet::new();
    let mut vectors = Vec::new();

    for_each_row(path, |line_no, cols| {
        let Some(expected) = n_samples else {
            if cols.len() < 2 {
                return Err(InputError::parse(path, line_no, "header names no samples"));
            }
            n_samples = Some(cols.len() - 1);
            return Ok(());
        };
        if cols.len() != expected + 1 {
            return Err(InputError::parse(
                path,
                line_no,
                format!("expected {} values, found {}", expected, cols.len() - 1),
            ));
        }
        let probe = cols[0].trim();
        if !seen.insert(probe.to_string()) {
            warn!(probe, file = %path.display(), "duplicate probe row skipped");
            return Ok(());
        }
        let mut data = Vec::with_capacity(expected);
        for raw in &cols[1..] {
            let value = parse_value(raw).ok_or_else(|| {
                InputError::parse(path, line_no, format!("bad expression value {raw:?}"))
            })?;
            data.push(value);
        }
        vectors.push(ExpressionVector::new(
            VectorId(*next_id),
            ProbeId::from(probe),
            experiment,
            data,
        ));
        *next_id += 1;
        Ok(())
    })?;

    if n_samples.is_none() {
        return Err(InputError::InvalidInput(format!(
            "data file {} is empty",
            path.display()
        )));
    }
    Ok(vectors)
}
