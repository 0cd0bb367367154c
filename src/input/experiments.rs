use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::input::InputError;
use crate::input::open::{for_each_row, is_header};
use crate::model::ids::ExperimentId;
use crate::model::vector::Experiment;

#[derive(Debug, Clone)]
pub struct ExperimentEntry {
    pub experiment: Experiment,
    pub data_path: PathBuf,
}

/// Reads `id<TAB>short_name<TAB>path`; relative data paths resolve against
/// the directory holding the experiment list.
pub fn parse_experiments(path: &Path) -> Result<Vec<ExperimentEntry>, InputError> {
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut seen = BTreeSet::new();
    let mut entries = Vec::new();

    for_each_row(path, |line_no, cols| {
        if is_header(line_no, cols) {
            return Ok(());
        }
        if cols.len() < 3 {
            return Err(InputError::parse(path, line_no, "expected id, short name and path"));
        }
        let id = cols[0]
            .trim()
            .parse::<u64>()
            .map(ExperimentId)
            .map_err(|_| InputError::parse(path, line_no, format!("bad experiment id {:?}", cols[0])))?;
        if !seen.insert(id) {
            return Err(InputError::InvalidInput(format!(
                "experiment {id} listed twice in {}",
                path.display()
            )));
        }
        let data = PathBuf::from(cols[2].trim());
        let data_path = if data.is_absolute() { data } else { base.join(data) };
        entries.push(ExperimentEntry {
            experiment: Experiment {
                id,
                short_name: cols[1].trim().to_string(),
            },
            data_path,
        });
        Ok(())
    })?;

    Ok(entries)
}
