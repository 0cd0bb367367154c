use std::path::Path;

use crate::input::InputError;
use crate::input::open::for_each_row;
use crate::model::ids::{GeneId, ProbeId};
use crate::model::vector::ProbeGeneMap;

/// Reads `probe_id<TAB>gene_id[<TAB>gene_symbol]`, one row per mapping.
/// A probe listed with several genes is non-specific.
pub fn parse_probe_genes(path: &Path) -> Result<ProbeGeneMap, InputError> {
    let mut map = ProbeGeneMap::new();
    for_each_row(path, |line_no, cols| {
        // probe ids are free text, so the header shows in the gene column
        if line_no == 1 && cols.get(1).is_some_and(|c| c.trim().parse::<u64>().is_err()) {
            return Ok(());
        }
        if cols.len() < 2 {
            return Err(InputError::parse(path, line_no, "expected probe and gene id"));
        }
        let gene = cols[1]
            .trim()
            .parse::<u64>()
            .map(GeneId)
            .map_err(|_| InputError::parse(path, line_no, format!("bad gene id {:?}", cols[1])))?;
        let symbol = cols.get(2).map_or("", |s| s.trim());
        map.insert(ProbeId::from(cols[0].trim()), gene, symbol);
        Ok(())
    })?;
    if map.n_probes() == 0 {
        return Err(InputError::InvalidInput(format!(
            "no probe mappings in {}",
            path.display()
        )));
    }
    Ok(map)
}
