use std::path::Path;

use crate::input::InputError;
use crate::input::open::{for_each_row, is_header};
use crate::model::ids::GeneId;
use crate::model::vector::Gene;

/// Reads `gene_id[<TAB>symbol]`. Missing symbols are left empty.
pub fn parse_genes(path: &Path) -> Result<Vec<Gene>, InputError> {
    let mut genes: Vec<Gene> = Vec::new();
    for_each_row(path, |line_no, cols| {
        if is_header(line_no, cols) {
            return Ok(());
        }
        let id = cols[0]
            .trim()
            .parse::<u64>()
            .map(GeneId)
            .map_err(|_| InputError::parse(path, line_no, format!("bad gene id {:?}", cols[0])))?;
        let symbol = cols.get(1).map_or("", |s| s.trim()).to_string();
        genes.push(Gene { id, symbol });
        Ok(())
    })?;
    genes.sort_by_key(|g| g.id);
    genes.dedup_by_key(|g| g.id);
    if genes.is_empty() {
        return Err(InputError::InvalidInput(format!(
            "gene list {} is empty",
            path.display()
        )));
    }
    Ok(genes)
}
