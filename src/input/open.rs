use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::input::InputError;

/// Opens a plain or gzip-compressed (`.gz`) text file.
pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>, InputError> {
    if !path.exists() {
        return Err(InputError::MissingInput(path.display().to_string()));
    }
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Calls `f` with the 1-based line number and the fields of every non-empty
/// line, split on tabs with the line terminator removed.
pub fn for_each_row<F>(path: &Path, mut f: F) -> Result<(), InputError>
where
    F: FnMut(usize, &[&str]) -> Result<(), InputError>,
{
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        f(line_no, &cols)?;
    }
    Ok(())
}

/// A first line whose leading column is not an integer id is a header.
pub fn is_header(line_no: usize, cols: &[&str]) -> bool {
    line_no == 1 && cols.first().is_some_and(|c| c.trim().parse::<u64>().is_err())
}
