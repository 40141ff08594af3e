use crate::mat_util::IndexValuePairs;
use crate::{Error, Index, IndexValueVec, Result};
use itertools::Itertools;
use log::info;
use rayon::prelude::*;
use std::fs;
use std::path::Path;

mod features;
mod labels;

pub use self::features::{FeatureRow, FeatureSet, FeatureType, Features, Normalization};
pub use self::labels::LabelMat;
pub(crate) use self::labels::LabelLayout;

/// Contents of a header-prefixed sparse text file: one `index:value` pair list
/// per row, dimensions taken from the header line.
pub(crate) struct SparseTextFile {
    pub(crate) n_rows: usize,
    pub(crate) n_cols: usize,
    pub(crate) rows: Vec<IndexValueVec>,
}

/// Parse the header line, which holds the two matrix dimensions.
fn parse_header(line: &str) -> Result<(usize, usize)> {
    let tokens = line.split_whitespace().collect_vec();
    if tokens.len() != 2 {
        return Err(Error::Parse(format!(
            "expect header line with 2 space-separated tokens, found {} instead",
            tokens.len()
        )));
    }

    let n_rows = tokens[0]
        .parse::<usize>()
        .map_err(|_| Error::Parse(format!("failed to parse row count \"{}\"", tokens[0])))?;
    let n_cols = tokens[1]
        .parse::<usize>()
        .map_err(|_| Error::Parse(format!("failed to parse column count \"{}\"", tokens[1])))?;
    Ok((n_rows, n_cols))
}

/// Parse one data row of space-separated `index:value` pairs.
///
/// An empty line is a row with no entries.
fn parse_row_line(line: &str, n_cols: usize) -> Result<IndexValueVec> {
    let mut pairs = Vec::new();
    for pair_str in line.split_whitespace() {
        let mut pair_iter = pair_str.split(':');
        let index = pair_iter
            .next()
            .and_then(|s| s.parse::<Index>().ok())
            .ok_or_else(|| {
                Error::Parse(format!("failed to parse index in \"{}\"", pair_str))
            })?;
        let value = pair_iter
            .next()
            .and_then(|s| s.parse::<f32>().ok())
            .ok_or_else(|| {
                Error::Parse(format!("failed to parse value in \"{}\"", pair_str))
            })?;
        if pair_iter.next().is_some() {
            return Err(Error::Parse(format!("failed to parse pair \"{}\"", pair_str)));
        }
        pairs.push((index, value));
    }

    pairs.sort_unstable_by_key(|&(i, _)| i);
    if !pairs.is_valid_sparse_vec(n_cols) {
        return Err(Error::Parse(format!("row is invalid in line \"{}\"", line)));
    }
    Ok(pairs)
}

/// Load a header-prefixed sparse text file.
pub(crate) fn read_sparse_text_file(path: &Path) -> Result<SparseTextFile> {
    info!("Loading data from {}", path.display());
    let start_t = time::precise_time_s();

    let file_content = fs::read_to_string(path)?;
    let lines: Vec<&str> = file_content.par_lines().collect();
    if lines.is_empty() {
        return Err(Error::Parse(format!("{} is empty", path.display())));
    }

    let (n_rows, n_cols) = parse_header(lines[0])?;
    let rows: Vec<IndexValueVec> = lines
        .into_par_iter()
        .skip(1)
        .map(|line| parse_row_line(line, n_cols))
        .collect::<Result<_>>()?;
    if rows.len() != n_rows {
        return Err(Error::Parse(format!(
            "expected {} rows, but read {}",
            n_rows,
            rows.len()
        )));
    }

    info!(
        "Loaded {}x{} matrix from {}; it took {:.2}s",
        n_rows,
        n_cols,
        path.display(),
        time::precise_time_s() - start_t
    );
    Ok(SparseTextFile {
        n_rows,
        n_cols,
        rows,
    })
}
