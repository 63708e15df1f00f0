//! Gene-list filtering.
//!
//! Restricts results to genes named in a newline-separated list file. The
//! filter only selects rows; factors are computed on the full matrix first.

use crate::data::CountMatrix;
use crate::error::{NormError, Result};
use log::info;
use std::collections::HashSet;
use std::path::Path;

/// Default annotation column matched against the gene list.
pub const GENE_NAME_COLUMN: &str = "GeneName";

/// Parse a gene list: one name per line, blank lines ignored.
pub fn parse_gene_list(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a gene list file.
pub fn read_gene_list<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_gene_list(&text))
}

/// Row indices of genes whose `column` value is in `names`, in matrix order.
///
/// # Errors
/// `MissingColumn` when the matrix has no such annotation column, `EmptyData`
/// when no gene matches.
pub fn select_genes(
    counts: &CountMatrix,
    names: &HashSet<String>,
    column: &str,
) -> Result<Vec<usize>> {
    let idx = counts
        .annotation_index(column)
        .ok_or_else(|| NormError::MissingColumn(column.to_string()))?;

    let keep: Vec<usize> = counts
        .gene_keys()
        .iter()
        .enumerate()
        .filter(|(_, key)| {
            key.get(idx)
                .map(|value| names.contains(&value.to_string()))
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .collect();

    if keep.is_empty() {
        return Err(NormError::EmptyData(format!(
            "No genes in column '{}' match the {} listed names",
            column,
            names.len()
        )));
    }

    info!(
        "Gene list kept {} of {} genes",
        keep.len(),
        counts.n_genes()
    );

    Ok(keep)
}
