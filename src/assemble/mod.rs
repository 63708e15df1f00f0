//! Matrix assembly: join per-sample count tables into one gene × sample matrix.
//!
//! Each input file carries the same K annotation columns (K is taken from the
//! first file's width minus one) followed by one count column. Tables are
//! aligned on their typed annotation key and concatenated along the sample
//! axis:
//!
//! - rows appear in order of first appearance, starting with the first file
//! - a gene absent from a file gets a missing (NaN) cell in that column
//! - repeated keys are not collapsed; the n-th occurrence of a key in one
//!   file lines up with the n-th occurrence in every other file
//! - an annotation column that is integer in one file and decimal in another
//!   is compared as decimal everywhere

mod table;

pub use table::{annotation_width, read_sample_table, SampleTable};

use crate::data::{CountMatrix, GeneKey, KeyKind};
use crate::error::{NormError, Result};
use log::{debug, info};
use nalgebra::DMatrix;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Read and join per-sample count tables.
///
/// # Errors
/// Fails on the first file that cannot be read, has a different annotation
/// layout than the first file, or reuses a sample column name.
pub fn assemble<P: AsRef<Path>>(paths: &[P]) -> Result<CountMatrix> {
    let first = paths
        .first()
        .ok_or_else(|| NormError::EmptyData("No input files given".to_string()))?;
    let n_annotation = annotation_width(first)?;
    debug!(
        "Using {} annotation column(s) from {}",
        n_annotation,
        first.as_ref().display()
    );

    let tables = paths
        .iter()
        .map(|p| read_sample_table(p, n_annotation))
        .collect::<Result<Vec<_>>>()?;

    join_tables(&tables)
}

/// Join already-parsed tables into a [`CountMatrix`].
pub fn join_tables(tables: &[SampleTable]) -> Result<CountMatrix> {
    let first = tables
        .first()
        .ok_or_else(|| NormError::EmptyData("No sample tables to join".to_string()))?;
    let kinds = check_layout(first, tables)?;

    let mut index: HashMap<(GeneKey, usize), usize> = HashMap::new();
    let mut keys: Vec<GeneKey> = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (col, table) in tables.iter().enumerate() {
        let table_keys: Vec<GeneKey> = if table.key_kinds == kinds {
            table.keys.clone()
        } else {
            debug!("Widening numeric keys of {}", table.file_name());
            table.keys.iter().map(|key| key.widen(&kinds)).collect()
        };

        let mut occurrences: HashMap<&GeneKey, usize> = HashMap::new();
        for (key, &count) in table_keys.iter().zip(&table.counts) {
            let occurrence = occurrences.entry(key).or_insert(0);
            let slot = (key.clone(), *occurrence);
            *occurrence += 1;

            let row = *index.entry(slot).or_insert_with(|| {
                keys.push(key.clone());
                rows.push(vec![f64::NAN; tables.len()]);
                rows.len() - 1
            });
            rows[row][col] = count;
        }
    }

    let n_genes = rows.len();
    let n_samples = tables.len();
    let data = DMatrix::from_fn(n_genes, n_samples, |i, j| rows[i][j]);

    info!(
        "Assembled {} genes x {} samples from {} file(s)",
        n_genes,
        n_samples,
        tables.len()
    );

    CountMatrix::new(
        data,
        first.annotation_columns.clone(),
        keys,
        tables.iter().map(|t| t.sample_id.clone()).collect(),
    )
}

/// Every table must share the first table's annotation header and contribute a
/// distinct sample name. Returns the common kind of each key column.
fn check_layout(first: &SampleTable, tables: &[SampleTable]) -> Result<Vec<KeyKind>> {
    let mut samples = HashSet::new();
    let mut kinds = first.key_kinds.clone();

    for table in tables {
        if table.annotation_columns != first.annotation_columns {
            return Err(NormError::InputFormat {
                file: table.file_name(),
                reason: format!(
                    "annotation columns [{}] differ from [{}] in {}",
                    table.annotation_columns.join(", "),
                    first.annotation_columns.join(", "),
                    first.file_name()
                ),
            });
        }

        for (col, (kind, &found)) in kinds.iter_mut().zip(&table.key_kinds).enumerate() {
            let expected = *kind;
            *kind = expected.unify(found).ok_or_else(|| NormError::KeyKindMismatch {
                file: table.file_name(),
                column: first.annotation_columns[col].clone(),
                expected,
                found,
            })?;
        }

        if !samples.insert(table.sample_id.as_str()) {
            return Err(NormError::DuplicateSample(table.sample_id.clone()));
        }
    }

    Ok(kinds)
}
