//! Gene × sample count matrix assembled from per-sample tables.

use super::gene_key::{GeneKey, KeyValue};
use crate::error::{NormError, Result};
use crate::output::format_count;
use nalgebra::DMatrix;
use std::collections::HashSet;
use std::path::Path;

/// Name of the annotation column holding per-gene feature lengths.
pub const LENGTH_COLUMN: &str = "Length";

/// A dense count matrix storing raw read counts across samples.
///
/// Rows represent genes keyed by their annotation columns, columns represent
/// samples. Cells missing from an input table are stored as NaN.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Raw counts (genes × samples)
    data: DMatrix<f64>,
    /// Annotation column names shared by every input table
    annotation_columns: Vec<String>,
    /// One key per gene row
    gene_keys: Vec<GeneKey>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new CountMatrix, checking that labels match the data shape.
    pub fn new(
        data: DMatrix<f64>,
        annotation_columns: Vec<String>,
        gene_keys: Vec<GeneKey>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != gene_keys.len() {
            return Err(NormError::DimensionMismatch {
                expected: nrows,
                actual: gene_keys.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(NormError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        if let Some(key) = gene_keys
            .iter()
            .find(|key| key.len() != annotation_columns.len())
        {
            return Err(NormError::DimensionMismatch {
                expected: annotation_columns.len(),
                actual: key.len(),
            });
        }

        let mut seen = HashSet::new();
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(NormError::DuplicateSample(id.clone()));
            }
        }

        Ok(Self {
            data,
            annotation_columns,
            gene_keys,
            sample_ids,
        })
    }

    /// Create from a dense matrix with a single `gene_id` text annotation.
    pub fn from_dense(
        data: DMatrix<f64>,
        gene_ids: &[&str],
        sample_ids: &[&str],
    ) -> Result<Self> {
        Self::new(
            data,
            vec!["gene_id".to_string()],
            gene_ids.iter().map(|id| GeneKey::text(id)).collect(),
            sample_ids.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Write the matrix as one TSV table: annotation columns then one count
    /// column per sample.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;

        let header: Vec<&str> = self
            .annotation_columns
            .iter()
            .chain(self.sample_ids.iter())
            .map(String::as_str)
            .collect();
        writer.write_record(&header)?;

        for (row, key) in self.gene_keys.iter().enumerate() {
            let mut record: Vec<String> = key.values().iter().map(|v| v.to_string()).collect();
            record.extend((0..self.n_samples()).map(|col| format_count(self.get(row, col))));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Get the value at (row, col); NaN marks a missing cell.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Number of genes (rows).
    #[inline]
    pub fn n_genes(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn annotation_columns(&self) -> &[String] {
        &self.annotation_columns
    }

    #[inline]
    pub fn gene_keys(&self) -> &[GeneKey] {
        &self.gene_keys
    }

    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get a dense vector for a specific column (sample).
    pub fn col(&self, col: usize) -> Vec<f64> {
        self.data.column(col).iter().copied().collect()
    }

    /// Compute column sums (library sizes per sample), skipping missing cells.
    pub fn col_sums(&self) -> Vec<f64> {
        (0..self.n_samples())
            .map(|col| {
                self.data
                    .column(col)
                    .iter()
                    .filter(|v| !v.is_nan())
                    .sum()
            })
            .collect()
    }

    /// Position of an annotation column, matched case-insensitively.
    pub fn annotation_index(&self, name: &str) -> Option<usize> {
        self.annotation_columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Per-gene feature lengths read from the `Length` annotation column.
    ///
    /// Lengths must be positive numbers.
    pub fn gene_lengths(&self) -> Result<Vec<f64>> {
        let idx = self
            .annotation_index(LENGTH_COLUMN)
            .ok_or_else(|| NormError::MissingColumn(LENGTH_COLUMN.to_string()))?;

        self.gene_keys
            .iter()
            .map(|key| {
                let value = key.get(idx);
                match value.and_then(KeyValue::as_f64) {
                    Some(len) if len > 0.0 => Ok(len),
                    _ => Err(NormError::InvalidGeneLength {
                        gene: key.to_string(),
                        value: value.map(|v| v.to_string()).unwrap_or_default(),
                    }),
                }
            })
            .collect()
    }

    /// Subset the matrix to include only specified genes (by index).
    pub fn subset_genes(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_genes()) {
            return Err(NormError::InvalidParameter(format!(
                "Gene index {} out of bounds",
                bad
            )));
        }

        let data = self.data.select_rows(indices);
        let gene_keys = indices.iter().map(|&i| self.gene_keys[i].clone()).collect();

        Self::new(
            data,
            self.annotation_columns.clone(),
            gene_keys,
            self.sample_ids.clone(),
        )
    }
}
