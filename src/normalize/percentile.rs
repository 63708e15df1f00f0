//! Column-wise percentiles over expressed genes.
//!
//! Genes with no positive count in any sample are left out before the
//! percentile is taken, so a large block of unexpressed genes cannot drag low
//! percentiles to zero in every sample.

use crate::data::CountMatrix;
use crate::error::{NormError, Result};

/// Indices of genes with at least one strictly positive count.
pub fn expressed_genes(counts: &CountMatrix) -> Vec<usize> {
    (0..counts.n_genes())
        .filter(|&i| (0..counts.n_samples()).any(|j| counts.get(i, j) > 0.0))
        .collect()
}

/// Percentile of an ascending slice, interpolating linearly between ranks.
///
/// `p` is in [0, 100]. Returns NaN for an empty slice.
pub fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = p / 100.0 * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            if lower == upper {
                sorted[lower]
            } else {
                let frac = pos - lower as f64;
                sorted[lower] + (sorted[upper] - sorted[lower]) * frac
            }
        }
    }
}

/// Median of unsorted values; NaN for an empty slice.
pub fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    percentile_of_sorted(values, 50.0)
}

/// Compute the `p`-th percentile of every sample over expressed genes.
///
/// Missing cells are not observations for their column.
///
/// # Errors
/// `InvalidParameter` when `p` is outside [0, 100]; `ReferenceUndefined` when
/// no gene is expressed or a sample has no observed value among them.
pub fn percentile(counts: &CountMatrix, p: f64) -> Result<Vec<f64>> {
    if !(0.0..=100.0).contains(&p) {
        return Err(NormError::InvalidParameter(format!(
            "Percentile must be in [0, 100], got {}",
            p
        )));
    }

    let expressed = expressed_genes(counts);
    if expressed.is_empty() {
        return Err(NormError::ReferenceUndefined(
            "no gene has a positive count in any sample".to_string(),
        ));
    }

    (0..counts.n_samples())
        .map(|j| {
            let mut values: Vec<f64> = expressed
                .iter()
                .map(|&i| counts.get(i, j))
                .filter(|v| !v.is_nan())
                .collect();
            if values.is_empty() {
                return Err(NormError::ReferenceUndefined(format!(
                    "sample '{}' has no observed counts among expressed genes",
                    counts.sample_ids()[j]
                )));
            }
            values.sort_by(f64::total_cmp);
            Ok(percentile_of_sorted(&values, p))
        })
        .collect()
}
