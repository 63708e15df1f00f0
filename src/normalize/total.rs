//! Total-count normalization.
//!
//! Divides each count by the total counts in that sample, giving the fraction
//! of the library each gene accounts for.

use super::{checked_library_sizes, scale_columns, Method};
use crate::data::{CountMatrix, NormalizedMatrix};
use crate::error::{NormError, Result};

/// Apply total-count normalization.
///
/// # Formula
/// For sample j: x_ij / sum(x_j)
///
/// Missing cells stay missing and do not contribute to the total.
pub fn norm_total_count(counts: &CountMatrix) -> Result<NormalizedMatrix> {
    if counts.n_genes() == 0 || counts.n_samples() == 0 {
        return Err(NormError::EmptyData(
            "Cannot apply total-count normalization to empty matrix".to_string(),
        ));
    }

    let library_sizes = checked_library_sizes(counts, Method::TotalCount)?;
    Ok(scale_columns(counts, Method::TotalCount, library_sizes))
}
