//! Median-of-ratios (DESeq-style) normalization.
//!
//! # Algorithm
//!
//! 1. For every gene, take the mean log count across samples (the log of the
//!    geometric mean)
//! 2. For every sample, the size factor is the exponentiated median of
//!    `log(count) - logGeoMean` over genes with a finite geometric mean and a
//!    positive count in that sample
//! 3. Output is `log2(count / size_factor + 1)`
//!
//! A gene with a zero (or missing) count anywhere has a non-finite geometric
//! mean and drops out of every sample's median.
//!
//! # Reference
//!
//! Anders S, Huber W. Differential expression analysis for sequence count
//! data. Genome Biology 11, R106 (2010).

use super::percentile::median;
use super::Method;
use crate::data::{CountMatrix, NormalizedMatrix};
use crate::error::{NormError, Result};
use nalgebra::DMatrix;

/// Mean of log values, shifted by the first value so identical inputs give
/// back that value exactly.
fn log_geo_mean(logs: &[f64]) -> f64 {
    let n = logs.len() as f64;
    if !logs.iter().all(|l| l.is_finite()) {
        return logs.iter().sum::<f64>() / n;
    }
    let shift = logs[0];
    shift + logs.iter().map(|l| l - shift).sum::<f64>() / n
}

/// Estimate one size factor per sample.
///
/// # Errors
/// `AllZeroGene` when a sample has no gene usable for the median.
pub fn size_factors(counts: &CountMatrix) -> Result<Vec<f64>> {
    let n_genes = counts.n_genes();
    let n_samples = counts.n_samples();

    if n_genes == 0 || n_samples == 0 {
        return Err(NormError::EmptyData(
            "Cannot apply median-of-ratios to empty matrix".to_string(),
        ));
    }

    let log_counts = DMatrix::from_fn(n_genes, n_samples, |i, j| counts.get(i, j).ln());
    let log_geo_means: Vec<f64> = (0..n_genes)
        .map(|i| {
            let row: Vec<f64> = log_counts.row(i).iter().copied().collect();
            log_geo_mean(&row)
        })
        .collect();

    (0..n_samples)
        .map(|j| {
            let mut ratios: Vec<f64> = (0..n_genes)
                .filter(|&i| log_geo_means[i].is_finite() && counts.get(i, j) > 0.0)
                .map(|i| log_counts[(i, j)] - log_geo_means[i])
                .collect();

            if ratios.is_empty() {
                return Err(NormError::AllZeroGene {
                    sample: counts.sample_ids()[j].clone(),
                });
            }

            Ok(median(&mut ratios).exp())
        })
        .collect()
}

/// Apply median-of-ratios normalization, returning `log2(count / sf + 1)`.
pub fn norm_median_of_ratios(counts: &CountMatrix) -> Result<NormalizedMatrix> {
    let factors = size_factors(counts)?;

    let data = DMatrix::from_fn(counts.n_genes(), counts.n_samples(), |i, j| {
        (counts.get(i, j) / factors[j] + 1.0).log2()
    });

    Ok(NormalizedMatrix {
        data,
        sample_ids: counts.sample_ids().to_vec(),
        method: Method::MedianOfRatios,
        scale_factors: factors,
        reference_sample: None,
        log_transformed: true,
        quartile: None,
        warnings: Vec::new(),
    })
}
