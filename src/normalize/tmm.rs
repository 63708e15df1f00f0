//! Trimmed Mean of M-values (TMM) normalization.
//!
//! TMM is a normalization method from edgeR that calculates scaling factors
//! to account for compositional differences between samples. Unlike simple
//! library size normalization, TMM is robust to asymmetric differential
//! expression where a subset of genes dominate expression changes.
//!
//! # Algorithm
//!
//! 1. Select a reference sample (by default, the one whose upper quartile over
//!    expressed genes is closest to the mean upper quartile)
//! 2. For each sample, calculate M-values (log-ratios) and A-values
//!    (average expression) for each gene against the reference
//! 3. Rank M and A over genes where both are finite and keep the middle of
//!    each ranking (default: 30% trimmed per tail for M, 5% for A)
//! 4. The log2 factor is the precision-weighted mean of the surviving M-values
//!
//! Normalized values are `count / factor`.
//!
//! # Reference
//!
//! Robinson MD, Oshlack A. A scaling normalization method for differential
//! expression analysis of RNA-seq data. Genome Biology 11, R25 (2010).

use super::percentile::percentile;
use super::{checked_library_sizes, scale_columns, Method};
use crate::data::{CountMatrix, NormalizedMatrix};
use crate::error::{NormError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight sums within this distance of zero are treated as zero.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-8;

/// Configuration for TMM normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmmConfig {
    /// Fraction of M-values to trim from each tail (default: 0.30).
    pub trim_fold_change: f64,
    /// Fraction of A-values to trim from each tail (default: 0.05).
    pub trim_abs_expr: f64,
    /// Reference sample, by sample id or column index (None = auto-select).
    pub reference_sample: Option<String>,
}

impl Default for TmmConfig {
    fn default() -> Self {
        Self {
            trim_fold_change: 0.30,
            trim_abs_expr: 0.05,
            reference_sample: None,
        }
    }
}

/// A sample whose TMM weights summed to zero or infinity.
///
/// Not fatal: the sample keeps a factor of 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegenerateWeightSum {
    pub sample: String,
    pub weight_sum: f64,
}

impl fmt::Display for DegenerateWeightSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unexpected sum of TMM weights for sample '{}': {}; using factor 1",
            self.sample, self.weight_sum
        )
    }
}

/// Result of TMM normalization.
#[derive(Debug, Clone)]
pub struct TmmMatrix {
    /// Normalized values and per-sample factors.
    pub normalized: NormalizedMatrix,
    /// TMM normalization factors for each sample.
    pub norm_factors: Vec<f64>,
    /// Original library sizes.
    pub library_sizes: Vec<f64>,
    /// Effective library sizes (library_size * norm_factor).
    pub effective_lib_sizes: Vec<f64>,
    /// Index of the reference sample used.
    pub reference_sample: usize,
    /// Samples that fell back to a factor of 1.
    pub warnings: Vec<DegenerateWeightSum>,
}

impl TmmMatrix {
    /// Number of genes.
    pub fn n_genes(&self) -> usize {
        self.normalized.n_genes()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.normalized.n_samples()
    }

    /// Convert into the common normalized representation.
    pub fn into_normalized(self) -> NormalizedMatrix {
        self.normalized
    }
}

/// Apply TMM normalization with default parameters.
///
/// # Example
/// ```ignore
/// let tmm = norm_tmm(&counts)?;
/// let factors = &tmm.norm_factors;
/// ```
pub fn norm_tmm(counts: &CountMatrix) -> Result<TmmMatrix> {
    norm_tmm_with_config(counts, &TmmConfig::default())
}

/// Apply TMM normalization with custom configuration.
pub fn norm_tmm_with_config(counts: &CountMatrix, config: &TmmConfig) -> Result<TmmMatrix> {
    let n_samples = counts.n_samples();

    if counts.n_genes() == 0 || n_samples == 0 {
        return Err(NormError::EmptyData(
            "Cannot apply TMM to empty matrix".to_string(),
        ));
    }

    if !(0.0..0.5).contains(&config.trim_fold_change) {
        return Err(NormError::InvalidParameter(
            "trim_fold_change must be in [0, 0.5)".to_string(),
        ));
    }

    if !(0.0..0.5).contains(&config.trim_abs_expr) {
        return Err(NormError::InvalidParameter(
            "trim_abs_expr must be in [0, 0.5)".to_string(),
        ));
    }

    let library_sizes = checked_library_sizes(counts, Method::Tmm)?;

    let ref_idx = match &config.reference_sample {
        Some(reference) => resolve_reference(counts, reference)?,
        None => select_reference_sample(counts)?,
    };

    let mut warnings = Vec::new();
    let norm_factors: Vec<f64> = (0..n_samples)
        .map(|j| {
            if j == ref_idx {
                return 1.0;
            }
            match log2_tmm_factor(counts, j, ref_idx, &library_sizes, config) {
                Ok(log2_factor) => log2_factor.exp2(),
                Err(weight_sum) => {
                    warnings.push(DegenerateWeightSum {
                        sample: counts.sample_ids()[j].clone(),
                        weight_sum,
                    });
                    1.0
                }
            }
        })
        .collect();

    let effective_lib_sizes: Vec<f64> = library_sizes
        .iter()
        .zip(&norm_factors)
        .map(|(&lib, &factor)| lib * factor)
        .collect();

    let mut normalized = scale_columns(counts, Method::Tmm, norm_factors.clone());
    normalized.reference_sample = Some(ref_idx);
    normalized.warnings = warnings.clone();

    Ok(TmmMatrix {
        normalized,
        norm_factors,
        library_sizes,
        effective_lib_sizes,
        reference_sample: ref_idx,
        warnings,
    })
}

/// Resolve a reference given as a sample id, or failing that a column index.
fn resolve_reference(counts: &CountMatrix, reference: &str) -> Result<usize> {
    if let Some(idx) = counts.sample_ids().iter().position(|s| s == reference) {
        return Ok(idx);
    }
    match reference.parse::<usize>() {
        Ok(idx) if idx < counts.n_samples() => Ok(idx),
        Ok(idx) => Err(NormError::InvalidParameter(format!(
            "Reference sample index {} out of bounds (n_samples = {})",
            idx,
            counts.n_samples()
        ))),
        Err(_) => Err(NormError::InvalidParameter(format!(
            "Reference sample '{}' is not one of the input samples",
            reference
        ))),
    }
}

/// Select reference sample as the one with upper quartile closest to mean.
fn select_reference_sample(counts: &CountMatrix) -> Result<usize> {
    let upper_quartiles = percentile(counts, 75.0)?;
    let mean_uq = upper_quartiles.iter().sum::<f64>() / upper_quartiles.len() as f64;

    if !mean_uq.is_finite() {
        return Err(NormError::ReferenceUndefined(
            "upper quartiles are not finite, cannot pick a TMM reference sample".to_string(),
        ));
    }

    upper_quartiles
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - mean_uq).abs().total_cmp(&(*b - mean_uq).abs()))
        .map(|(idx, _)| idx)
        .ok_or_else(|| NormError::ReferenceUndefined("no samples".to_string()))
}

/// 1-based ordinal ranks; ties are ranked in input order.
fn ordinal_ranks(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0; values.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = rank + 1;
    }
    ranks
}

/// Calculate log2 of the TMM factor for a sample relative to the reference.
///
/// Returns the offending weight sum when it is zero or infinite.
fn log2_tmm_factor(
    counts: &CountMatrix,
    sample_idx: usize,
    ref_idx: usize,
    library_sizes: &[f64],
    config: &TmmConfig,
) -> std::result::Result<f64, f64> {
    let sample_lib = library_sizes[sample_idx];
    let ref_lib = library_sizes[ref_idx];

    // (gene, M, A) for genes where both values are finite
    let mut finite: Vec<(usize, f64, f64)> = Vec::new();
    for i in 0..counts.n_genes() {
        let prop_s = counts.get(i, sample_idx) / sample_lib;
        let prop_r = counts.get(i, ref_idx) / ref_lib;

        let m = (prop_s / prop_r).log2();
        let a = 0.5 * (prop_s * prop_r).log2();

        if m.is_finite() && a.is_finite() {
            finite.push((i, m, a));
        }
    }

    let n = finite.len() as f64;
    let m_values: Vec<f64> = finite.iter().map(|&(_, m, _)| m).collect();
    let a_values: Vec<f64> = finite.iter().map(|&(_, _, a)| a).collect();
    let m_ranks = ordinal_ranks(&m_values);
    let a_ranks = ordinal_ranks(&a_values);

    let within = |rank: usize, trim: f64| {
        let rank = rank as f64;
        rank > n * trim && rank < n * (1.0 - trim)
    };

    let mut sum_weights = 0.0;
    let mut sum_weighted_m = 0.0;
    for (k, &(i, m, _)) in finite.iter().enumerate() {
        let count_s = counts.get(i, sample_idx);
        let count_r = counts.get(i, ref_idx);

        if count_s <= 0.0
            || count_r <= 0.0
            || !within(a_ranks[k], config.trim_abs_expr)
            || !within(m_ranks[k], config.trim_fold_change)
        {
            continue;
        }

        // Inverse of the asymptotic variance of M
        let var_m = (sample_lib - count_s) / (sample_lib * count_s)
            + (ref_lib - count_r) / (ref_lib * count_r);
        let weight = 1.0 / var_m;

        sum_weights += weight;
        sum_weighted_m += weight * m;
    }

    if sum_weights.abs() <= WEIGHT_SUM_TOLERANCE || sum_weights.is_infinite() {
        return Err(sum_weights);
    }

    Ok(sum_weighted_m / sum_weights)
}

/// Get just the TMM normalization factors without keeping the matrix.
pub fn tmm_factors(counts: &CountMatrix) -> Result<Vec<f64>> {
    let tmm = norm_tmm(counts)?;
    Ok(tmm.norm_factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn create_test_counts() -> CountMatrix {
        // 4 genes × 3 samples with different library sizes, same proportions
        let data = DMatrix::from_row_slice(
            4,
            3,
            &[
                500.0, 1000.0, 250.0, //
                300.0, 600.0, 150.0, //
                150.0, 300.0, 75.0, //
                50.0, 100.0, 25.0,
            ],
        );
        CountMatrix::from_dense(data, &["A", "B", "C", "D"], &["S1", "S2", "S3"]).unwrap()
    }

    fn create_asymmetric_counts() -> CountMatrix {
        // Sample 2 has gene A at 3x, others unchanged
        let data = DMatrix::from_row_slice(
            4,
            2,
            &[
                500.0, 1500.0, //
                300.0, 300.0, //
                150.0, 150.0, //
                50.0, 50.0,
            ],
        );
        CountMatrix::from_dense(data, &["A", "B", "C", "D"], &["S1", "S2"]).unwrap()
    }

    /// 30 genes with varied expression, sample 2 = sample 1 × 3.
    fn create_scaled_counts() -> CountMatrix {
        let base: Vec<f64> = (0..30).map(|i| (5 + (i * 37) % 200) as f64).collect();
        let data = DMatrix::from_fn(30, 2, |i, j| if j == 0 { base[i] } else { base[i] * 3.0 });
        let genes: Vec<String> = (0..30).map(|i| format!("gene_{}", i)).collect();
        let gene_refs: Vec<&str> = genes.iter().map(String::as_str).collect();
        CountMatrix::from_dense(data, &gene_refs, &["S1", "S2"]).unwrap()
    }

    #[test]
    fn test_tmm_basic() {
        let counts = create_test_counts();
        let tmm = norm_tmm(&counts).unwrap();

        assert_eq!(tmm.n_genes(), 4);
        assert_eq!(tmm.n_samples(), 3);
        assert_eq!(tmm.library_sizes, vec![1000.0, 2000.0, 500.0]);
    }

    #[test]
    fn test_tmm_factors_symmetric() {
        // When proportions are identical, TMM factors should be ~1.0
        let counts = create_test_counts();
        let tmm = norm_tmm(&counts).unwrap();

        for factor in &tmm.norm_factors {
            assert_relative_eq!(*factor, 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_tmm_factors_asymmetric() {
        let config = TmmConfig {
            reference_sample: Some("S1".to_string()),
            ..Default::default()
        };
        let tmm = norm_tmm_with_config(&create_asymmetric_counts(), &config).unwrap();

        // Only gene C survives both trims; its M-value is log2(0.075 / 0.15) = -1
        assert_relative_eq!(tmm.norm_factors[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(tmm.normalized.get(0, 1), 3000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tmm_self_reference_is_exactly_one() {
        let counts = create_test_counts();

        for (idx, name) in counts.sample_ids().iter().enumerate() {
            let config = TmmConfig {
                reference_sample: Some(name.clone()),
                ..Default::default()
            };
            let tmm = norm_tmm_with_config(&counts, &config).unwrap();

            assert_eq!(tmm.reference_sample, idx);
            assert_eq!(tmm.norm_factors[idx], 1.0);
        }
    }

    #[test]
    fn test_tmm_reference_by_index() {
        let counts = create_test_counts();
        let config = TmmConfig {
            reference_sample: Some("2".to_string()),
            ..Default::default()
        };
        let tmm = norm_tmm_with_config(&counts, &config).unwrap();
        assert_eq!(tmm.reference_sample, 2);
        assert_eq!(tmm.normalized.reference_sample, Some(2));
    }

    #[test]
    fn test_tmm_unknown_reference() {
        let counts = create_test_counts();
        for reference in ["S9", "3"] {
            let config = TmmConfig {
                reference_sample: Some(reference.to_string()),
                ..Default::default()
            };
            assert!(norm_tmm_with_config(&counts, &config).is_err());
        }
    }

    #[test]
    fn test_tmm_scale_consistency() {
        let counts = create_scaled_counts();
        let config = TmmConfig {
            reference_sample: Some("S1".to_string()),
            ..Default::default()
        };
        let tmm = norm_tmm_with_config(&counts, &config).unwrap();

        // Composition is unchanged, so all of the depth difference shows up
        // in the effective library size
        assert_relative_eq!(tmm.norm_factors[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(
            tmm.effective_lib_sizes[1] / tmm.effective_lib_sizes[0],
            3.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_tmm_effective_lib_sizes() {
        let counts = create_test_counts();
        let tmm = norm_tmm(&counts).unwrap();

        for j in 0..3 {
            let expected = tmm.library_sizes[j] * tmm.norm_factors[j];
            assert_relative_eq!(tmm.effective_lib_sizes[j], expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_tmm_degenerate_weight_sum_is_recoverable() {
        // S2 shares no expressed gene with S1, so no weights survive
        let data = DMatrix::from_row_slice(3, 2, &[10.0, 0.0, 0.0, 10.0, 5.0, 0.0]);
        let counts = CountMatrix::from_dense(data, &["A", "B", "C"], &["S1", "S2"]).unwrap();
        let config = TmmConfig {
            reference_sample: Some("S1".to_string()),
            ..Default::default()
        };

        let tmm = norm_tmm_with_config(&counts, &config).unwrap();
        assert_eq!(tmm.norm_factors, vec![1.0, 1.0]);
        assert_eq!(tmm.warnings.len(), 1);
        assert_eq!(tmm.warnings[0].sample, "S2");
        assert_eq!(tmm.normalized.warnings, tmm.warnings);
    }

    #[test]
    fn test_tmm_config_validation() {
        let counts = create_test_counts();

        let config = TmmConfig {
            trim_fold_change: 0.6,
            ..Default::default()
        };
        assert!(norm_tmm_with_config(&counts, &config).is_err());

        let config = TmmConfig {
            trim_abs_expr: -0.1,
            ..Default::default()
        };
        assert!(norm_tmm_with_config(&counts, &config).is_err());
    }

    #[test]
    fn test_tmm_single_sample_is_its_own_reference() {
        let data = DMatrix::from_column_slice(3, 1, &[100.0, 40.0, 7.0]);
        let counts = CountMatrix::from_dense(data, &["A", "B", "C"], &["S1"]).unwrap();
        let tmm = norm_tmm(&counts).unwrap();

        assert_eq!(tmm.reference_sample, 0);
        assert_eq!(tmm.norm_factors, vec![1.0]);
        assert!(tmm.warnings.is_empty());
        assert_eq!(tmm.normalized.col(0), vec![100.0, 40.0, 7.0]);
    }

    #[test]
    fn test_tmm_factors_function() {
        let counts = create_test_counts();
        let factors = tmm_factors(&counts).unwrap();

        assert_eq!(factors.len(), 3);
        for factor in factors {
            assert!(factor > 0.0);
        }
    }

    #[test]
    fn test_select_reference_sample() {
        let counts = create_test_counts();
        // Upper quartiles 350, 700, 175; mean 408.33 → S1
        assert_eq!(select_reference_sample(&counts).unwrap(), 0);
    }

    #[test]
    fn test_ordinal_ranks() {
        assert_eq!(ordinal_ranks(&[0.5, -1.0, -1.0, 2.0]), vec![3, 1, 2, 4]);
    }
}
