//! Depth- and length-scaled expression units: CPM, TPM and RPKM.

use super::{checked_library_sizes, scale_columns, Method};
use crate::data::{CountMatrix, NormalizedMatrix};
use crate::error::{NormError, Result};
use nalgebra::DMatrix;

const PER_MILLION: f64 = 1e6;
const PER_KILOBASE: f64 = 1e3;

/// Counts per million: `count * 1e6 / library_size`.
pub fn norm_cpm(counts: &CountMatrix) -> Result<NormalizedMatrix> {
    let library_sizes = checked_library_sizes(counts, Method::Cpm)?;
    let factors = library_sizes.iter().map(|&lib| lib / PER_MILLION).collect();
    Ok(scale_columns(counts, Method::Cpm, factors))
}

fn check_lengths(counts: &CountMatrix, lengths: &[f64]) -> Result<()> {
    if lengths.len() != counts.n_genes() {
        return Err(NormError::DimensionMismatch {
            expected: counts.n_genes(),
            actual: lengths.len(),
        });
    }
    if let Some(pos) = lengths.iter().position(|&l| !(l > 0.0 && l.is_finite())) {
        return Err(NormError::InvalidGeneLength {
            gene: counts.gene_keys()[pos].to_string(),
            value: lengths[pos].to_string(),
        });
    }
    Ok(())
}

/// Transcripts per million.
///
/// Counts are first divided by feature length in kilobases, then each sample
/// is rescaled so its rates sum to one million.
pub fn norm_tpm(counts: &CountMatrix, lengths: &[f64]) -> Result<NormalizedMatrix> {
    check_lengths(counts, lengths)?;

    let rates = DMatrix::from_fn(counts.n_genes(), counts.n_samples(), |i, j| {
        counts.get(i, j) / lengths[i] * PER_KILOBASE
    });
    let rate_sums: Vec<f64> = (0..counts.n_samples())
        .map(|j| rates.column(j).iter().filter(|v| !v.is_nan()).sum())
        .collect();

    for (j, &sum) in rate_sums.iter().enumerate() {
        if sum <= 0.0 {
            return Err(NormError::Numerical(format!(
                "Sample '{}' has zero total counts, cannot apply {}",
                counts.sample_ids()[j],
                Method::Tpm
            )));
        }
    }

    let data = DMatrix::from_fn(counts.n_genes(), counts.n_samples(), |i, j| {
        rates[(i, j)] * PER_MILLION / rate_sums[j]
    });

    Ok(NormalizedMatrix {
        data,
        sample_ids: counts.sample_ids().to_vec(),
        method: Method::Tpm,
        scale_factors: rate_sums.iter().map(|&s| s / PER_MILLION).collect(),
        reference_sample: None,
        log_transformed: false,
        quartile: None,
        warnings: Vec::new(),
    })
}

/// Reads per kilobase of feature per million mapped reads:
/// `count * 1e9 / (length * library_size)`.
///
/// `scale_factors` holds the per-sample part of the divisor (library size in
/// millions); the per-gene length divides each row on top of it.
pub fn norm_rpkm(counts: &CountMatrix, lengths: &[f64]) -> Result<NormalizedMatrix> {
    check_lengths(counts, lengths)?;
    let library_sizes = checked_library_sizes(counts, Method::Rpkm)?;

    let data = DMatrix::from_fn(counts.n_genes(), counts.n_samples(), |i, j| {
        counts.get(i, j) * PER_MILLION * PER_KILOBASE / (lengths[i] * library_sizes[j])
    });

    Ok(NormalizedMatrix {
        data,
        sample_ids: counts.sample_ids().to_vec(),
        method: Method::Rpkm,
        scale_factors: library_sizes.iter().map(|&lib| lib / PER_MILLION).collect(),
        reference_sample: None,
        log_transformed: false,
        quartile: None,
        warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_counts() -> CountMatrix {
        let data = DMatrix::from_row_slice(3, 2, &[610.0, 10.0, 2.0, 20.0, 6765.0, 30.0]);
        CountMatrix::from_dense(data, &["A", "B", "C"], &["S1", "S2"]).unwrap()
    }

    const LENGTHS: [f64; 3] = [17711.0, 10946.0, 233.0];

    #[test]
    fn test_cpm_column_sums() {
        let counts = create_test_counts();
        let cpm = norm_cpm(&counts).unwrap();

        for j in 0..cpm.n_samples() {
            let col_sum: f64 = cpm.col(j).iter().sum();
            assert_relative_eq!(col_sum, 1_000_000.0, epsilon = 1e-6);
        }
        assert_relative_eq!(cpm.get(1, 1), 20.0 / 60.0 * 1e6, epsilon = 1e-6);
    }

    #[test]
    fn test_tpm() {
        let counts = create_test_counts();
        let tpm = norm_tpm(&counts, &LENGTHS).unwrap();

        let sum = 610.0 / 17711.0 + 2.0 / 10946.0 + 6765.0 / 233.0;
        assert_relative_eq!(tpm.get(0, 0), (610.0 / 17711.0) * 1e6 / sum, epsilon = 1e-6);
        assert_relative_eq!(tpm.get(2, 0), (6765.0 / 233.0) * 1e6 / sum, epsilon = 1e-6);

        for j in 0..tpm.n_samples() {
            let col_sum: f64 = tpm.col(j).iter().sum();
            assert_relative_eq!(col_sum, 1_000_000.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_rpkm() {
        let counts = create_test_counts();
        let rpkm = norm_rpkm(&counts, &LENGTHS).unwrap();

        let sum = 610.0 + 2.0 + 6765.0;
        assert_relative_eq!(rpkm.get(0, 0), 610.0 * 1e9 / (17711.0 * sum), epsilon = 1e-9);
        assert_relative_eq!(rpkm.get(1, 0), 2.0 * 1e9 / (10946.0 * sum), epsilon = 1e-9);
        assert_relative_eq!(rpkm.get(2, 1), 30.0 * 1e9 / (233.0 * 60.0), epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_lengths() {
        let counts = create_test_counts();
        assert!(matches!(
            norm_tpm(&counts, &[100.0, 0.0, 100.0]),
            Err(NormError::InvalidGeneLength { .. })
        ));
        assert!(matches!(
            norm_rpkm(&counts, &[100.0, 100.0]),
            Err(NormError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_cpm_zero_library() {
        let data = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 0.0]);
        let counts = CountMatrix::from_dense(data, &["A", "B"], &["S1", "S2"]).unwrap();
        assert!(norm_cpm(&counts).is_err());
    }
}
