//! Quartile normalization.
//!
//! Each sample is divided by a quartile of its counts over expressed genes
//! (see [`percentile`](super::percentile)). The upper quartile is the usual
//! choice; lower quartile and median are available for low-depth data.

use super::percentile::percentile;
use super::{scale_columns, Method};
use crate::data::{CountMatrix, NormalizedMatrix};
use crate::error::{NormError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Quartile used as the per-sample divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quartile {
    /// 25th percentile.
    Lower,
    /// 50th percentile.
    Median,
    /// 75th percentile.
    #[default]
    Upper,
}

impl Quartile {
    /// Percentile in [0, 100].
    pub fn percent(&self) -> f64 {
        match self {
            Quartile::Lower => 25.0,
            Quartile::Median => 50.0,
            Quartile::Upper => 75.0,
        }
    }
}

impl FromStr for Quartile {
    type Err = NormError;

    /// Accepts `lower`/`median`/`upper` or the quartile number `1`/`2`/`3`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lower" | "1" => Ok(Quartile::Lower),
            "median" | "2" => Ok(Quartile::Median),
            "upper" | "3" => Ok(Quartile::Upper),
            other => Err(NormError::InvalidParameter(format!(
                "Unexpected quartile for normalization: '{}' (expected lower, median, upper, 1, 2 or 3)",
                other
            ))),
        }
    }
}

/// Divide each sample by the chosen quartile of its expressed-gene counts.
pub fn norm_quartile(counts: &CountMatrix, quartile: Quartile) -> Result<NormalizedMatrix> {
    if counts.n_genes() == 0 || counts.n_samples() == 0 {
        return Err(NormError::EmptyData(
            "Cannot apply quartile normalization to empty matrix".to_string(),
        ));
    }

    let quantiles = percentile(counts, quartile.percent())?;
    for (j, &q) in quantiles.iter().enumerate() {
        if q <= 0.0 {
            return Err(NormError::Numerical(format!(
                "Sample '{}' has a zero {:?} quartile, cannot apply quartile normalization",
                counts.sample_ids()[j],
                quartile
            )));
        }
    }

    let mut normalized = scale_columns(counts, Method::UpperQuartile, quantiles);
    normalized.quartile = Some(quartile);
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn create_test_counts() -> CountMatrix {
        // 5 genes × 2 samples, gene E unexpressed
        let data = DMatrix::from_row_slice(
            5,
            2,
            &[
                1.0, 2.0, //
                2.0, 4.0, //
                3.0, 6.0, //
                4.0, 8.0, //
                0.0, 0.0,
            ],
        );
        CountMatrix::from_dense(data, &["A", "B", "C", "D", "E"], &["S1", "S2"]).unwrap()
    }

    #[test]
    fn test_parse_quartile() {
        assert_eq!("upper".parse::<Quartile>().unwrap(), Quartile::Upper);
        assert_eq!("3".parse::<Quartile>().unwrap(), Quartile::Upper);
        assert_eq!("Lower".parse::<Quartile>().unwrap(), Quartile::Lower);
        assert_eq!("2".parse::<Quartile>().unwrap(), Quartile::Median);
        assert!("4".parse::<Quartile>().is_err());
        assert!("top".parse::<Quartile>().is_err());
    }

    #[test]
    fn test_upper_quartile() {
        let counts = create_test_counts();
        let norm = norm_quartile(&counts, Quartile::Upper).unwrap();

        // Expressed values [1,2,3,4] → 75th percentile 3.25
        assert_relative_eq!(norm.scale_factors[0], 3.25);
        assert_relative_eq!(norm.scale_factors[1], 6.5);
        assert_relative_eq!(norm.get(3, 0), 4.0 / 3.25);
        // Both samples share proportions, so they normalize identically
        for i in 0..counts.n_genes() {
            assert_relative_eq!(norm.get(i, 0), norm.get(i, 1));
        }
    }

    #[test]
    fn test_median_quartile() {
        let counts = create_test_counts();
        let norm = norm_quartile(&counts, Quartile::Median).unwrap();
        assert_relative_eq!(norm.scale_factors[0], 2.5);
    }

    #[test]
    fn test_lower_quartile_keeps_column_label() {
        let counts = create_test_counts();
        let norm = norm_quartile(&counts, Quartile::Lower).unwrap();

        // Expressed values [1,2,3,4] → 25th percentile 1.75
        assert_relative_eq!(norm.scale_factors[0], 1.75);
        assert_eq!(norm.method.label(), "rnaseq_upper_quartile");
        assert_eq!(norm.quartile, Some(Quartile::Lower));
    }

    #[test]
    fn test_zero_quartile_is_an_error() {
        let data = DMatrix::from_row_slice(4, 2, &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 5.0, 1.0]);
        let counts = CountMatrix::from_dense(data, &["A", "B", "C", "D"], &["S1", "S2"]).unwrap();
        assert!(matches!(
            norm_quartile(&counts, Quartile::Lower),
            Err(NormError::Numerical(_))
        ));
    }
}
