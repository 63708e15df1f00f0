//! Normalized expression values produced by one normalization method.

use crate::normalize::{DegenerateWeightSum, Method, Quartile};
use nalgebra::DMatrix;
use serde::Serialize;

/// Result of a single normalization pass.
///
/// Has the same shape as the [`CountMatrix`](super::CountMatrix) it came from.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedMatrix {
    /// The normalized data (genes × samples).
    #[serde(skip)]
    pub data: DMatrix<f64>,
    /// Sample identifiers.
    pub sample_ids: Vec<String>,
    /// Method that produced the values.
    pub method: Method,
    /// Per-sample divisor applied to the raw counts.
    pub scale_factors: Vec<f64>,
    /// Reference sample, for methods that pick one.
    pub reference_sample: Option<usize>,
    /// Whether data is log-transformed.
    pub log_transformed: bool,
    /// Quartile used as the divisor, for quartile normalization.
    ///
    /// The column label stays `rnaseq_upper_quartile` whichever quartile is
    /// chosen.
    pub quartile: Option<Quartile>,
    /// Recoverable numerical problems hit while computing factors.
    pub warnings: Vec<DegenerateWeightSum>,
}

impl NormalizedMatrix {
    /// Get the normalized value for a gene and sample.
    pub fn get(&self, gene: usize, sample: usize) -> f64 {
        self.data[(gene, sample)]
    }

    /// Number of genes.
    pub fn n_genes(&self) -> usize {
        self.data.nrows()
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Get a column (sample) as a vector.
    pub fn col(&self, sample: usize) -> Vec<f64> {
        self.data.column(sample).iter().copied().collect()
    }

    /// Keep only the given gene rows, in the given order.
    pub fn select_genes(&self, indices: &[usize]) -> Self {
        Self {
            data: self.data.select_rows(indices),
            sample_ids: self.sample_ids.clone(),
            method: self.method,
            scale_factors: self.scale_factors.clone(),
            reference_sample: self.reference_sample,
            log_transformed: self.log_transformed,
            quartile: self.quartile,
            warnings: self.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_metadata_without_values() {
        let matrix = NormalizedMatrix {
            data: DMatrix::from_element(2, 2, 0.5),
            sample_ids: vec!["S1".into(), "S2".into()],
            method: Method::Cpm,
            scale_factors: vec![1e-6, 2e-6],
            reference_sample: None,
            log_transformed: false,
            quartile: None,
            warnings: Vec::new(),
        };

        let json = serde_json::to_value(&matrix).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["method"], "Cpm");
        assert_eq!(json["sample_ids"][1], "S2");
    }
}
