//! Per-sample scale factor report, written as JSON.

use crate::data::NormalizedMatrix;
use crate::error::Result;
use crate::normalize::{DegenerateWeightSum, Normalized, Quartile};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scale factor of one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFactor {
    pub sample_id: String,
    pub factor: f64,
}

/// Factors computed by one method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodFactors {
    /// Method column label, as in the result table.
    pub method: String,
    pub log_transformed: bool,
    /// Quartile divisor of quartile normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quartile: Option<Quartile>,
    pub reference_sample: Option<String>,
    pub factors: Vec<SampleFactor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DegenerateWeightSum>,
}

impl MethodFactors {
    fn from_matrix(matrix: &NormalizedMatrix) -> Self {
        Self {
            method: matrix.method.label().to_string(),
            log_transformed: matrix.log_transformed,
            quartile: matrix.quartile,
            reference_sample: matrix
                .reference_sample
                .map(|j| matrix.sample_ids[j].clone()),
            factors: matrix
                .sample_ids
                .iter()
                .zip(&matrix.scale_factors)
                .map(|(sample_id, &factor)| SampleFactor {
                    sample_id: sample_id.clone(),
                    factor,
                })
                .collect(),
            warnings: matrix.warnings.clone(),
        }
    }
}

/// Scale factors of every method in a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorReport {
    pub n_genes: usize,
    pub n_samples: usize,
    pub methods: Vec<MethodFactors>,
}

impl FactorReport {
    /// Collect the factors of a dispatcher result.
    pub fn from_normalized(normalized: &Normalized) -> Self {
        let matrices = normalized.matrices();
        let (n_genes, n_samples) = matrices
            .first()
            .map(|m| (m.n_genes(), m.n_samples()))
            .unwrap_or((0, 0));

        Self {
            n_genes,
            n_samples,
            methods: matrices.iter().map(MethodFactors::from_matrix).collect(),
        }
    }

    /// Factors reported for a method label, if present.
    pub fn method(&self, label: &str) -> Option<&MethodFactors> {
        self.methods.iter().find(|m| m.method == label)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write JSON to a file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a report back from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
