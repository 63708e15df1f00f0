//! Normalization methods for RNA-seq count matrices.
//!
//! This module provides several normalization approaches:
//!
//! - **Total count**: per-sample fraction of the library
//! - **Quartile**: division by a per-sample quartile of expressed genes
//! - **Median of ratios**: DESeq-style size factors, log2 output
//! - **TMM**: Trimmed mean of M-values (robust to composition shifts)
//! - **CPM / TPM / RPKM**: depth and feature-length scaled units
//!
//! [`normalize`] dispatches a [`NormRequest`] to one method, or to the five
//! methods of the combined `ALL` mode.

pub mod length;
pub mod median_ratios;
pub mod percentile;
pub mod quartile;
pub mod tmm;
pub mod total;

pub use length::{norm_cpm, norm_rpkm, norm_tpm};
pub use median_ratios::{norm_median_of_ratios, size_factors};
pub use percentile::{expressed_genes, percentile};
pub use quartile::{norm_quartile, Quartile};
pub use tmm::{norm_tmm, norm_tmm_with_config, tmm_factors, DegenerateWeightSum, TmmConfig, TmmMatrix};
pub use total::norm_total_count;

use crate::data::{CountMatrix, NormalizedMatrix};
use crate::error::{NormError, Result};
use log::{debug, info, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single normalization method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    TotalCount,
    UpperQuartile,
    MedianOfRatios,
    Tmm,
    Cpm,
    Tpm,
    Rpkm,
}

impl Method {
    /// Methods run together by the `ALL` request, in output order.
    pub const ALL_MODE: [Method; 5] = [
        Method::MedianOfRatios,
        Method::Tmm,
        Method::Cpm,
        Method::Tpm,
        Method::Rpkm,
    ];

    /// Output column label in single-method mode.
    pub fn label(&self) -> &'static str {
        match self {
            Method::TotalCount => "rnaseq_total",
            Method::UpperQuartile => "rnaseq_upper_quartile",
            Method::MedianOfRatios => "rnaseq_median_of_ratios",
            Method::Tmm => "rnaseq_tmm",
            Method::Cpm => "rnaseq_cpm",
            Method::Tpm => "rnaseq_tpm",
            Method::Rpkm => "rnaseq_fpkm",
        }
    }

    /// Output column label in `ALL` mode.
    pub fn short_label(&self) -> &'static str {
        match self {
            Method::TotalCount => "total",
            Method::UpperQuartile => "upper_quartile",
            Method::MedianOfRatios => "median_of_ratios",
            Method::Tmm => "tmm",
            Method::Cpm => "cpm",
            Method::Tpm => "tpm",
            Method::Rpkm => "rpkm",
        }
    }

    /// Whether the method reads per-gene feature lengths.
    pub fn needs_lengths(&self) -> bool {
        matches!(self, Method::Tpm | Method::Rpkm)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::TotalCount => "Total_count",
            Method::UpperQuartile => "Upper-quartile",
            Method::MedianOfRatios => "Median_of_ratios",
            Method::Tmm => "TMM",
            Method::Cpm => "CPM",
            Method::Tpm => "TPM",
            Method::Rpkm => "RPKM",
        };
        f.write_str(name)
    }
}

/// What the caller asked for: one method, or the combined set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormRequest {
    Single(Method),
    All,
}

impl NormRequest {
    /// Methods this request runs, in output order.
    pub fn methods(&self) -> Vec<Method> {
        match self {
            NormRequest::Single(method) => vec![*method],
            NormRequest::All => Method::ALL_MODE.to_vec(),
        }
    }
}

impl FromStr for NormRequest {
    type Err = NormError;

    /// Accepts the pipeline's method names (`Total_count`, `Median_of_ratios`,
    /// `Upper-quartile-default`, ...) case-insensitively, with `-` and `_`
    /// interchangeable.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        let request = match key.as_str() {
            "total_count" | "total" => NormRequest::Single(Method::TotalCount),
            "upper_quartile_default" | "upper_quartile" | "quartile" => {
                NormRequest::Single(Method::UpperQuartile)
            }
            "median_of_ratios" | "deseq" => NormRequest::Single(Method::MedianOfRatios),
            "tmm" => NormRequest::Single(Method::Tmm),
            "cpm" => NormRequest::Single(Method::Cpm),
            "tpm" => NormRequest::Single(Method::Tpm),
            "rpkm" | "fpkm" => NormRequest::Single(Method::Rpkm),
            "all" => NormRequest::All,
            _ => return Err(NormError::UnrecognizedMethod(s.to_string())),
        };
        Ok(request)
    }
}

/// Method-specific options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Quartile used by the upper-quartile method.
    pub quartile: Quartile,
    /// TMM trimming and reference options.
    pub tmm: TmmConfig,
}

/// Output of the dispatcher.
#[derive(Debug, Clone)]
pub enum Normalized {
    /// One method's values.
    Single(NormalizedMatrix),
    /// One matrix per method of [`Method::ALL_MODE`], in that order.
    All(Vec<NormalizedMatrix>),
}

impl Normalized {
    /// All computed matrices, in output order.
    pub fn matrices(&self) -> &[NormalizedMatrix] {
        match self {
            Normalized::Single(matrix) => std::slice::from_ref(matrix),
            Normalized::All(matrices) => matrices,
        }
    }

    /// Keep only the given gene rows in every matrix.
    pub fn select_genes(&self, indices: &[usize]) -> Self {
        match self {
            Normalized::Single(m) => Normalized::Single(m.select_genes(indices)),
            Normalized::All(ms) => {
                Normalized::All(ms.iter().map(|m| m.select_genes(indices)).collect())
            }
        }
    }
}

/// Run the requested normalization.
pub fn normalize(
    counts: &CountMatrix,
    request: NormRequest,
    options: &NormalizeOptions,
) -> Result<Normalized> {
    info!(
        "Normalizing {} genes x {} samples ({})",
        counts.n_genes(),
        counts.n_samples(),
        match request {
            NormRequest::Single(method) => method.to_string(),
            NormRequest::All => "ALL".to_string(),
        }
    );

    match request {
        NormRequest::Single(method) => Ok(Normalized::Single(apply(counts, method, options)?)),
        NormRequest::All => Method::ALL_MODE
            .iter()
            .map(|&method| apply(counts, method, options))
            .collect::<Result<Vec<_>>>()
            .map(Normalized::All),
    }
}

/// Run a single normalization method.
///
/// Recoverable TMM problems are logged here, once per sample, and kept on the
/// returned matrix.
pub fn apply(
    counts: &CountMatrix,
    method: Method,
    options: &NormalizeOptions,
) -> Result<NormalizedMatrix> {
    let normalized = match method {
        Method::TotalCount => norm_total_count(counts)?,
        Method::UpperQuartile => norm_quartile(counts, options.quartile)?,
        Method::MedianOfRatios => norm_median_of_ratios(counts)?,
        Method::Tmm => norm_tmm_with_config(counts, &options.tmm)?.into_normalized(),
        Method::Cpm => norm_cpm(counts)?,
        Method::Tpm => norm_tpm(counts, &counts.gene_lengths()?)?,
        Method::Rpkm => norm_rpkm(counts, &counts.gene_lengths()?)?,
    };

    for warning in &normalized.warnings {
        warn!("{}", warning);
    }
    debug!("{} scale factors: {:?}", method, normalized.scale_factors);

    Ok(normalized)
}

/// Library sizes, failing on any sample without counts.
pub(crate) fn checked_library_sizes(counts: &CountMatrix, method: Method) -> Result<Vec<f64>> {
    let sizes = counts.col_sums();
    for (j, &size) in sizes.iter().enumerate() {
        if size <= 0.0 {
            return Err(NormError::Numerical(format!(
                "Sample '{}' has zero total counts, cannot apply {}",
                counts.sample_ids()[j],
                method
            )));
        }
    }
    Ok(sizes)
}

/// Divide every sample column by its scale factor.
pub(crate) fn scale_columns(
    counts: &CountMatrix,
    method: Method,
    scale_factors: Vec<f64>,
) -> NormalizedMatrix {
    let data = DMatrix::from_fn(counts.n_genes(), counts.n_samples(), |i, j| {
        counts.get(i, j) / scale_factors[j]
    });

    NormalizedMatrix {
        data,
        sample_ids: counts.sample_ids().to_vec(),
        method,
        scale_factors,
        reference_sample: None,
        log_transformed: false,
        quartile: None,
        warnings: Vec::new(),
    }
}
