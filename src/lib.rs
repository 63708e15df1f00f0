//! RNA-seq Count Normalization Library
//!
//! This library merges per-sample gene-level read-count tables into one
//! gene × sample matrix and normalizes it across samples.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **assemble**: Read per-sample tables and join them on typed gene keys
//! - **data**: Core data structures (CountMatrix, GeneKey, NormalizedMatrix)
//! - **normalize**: Normalization methods (total count, quartile, median of
//!   ratios, TMM, CPM, TPM, RPKM) and the method dispatcher
//! - **filter**: Gene-list filtering
//! - **output**: Wide/long result tables and the scale-factor report
//! - **pipeline**: Run configuration and end-to-end execution
//!
//! # Example
//!
//! ```no_run
//! use rnaseq_norm::prelude::*;
//!
//! // Merge per-sample tables
//! let counts = assemble(&["S1.txt", "S2.txt"]).unwrap();
//!
//! // Normalize and write one row per sample
//! let request: NormRequest = "TMM".parse().unwrap();
//! let result = normalize(&counts, request, &NormalizeOptions::default()).unwrap();
//! write_normalized("normalized.txt", &counts, &result, Layout::Wide).unwrap();
//! ```

pub mod assemble;
pub mod data;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod output;
pub mod pipeline;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::assemble::{assemble, join_tables, read_sample_table, SampleTable};
    pub use crate::data::{CountMatrix, GeneKey, KeyKind, KeyValue, NormalizedMatrix};
    pub use crate::error::{NormError, Result};
    pub use crate::filter::{read_gene_list, select_genes};
    pub use crate::normalize::{
        apply, norm_cpm, norm_median_of_ratios, norm_quartile, norm_rpkm, norm_tmm,
        norm_tmm_with_config, norm_total_count, norm_tpm, normalize, percentile, size_factors,
        tmm_factors, DegenerateWeightSum, Method, NormRequest, NormalizeOptions, Normalized,
        Quartile, TmmConfig, TmmMatrix,
    };
    pub use crate::output::{
        join_series, split_series, write_normalized, FactorReport, Layout,
    };
    pub use crate::pipeline::{Pipeline, RunConfig, RunSummary};
}
