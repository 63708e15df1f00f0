//! Error types for the rnaseq-norm library.

use crate::data::KeyKind;
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum NormError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input file '{file}': {reason}")]
    InputFormat { file: String, reason: String },

    #[error("Invalid count value '{value}' in '{file}' at line {line}")]
    InvalidCount {
        file: String,
        value: String,
        line: u64,
    },

    #[error(
        "Key column '{column}' in '{file}' holds {found} values, but earlier files hold {expected} values"
    )]
    KeyKindMismatch {
        file: String,
        column: String,
        expected: KeyKind,
        found: KeyKind,
    },

    #[error("Sample column '{0}' appears in more than one input file")]
    DuplicateSample(String),

    #[error(
        "Unrecognized normalization method '{0}' (expected one of: Total_count, \
         Upper-quartile-default, Median_of_ratios, TMM, CPM, TPM, RPKM, ALL)"
    )]
    UnrecognizedMethod(String),

    #[error("Invalid length '{value}' for gene '{gene}'")]
    InvalidGeneLength { gene: String, value: String },

    #[error(
        "Median-of-ratios size factor for sample '{sample}' is undefined: \
         no gene has a positive count in every sample"
    )]
    AllZeroGene { sample: String },

    #[error("Reference undefined: {0}")]
    ReferenceUndefined(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, NormError>;
