//! Data structures for count assembly and normalization.

mod count_matrix;
mod gene_key;
mod normalized;

pub use count_matrix::{CountMatrix, LENGTH_COLUMN};
pub use gene_key::{GeneKey, KeyKind, KeyValue};
pub use normalized::NormalizedMatrix;
