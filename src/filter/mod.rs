//! Filtering primitives for count matrices and results.

pub mod genes;

pub use genes::{parse_gene_list, read_gene_list, select_genes, GENE_NAME_COLUMN};
