//! End-to-end run: assemble, normalize, filter, write.

use crate::assemble::assemble;
use crate::data::CountMatrix;
use crate::error::Result;
use crate::filter::{read_gene_list, select_genes, GENE_NAME_COLUMN};
use crate::normalize::{normalize, NormRequest, NormalizeOptions, Normalized, Quartile};
use crate::output::{write_normalized, FactorReport, Layout};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_output() -> PathBuf {
    PathBuf::from("normalized.txt")
}

fn default_gene_column() -> String {
    GENE_NAME_COLUMN.to_string()
}

/// Run configuration, loadable from YAML.
///
/// Method options sit at the top level next to the output options:
///
/// ```yaml
/// output: normalized.txt
/// layout: wide
/// quartile: upper
/// tmm:
///   trim_fold_change: 0.3
///   trim_abs_expr: 0.05
///   reference_sample: null
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Output table path.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Output layout.
    #[serde(default)]
    pub layout: Layout,
    /// Where to also write the assembled count matrix.
    #[serde(default)]
    pub merged: Option<PathBuf>,
    /// Gene list restricting the output rows.
    #[serde(default)]
    pub genes: Option<PathBuf>,
    /// Annotation column matched against the gene list.
    #[serde(default = "default_gene_column")]
    pub gene_column: String,
    /// Where to write the JSON scale-factor report.
    #[serde(default)]
    pub factors: Option<PathBuf>,
    /// Method-specific options.
    #[serde(flatten)]
    pub normalize: NormalizeOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            layout: Layout::default(),
            merged: None,
            genes: None,
            gene_column: default_gene_column(),
            factors: None,
            normalize: NormalizeOptions::default(),
        }
    }
}

impl RunConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub n_genes: usize,
    pub n_samples: usize,
    /// Genes in the written output, after any gene-list filter.
    pub n_output_genes: usize,
    pub rows_written: usize,
    pub output: PathBuf,
    /// Recoverable warnings raised across all methods.
    pub n_warnings: usize,
}

/// Builder for a normalization run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    request: NormRequest,
    config: RunConfig,
}

impl Pipeline {
    /// Create a pipeline with default options.
    pub fn new(request: NormRequest) -> Self {
        Self::from_config(request, RunConfig::default())
    }

    /// Create from a config.
    pub fn from_config(request: NormRequest, config: RunConfig) -> Self {
        Self { request, config }
    }

    /// Current configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Set the output table path.
    pub fn output<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.output = path.into();
        self
    }

    /// Set the output layout.
    pub fn layout(mut self, layout: Layout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Also write the assembled matrix.
    pub fn merged<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.merged = Some(path.into());
        self
    }

    /// Restrict output rows to the genes listed in a file.
    pub fn genes<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.genes = Some(path.into());
        self
    }

    /// Annotation column matched against the gene list.
    pub fn gene_column(mut self, column: &str) -> Self {
        self.config.gene_column = column.to_string();
        self
    }

    /// Write a JSON scale-factor report.
    pub fn factors<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.factors = Some(path.into());
        self
    }

    /// Quartile for upper-quartile normalization.
    pub fn quartile(mut self, quartile: Quartile) -> Self {
        self.config.normalize.quartile = quartile;
        self
    }

    /// Explicit TMM reference sample, by id or column index.
    pub fn reference(mut self, reference: &str) -> Self {
        self.config.normalize.tmm.reference_sample = Some(reference.to_string());
        self
    }

    /// TMM M-value trim per tail.
    pub fn trim_fold_change(mut self, trim: f64) -> Self {
        self.config.normalize.tmm.trim_fold_change = trim;
        self
    }

    /// TMM A-value trim per tail.
    pub fn trim_abs_expr(mut self, trim: f64) -> Self {
        self.config.normalize.tmm.trim_abs_expr = trim;
        self
    }

    /// Normalize an assembled matrix and apply the gene-list filter.
    ///
    /// Returns the (possibly filtered) counts alongside the results so both
    /// stay row-aligned for output.
    pub fn normalize_matrix(&self, counts: &CountMatrix) -> Result<(CountMatrix, Normalized)> {
        let normalized = normalize(counts, self.request, &self.config.normalize)?;

        match &self.config.genes {
            Some(path) => {
                let names = read_gene_list(path)?;
                let keep = select_genes(counts, &names, &self.config.gene_column)?;
                Ok((counts.subset_genes(&keep)?, normalized.select_genes(&keep)))
            }
            None => Ok((counts.clone(), normalized)),
        }
    }

    /// Run on per-sample input files.
    pub fn run<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<RunSummary> {
        let counts = assemble(inputs)?;

        if let Some(path) = &self.config.merged {
            counts.to_tsv(path)?;
            info!("Wrote merged matrix to {}", path.display());
        }

        let (output_counts, normalized) = self.normalize_matrix(&counts)?;

        let rows_written = write_normalized(
            &self.config.output,
            &output_counts,
            &normalized,
            self.config.layout,
        )?;
        info!(
            "Wrote {} rows to {}",
            rows_written,
            self.config.output.display()
        );

        if let Some(path) = &self.config.factors {
            FactorReport::from_normalized(&normalized).to_file(path)?;
            info!("Wrote scale factors to {}", path.display());
        }

        Ok(RunSummary {
            n_genes: counts.n_genes(),
            n_samples: counts.n_samples(),
            n_output_genes: output_counts.n_genes(),
            rows_written,
            output: self.config.output.clone(),
            n_warnings: normalized.matrices().iter().map(|m| m.warnings.len()).sum(),
        })
    }
}
