//! rnanorm - RNA-seq count normalization CLI
//!
//! Merges per-sample count tables and writes one normalization of them.

use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};
use rnaseq_norm::error::Result;
use rnaseq_norm::normalize::{NormRequest, Quartile};
use rnaseq_norm::output::Layout;
use rnaseq_norm::pipeline::{Pipeline, RunConfig};
use std::path::{Path, PathBuf};

/// CLI-friendly output layout enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLayout {
    /// One row per sample, comma-joined per-gene series
    Wide,
    /// One row per gene and sample
    Long,
}

impl From<CliLayout> for Layout {
    fn from(layout: CliLayout) -> Self {
        match layout {
            CliLayout::Wide => Layout::Wide,
            CliLayout::Long => Layout::Long,
        }
    }
}

/// Normalize RNA-seq read counts across samples
#[derive(Parser)]
#[command(name = "rnanorm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Normalization: Total_count, Upper-quartile-default, Median_of_ratios,
    /// TMM, CPM, TPM, RPKM or ALL
    #[arg(required_unless_present = "example_config")]
    norm_type: Option<String>,

    /// Per-sample count tables (annotation columns, then one count column)
    #[arg(required_unless_present = "example_config")]
    files: Vec<PathBuf>,

    /// Output path for the normalized table [default: normalized.txt]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output layout
    #[arg(long, value_enum)]
    layout: Option<CliLayout>,

    /// Also write the merged count matrix here
    #[arg(long)]
    merged: Option<PathBuf>,

    /// Keep only genes listed (one per line) in this file
    #[arg(long)]
    genes: Option<PathBuf>,

    /// Annotation column matched against --genes [default: GeneName]
    #[arg(long)]
    gene_column: Option<String>,

    /// TMM reference sample, by sample id or column index
    #[arg(long)]
    reference: Option<String>,

    /// TMM: fraction of M-values trimmed per tail [default: 0.3]
    #[arg(long)]
    trim_fold_change: Option<f64>,

    /// TMM: fraction of A-values trimmed per tail [default: 0.05]
    #[arg(long)]
    trim_abs_expr: Option<f64>,

    /// Quartile for Upper-quartile mode: lower, median, upper, 1, 2 or 3
    #[arg(long)]
    quartile: Option<String>,

    /// Write per-sample scale factors as JSON here
    #[arg(long)]
    factors: Option<PathBuf>,

    /// YAML run configuration; command-line options override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write an example YAML configuration and exit
    #[arg(long)]
    example_config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match &cli.example_config {
        Some(path) => cmd_example_config(path),
        None => cmd_normalize(&cli),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Build the run configuration: YAML file first, then command-line overrides.
fn build_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            RunConfig::from_yaml_file(path)?
        }
        None => RunConfig::default(),
    };

    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(layout) = cli.layout {
        config.layout = layout.into();
    }
    if let Some(merged) = &cli.merged {
        config.merged = Some(merged.clone());
    }
    if let Some(genes) = &cli.genes {
        config.genes = Some(genes.clone());
    }
    if let Some(column) = &cli.gene_column {
        config.gene_column = column.clone();
    }
    if let Some(factors) = &cli.factors {
        config.factors = Some(factors.clone());
    }
    if let Some(quartile) = &cli.quartile {
        config.normalize.quartile = quartile.parse::<Quartile>()?;
    }
    if let Some(reference) = &cli.reference {
        config.normalize.tmm.reference_sample = Some(reference.clone());
    }
    if let Some(trim) = cli.trim_fold_change {
        config.normalize.tmm.trim_fold_change = trim;
    }
    if let Some(trim) = cli.trim_abs_expr {
        config.normalize.tmm.trim_abs_expr = trim;
    }

    Ok(config)
}

/// Assemble the inputs and write the requested normalization
fn cmd_normalize(cli: &Cli) -> Result<()> {
    let request = cli.norm_type.as_deref().unwrap_or_default().parse::<NormRequest>()?;
    let config = build_config(cli)?;

    info!("Merging {} input files...", cli.files.len());
    let summary = Pipeline::from_config(request, config).run(&cli.files)?;

    info!(
        "Done! {} genes x {} samples, {} rows written to {}",
        summary.n_output_genes,
        summary.n_samples,
        summary.rows_written,
        summary.output.display()
    );
    if summary.n_warnings > 0 {
        info!("  {} recoverable warnings (see log above)", summary.n_warnings);
    }

    Ok(())
}

/// Write an example configuration with every option at its default
fn cmd_example_config(path: &Path) -> Result<()> {
    let yaml = RunConfig::default().to_yaml()?;
    std::fs::write(path, yaml)?;
    info!("Wrote example configuration to {}", path.display());
    Ok(())
}
