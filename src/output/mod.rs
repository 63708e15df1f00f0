//! Writing normalized results.
//!
//! Two layouts are supported:
//!
//! - **Wide** (default): one row per sample. Every value field is the whole
//!   per-gene series for that sample, comma-joined in matrix row order. This
//!   is the record format the downstream importer reads.
//! - **Long**: one row per gene × sample, led by the gene's annotation columns.
//!
//! Missing values are written as `NaN`, so a wide series always has one
//! element per gene and can be split back with [`split_series`].

mod report;

pub use report::{FactorReport, MethodFactors, SampleFactor};

use crate::data::{CountMatrix, NormalizedMatrix};
use crate::error::{NormError, Result};
use crate::normalize::Normalized;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Column holding the raw counts in single-method output.
pub const COUNT_COLUMN: &str = "rnaseq_count";
/// Column holding the sample identifier.
pub const SAMPLE_COLUMN: &str = "sample_id";

/// Output table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One row per sample with comma-joined series.
    #[default]
    Wide,
    /// One row per gene and sample.
    Long,
}

/// Format a normalized value.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

/// Format a raw count, without a fractional part when it is integral.
pub fn format_count(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format_value(value)
    }
}

/// Comma-join a series of values.
pub fn join_series<I>(values: I, format: fn(f64) -> String) -> String
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().map(format).collect::<Vec<_>>().join(",")
}

/// Split a comma-joined series, checking it has `expected` elements.
pub fn split_series(field: &str, expected: usize) -> Result<Vec<f64>> {
    let values = field
        .split(',')
        .map(|raw| {
            raw.trim().parse::<f64>().map_err(|_| {
                NormError::InvalidParameter(format!("'{}' in series is not a number", raw))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.len() != expected {
        return Err(NormError::DimensionMismatch {
            expected,
            actual: values.len(),
        });
    }
    Ok(values)
}

/// Column labels for the value fields of a result.
fn value_columns(normalized: &Normalized) -> Vec<&'static str> {
    match normalized {
        Normalized::Single(m) => vec![m.method.label()],
        Normalized::All(ms) => ms.iter().map(|m| m.method.short_label()).collect(),
    }
}

/// Write one row per sample.
///
/// Single-method output carries `sample_id`, `rnaseq_count` and the method's
/// column; `ALL` output carries `sample_id` and one column per method.
pub fn write_wide<W: Write>(
    writer: W,
    counts: &CountMatrix,
    normalized: &Normalized,
) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    let matrices = normalized.matrices();
    let with_counts = matches!(normalized, Normalized::Single(_));

    let mut header = vec![SAMPLE_COLUMN];
    if with_counts {
        header.push(COUNT_COLUMN);
    }
    header.extend(value_columns(normalized));
    writer.write_record(&header)?;

    for (j, sample_id) in counts.sample_ids().iter().enumerate() {
        let mut record = vec![sample_id.clone()];
        if with_counts {
            record.push(join_series(counts.col(j), format_count));
        }
        record.extend(matrices.iter().map(|m| join_series(m.col(j), format_value)));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(counts.n_samples())
}

/// Write one row per gene and sample, samples outermost.
pub fn write_long<W: Write>(
    writer: W,
    counts: &CountMatrix,
    normalized: &Normalized,
) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    let matrices = normalized.matrices();
    let with_counts = matches!(normalized, Normalized::Single(_));

    let mut header: Vec<&str> = counts.annotation_columns().iter().map(String::as_str).collect();
    header.push(SAMPLE_COLUMN);
    if with_counts {
        header.push(COUNT_COLUMN);
    }
    header.extend(value_columns(normalized));
    writer.write_record(&header)?;

    let mut rows = 0;
    for (j, sample_id) in counts.sample_ids().iter().enumerate() {
        for (i, key) in counts.gene_keys().iter().enumerate() {
            let mut record: Vec<String> = key.values().iter().map(|v| v.to_string()).collect();
            record.push(sample_id.clone());
            if with_counts {
                record.push(format_count(counts.get(i, j)));
            }
            record.extend(matrices.iter().map(|m| format_value(m.get(i, j))));
            writer.write_record(&record)?;
            rows += 1;
        }
    }
    writer.flush()?;

    Ok(rows)
}

/// Write results to `path` in the chosen layout. Returns the number of data
/// rows written.
pub fn write_normalized<P: AsRef<Path>>(
    path: P,
    counts: &CountMatrix,
    normalized: &Normalized,
    layout: Layout,
) -> Result<usize> {
    check_shapes(counts, normalized.matrices())?;

    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    match layout {
        Layout::Wide => write_wide(file, counts, normalized),
        Layout::Long => write_long(file, counts, normalized),
    }
}

fn check_shapes(counts: &CountMatrix, matrices: &[NormalizedMatrix]) -> Result<()> {
    for m in matrices {
        if m.n_genes() != counts.n_genes() {
            return Err(NormError::DimensionMismatch {
                expected: counts.n_genes(),
                actual: m.n_genes(),
            });
        }
        if m.n_samples() != counts.n_samples() {
            return Err(NormError::DimensionMismatch {
                expected: counts.n_samples(),
                actual: m.n_samples(),
            });
        }
    }
    Ok(())
}
