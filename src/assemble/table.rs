//! Reading a single per-sample count table.

use crate::data::{GeneKey, KeyKind, KeyValue};
use crate::error::{NormError, Result};
use std::path::{Path, PathBuf};

/// One per-sample count table: K annotation columns followed by a count column.
#[derive(Debug, Clone)]
pub struct SampleTable {
    pub path: PathBuf,
    /// Header names of the annotation columns.
    pub annotation_columns: Vec<String>,
    /// Header of the count column, used as the sample identifier.
    pub sample_id: String,
    /// Inferred kind of each annotation column.
    pub key_kinds: Vec<KeyKind>,
    /// Gene keys in file order (repeats are kept).
    pub keys: Vec<GeneKey>,
    /// Raw counts in file order; NaN marks a missing value.
    pub counts: Vec<f64>,
}

impl SampleTable {
    #[inline]
    pub fn n_genes(&self) -> usize {
        self.keys.len()
    }

    /// Display form of the source path for error messages.
    pub fn file_name(&self) -> String {
        self.path.display().to_string()
    }
}

pub(crate) fn input_error(path: &Path, reason: impl Into<String>) -> NormError {
    NormError::InputFormat {
        file: path.display().to_string(),
        reason: reason.into(),
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| input_error(path, e.to_string()))
}

/// Number of annotation columns, taken from a table's header width minus one.
pub fn annotation_width<P: AsRef<Path>>(path: P) -> Result<usize> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let width = reader
        .headers()
        .map_err(|e| input_error(path, e.to_string()))?
        .len();

    if width < 2 {
        return Err(input_error(
            path,
            format!(
                "expected at least one annotation column and one count column, found {} column(s)",
                width
            ),
        ));
    }

    Ok(width - 1)
}

/// Parse a count cell. Returns `None` for unparseable values.
///
/// Empty, `NA` and `NaN` cells are missing values.
fn parse_count(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
    {
        return Some(f64::NAN);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Read a per-sample count table with `n_annotation` key columns.
pub fn read_sample_table<P: AsRef<Path>>(path: P, n_annotation: usize) -> Result<SampleTable> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;

    let header = reader
        .headers()
        .map_err(|e| input_error(path, e.to_string()))?
        .clone();
    if header.len() != n_annotation + 1 {
        return Err(input_error(
            path,
            format!(
                "expected {} columns ({} annotation + 1 count), found {}",
                n_annotation + 1,
                n_annotation,
                header.len()
            ),
        ));
    }

    let annotation_columns: Vec<String> =
        header.iter().take(n_annotation).map(str::to_string).collect();
    let sample_id = header[n_annotation].trim().to_string();
    if sample_id.is_empty() {
        return Err(input_error(path, "count column has an empty header"));
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| input_error(path, e.to_string()))?;
        let line = record.position().map_or(0, |p| p.line());
        if record.len() != n_annotation + 1 {
            return Err(input_error(
                path,
                format!(
                    "line {} has {} columns, expected {}",
                    line,
                    record.len(),
                    n_annotation + 1
                ),
            ));
        }
        records.push((line, record));
    }

    if records.is_empty() {
        return Err(input_error(path, "no gene rows"));
    }

    let key_kinds: Vec<KeyKind> = (0..n_annotation)
        .map(|col| KeyKind::infer(records.iter().map(|(_, r)| &r[col])))
        .collect();

    let mut keys = Vec::with_capacity(records.len());
    let mut counts = Vec::with_capacity(records.len());
    for (line, record) in &records {
        let values = key_kinds
            .iter()
            .enumerate()
            .map(|(col, &kind)| {
                KeyValue::parse(&record[col], kind).ok_or_else(|| {
                    input_error(
                        path,
                        format!(
                            "line {}: '{}' is not a valid {} key",
                            line, &record[col], kind
                        ),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        keys.push(GeneKey::new(values));

        let raw = &record[n_annotation];
        let count = parse_count(raw).ok_or_else(|| NormError::InvalidCount {
            file: path.display().to_string(),
            value: raw.to_string(),
            line: *line,
        })?;
        counts.push(count);
    }

    Ok(SampleTable {
        path: path.to_path_buf(),
        annotation_columns,
        sample_id,
        key_kinds,
        keys,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_table(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_annotation_width() {
        let file = write_table("gene_id\tGeneName\tLength\tS1\ng1\tA\t100\t5\n");
        assert_eq!(annotation_width(file.path()).unwrap(), 3);
    }

    #[test]
    fn test_annotation_width_single_column() {
        let file = write_table("S1\n5\n");
        assert!(matches!(
            annotation_width(file.path()),
            Err(NormError::InputFormat { .. })
        ));
    }

    #[test]
    fn test_read_table() {
        let file = write_table("GeneName\tLength\tS1\nA\t100\t5\nB\t250.5\t0\nC\t90\tNA\n");
        let table = read_sample_table(file.path(), 2).unwrap();

        assert_eq!(table.sample_id, "S1");
        assert_eq!(table.annotation_columns, vec!["GeneName", "Length"]);
        assert_eq!(table.key_kinds, vec![KeyKind::Text, KeyKind::Decimal]);
        assert_eq!(table.n_genes(), 3);
        assert_eq!(table.counts[0], 5.0);
        assert_eq!(table.counts[1], 0.0);
        assert!(table.counts[2].is_nan());
    }

    #[test]
    fn test_missing_file() {
        let result = read_sample_table("/nonexistent/sample.tsv", 1);
        match result {
            Err(NormError::InputFormat { file, .. }) => assert!(file.contains("sample.tsv")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_column_count() {
        let file = write_table("GeneName\tS1\nA\t5\n");
        assert!(read_sample_table(file.path(), 2).is_err());
    }

    #[test]
    fn test_ragged_row() {
        let file = write_table("GeneName\tS1\nA\t5\nB\n");
        let err = read_sample_table(file.path(), 1).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_negative_count() {
        let file = write_table("GeneName\tS1\nA\t-4\n");
        assert!(matches!(
            read_sample_table(file.path(), 1),
            Err(NormError::InvalidCount { line: 2, .. })
        ));
    }

    #[test]
    fn test_empty_table() {
        let file = write_table("GeneName\tS1\n");
        assert!(read_sample_table(file.path(), 1).is_err());
    }
}
