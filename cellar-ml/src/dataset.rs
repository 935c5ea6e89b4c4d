//! CSV dataset access: header inspection, row tables and numeric frames.

use crate::error::MlError;
use csv::StringRecord;
use ndarray::{Array1, Array2};
use std::path::Path;

/// Read only the header row of a CSV file.
///
/// Names are returned verbatim: no trimming, no case folding.
pub fn read_header(path: &Path) -> Result<Vec<String>, MlError> {
    ensure_exists(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    Ok(reader.headers()?.iter().map(String::from).collect())
}

fn ensure_exists(path: &Path) -> Result<(), MlError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(MlError::not_found(format!(
            "dataset file not found: {}",
            path.display()
        )))
    }
}

/// Header plus raw rows of a CSV file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl CsvTable {
    /// Load every row. Rows whose width differs from the header are an error.
    pub fn read(path: &Path) -> Result<Self, MlError> {
        ensure_exists(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(path)?;
        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the header and the rows at `indices`, in that order.
    pub fn write_subset(&self, path: &Path, indices: &[usize]) -> Result<(), MlError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for &idx in indices {
            let row = self.rows.get(idx).ok_or_else(|| {
                MlError::dataset(format!("row index {idx} out of range ({} rows)", self.len()))
            })?;
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn column_index(&self, name: &str) -> Result<usize, MlError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| MlError::dataset(format!("column '{name}' not found in CSV header")))
    }
}

/// Numeric feature matrix and target vector extracted from a CSV table.
#[derive(Debug, Clone)]
pub struct NumericFrame {
    pub feature_names: Vec<String>,
    pub features: Array2<f64>,
    pub target: Array1<f64>,
}

impl NumericFrame {
    /// Parse `path`, locating features and target by header name.
    ///
    /// The matrix columns follow `feature_names` order, not the file order.
    pub fn from_csv<S: AsRef<str>>(
        path: &Path,
        feature_names: &[S],
        target_column: &str,
    ) -> Result<Self, MlError> {
        let table = CsvTable::read(path)?;
        Self::from_table(&table, feature_names, target_column)
    }

    pub fn from_table<S: AsRef<str>>(
        table: &CsvTable,
        feature_names: &[S],
        target_column: &str,
    ) -> Result<Self, MlError> {
        if table.is_empty() {
            return Err(MlError::dataset("dataset has no rows"));
        }
        if feature_names.is_empty() {
            return Err(MlError::dataset("no feature columns requested"));
        }
        let feature_idx = feature_names
            .iter()
            .map(|name| table.column_index(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let target_idx = table.column_index(target_column)?;

        let n_rows = table.len();
        let n_cols = feature_idx.len();
        let mut values = Vec::with_capacity(n_rows * n_cols);
        let mut target = Vec::with_capacity(n_rows);

        for (row_no, row) in table.rows.iter().enumerate() {
            for (&col, name) in feature_idx.iter().zip(feature_names) {
                values.push(parse_cell(row, col, row_no, name.as_ref())?);
            }
            target.push(parse_cell(row, target_idx, row_no, target_column)?);
        }

        let features = Array2::from_shape_vec((n_rows, n_cols), values)
            .map_err(|e| MlError::dataset(format!("cannot shape feature matrix: {e}")))?;

        Ok(Self {
            feature_names: feature_names.iter().map(|s| s.as_ref().to_string()).collect(),
            features,
            target: Array1::from(target),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }
}

/// Rows are reported 1-based and counted after the header.
fn parse_cell(row: &StringRecord, col: usize, row_no: usize, column: &str) -> Result<f64, MlError> {
    let raw = row.get(col).unwrap_or_default();
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(MlError::dataset(format!(
            "non-numeric value '{raw}' in column '{column}' at row {}",
            row_no + 1
        ))),
    }
}
