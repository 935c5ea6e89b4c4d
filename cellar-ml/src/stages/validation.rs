//! Data validation: compare the CSV header with the declared schema.

use super::{PipelineStage, Stage, StageOutput, run_blocking};
use crate::dataset;
use crate::error::MlError;
use async_trait::async_trait;
use cellar_core::DataValidationConfig;
use cellar_core::persistence;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Outcome of a header check. `status` is true only for an exact match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: bool,
    pub missing_columns: Vec<String>,
    pub unexpected_columns: Vec<String>,
    pub order_mismatch: bool,
}

impl ValidationReport {
    /// Compare the actual header sequence to the expected one.
    pub fn compare<A: AsRef<str>, E: AsRef<str>>(actual: &[A], expected: &[E]) -> Self {
        let actual: Vec<&str> = actual.iter().map(AsRef::as_ref).collect();
        let expected: Vec<&str> = expected.iter().map(AsRef::as_ref).collect();
        let status = actual == expected;

        let missing_columns: Vec<String> = expected
            .iter()
            .filter(|c| !actual.contains(*c))
            .map(|c| c.to_string())
            .collect();
        let unexpected_columns: Vec<String> = actual
            .iter()
            .filter(|c| !expected.contains(*c))
            .map(|c| c.to_string())
            .collect();
        let order_mismatch = !status && missing_columns.is_empty() && unexpected_columns.is_empty();

        Self {
            status,
            missing_columns,
            unexpected_columns,
            order_mismatch,
        }
    }

    /// Line written to the status file.
    pub fn status_line(&self) -> String {
        format!("Validation status: {}", self.status)
    }
}

#[derive(Clone)]
pub struct ValidationStage {
    config: DataValidationConfig,
}

impl ValidationStage {
    pub fn new(config: DataValidationConfig) -> Self {
        Self { config }
    }

    /// Check the dataset header and record the outcome in the status file.
    pub fn validate_all_columns(&self) -> Result<ValidationReport, MlError> {
        let header = dataset::read_header(&self.config.unzip_data_dir)?;
        let report = ValidationReport::compare(&header, &self.config.schema.column_names());
        persistence::atomic_write(&self.config.status_file, report.status_line().as_bytes())?;

        if report.status {
            info!(columns = header.len(), "dataset header matches schema");
        } else {
            warn!(
                missing = ?report.missing_columns,
                unexpected = ?report.unexpected_columns,
                order_mismatch = report.order_mismatch,
                "dataset header does not match schema"
            );
        }
        Ok(report)
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn kind(&self) -> PipelineStage {
        PipelineStage::Validation
    }

    async fn run(&self) -> Result<StageOutput, MlError> {
        let stage = self.clone();
        run_blocking(self.kind(), move || {
            persistence::create_directories(&[&stage.config.root_dir])?;
            Ok(StageOutput::Validated(stage.validate_all_columns()?))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_core::{ColumnSpec, ColumnType, SchemaDescription};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const EXPECTED: [&str; 3] = ["pH", "alcohol", "quality"];

    #[test]
    fn test_exact_match() {
        let report = ValidationReport::compare(&EXPECTED, &EXPECTED);
        assert!(report.status);
        assert!(report.missing_columns.is_empty());
        assert!(!report.order_mismatch);
    }

    #[test]
    fn test_extra_column() {
        let report = ValidationReport::compare(&["pH", "alcohol", "quality", "id"], &EXPECTED);
        assert!(!report.status);
        assert_eq!(report.unexpected_columns, vec!["id"]);
    }

    #[test]
    fn test_missing_column() {
        let report = ValidationReport::compare(&["pH", "quality"], &EXPECTED);
        assert!(!report.status);
        assert_eq!(report.missing_columns, vec!["alcohol"]);
    }

    #[test]
    fn test_reordered_columns() {
        let report = ValidationReport::compare(&["alcohol", "pH", "quality"], &EXPECTED);
        assert!(!report.status);
        assert!(report.order_mismatch);
        assert!(report.missing_columns.is_empty());
    }

    #[test]
    fn test_rename_is_case_and_whitespace_sensitive() {
        let report = ValidationReport::compare(&["ph", "alcohol ", "quality"], &EXPECTED);
        assert!(!report.status);
        assert_eq!(report.missing_columns, vec!["pH", "alcohol"]);
        assert_eq!(report.unexpected_columns, vec!["ph", "alcohol "]);
    }

    fn stage(dir: &TempDir) -> ValidationStage {
        let columns = EXPECTED
            .iter()
            .map(|n| ColumnSpec {
                name: n.to_string(),
                dtype: ColumnType::Float64,
            })
            .collect();
        ValidationStage::new(DataValidationConfig {
            root_dir: dir.path().join("data_validation"),
            unzip_data_dir: dir.path().join("wine.csv"),
            status_file: dir.path().join("data_validation/status.txt"),
            schema: SchemaDescription {
                columns,
                target_column: "quality".into(),
            },
        })
    }

    #[tokio::test]
    async fn test_status_file_written() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("wine.csv"), "pH,alcohol,quality\n3.1,9.4,5\n").unwrap();
        let output = stage(&dir).run().await.unwrap();
        assert!(matches!(output, StageOutput::Validated(ref r) if r.status));
        let text = std::fs::read_to_string(dir.path().join("data_validation/status.txt")).unwrap();
        assert_eq!(text, "Validation status: true");
    }

    #[tokio::test]
    async fn test_mismatch_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("wine.csv"), "alcohol,pH,quality\n9.4,3.1,5\n").unwrap();
        let output = stage(&dir).run().await.unwrap();
        assert!(matches!(output, StageOutput::Validated(ref r) if !r.status));
        let text = std::fs::read_to_string(dir.path().join("data_validation/status.txt")).unwrap();
        assert_eq!(text, "Validation status: false");
    }

    #[tokio::test]
    async fn test_missing_dataset_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = stage(&dir).run().await.unwrap_err();
        assert!(matches!(err, MlError::NotFound(_)));
    }
}
