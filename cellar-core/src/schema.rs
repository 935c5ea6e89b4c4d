//! Schema description for the tabular dataset.
//!
//! The schema is the declared, ordered CSV header (target included) plus the
//! name of the target column. Validation compares the header against
//! [`SchemaDescription::column_names`]; training and inference use
//! [`SchemaDescription::feature_names`] to lay out the feature matrix.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Declared column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int64,
    Float64,
    Object,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Int64 | ColumnType::Float64)
    }
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub dtype: ColumnType,
}

/// Ordered column list plus the designated target column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub columns: Vec<ColumnSpec>,
    pub target_column: String,
}

impl SchemaDescription {
    /// Load and check a schema from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::parse(path, e))?;
        let schema: Self =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::parse(path, e))?;
        schema.check()?;
        tracing::info!(path = %path.display(), columns = schema.columns.len(), "schema loaded");
        Ok(schema)
    }

    /// Reject empty schemas, duplicate names and an undeclared target.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.columns.is_empty() {
            return Err(ConfigError::invalid("schema declares no columns"));
        }
        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate column in schema: '{}'",
                    col.name
                )));
            }
        }
        if self.target_column.is_empty() {
            return Err(ConfigError::MissingField {
                field: "target_column".into(),
            });
        }
        match self.column(&self.target_column) {
            None => Err(ConfigError::invalid(format!(
                "target column '{}' is not a declared column",
                self.target_column
            ))),
            Some(spec) if !spec.dtype.is_numeric() => Err(ConfigError::invalid(format!(
                "target column '{}' must be numeric",
                self.target_column
            ))),
            Some(_) => {
                if self.feature_names().is_empty() {
                    return Err(ConfigError::invalid("schema declares no feature columns"));
                }
                Ok(())
            }
        }
    }

    /// Full expected header, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Feature columns: every declared column except the target, in order.
    pub fn feature_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.name != self.target_column)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}
